//! Fluent builder APIs for race scenarios.
//!
//! The [`ScenarioBuilder`] turns a course shape and a field description
//! into a finished simulation run with finish order and congestion stats.

mod scenario;

pub use scenario::{
    CourseSummary, Entrant, ScenarioBuilder, ScenarioError, ScenarioMetrics, ScenarioResult,
};
