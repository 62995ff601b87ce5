//! Course geometry sources.
//!
//! - [`ProceduralGenerator`]: synthetic shapes with known widths and laps
//! - [`GpxLoader`]: existing GPX files

mod gpx_files;
mod procedural;

pub use gpx_files::{GpxError, GpxLoader};
pub use procedural::{ProceduralGenerator, ShapeConfig};
