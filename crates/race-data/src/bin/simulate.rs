//! Run one congestion scenario and print the result as JSON.
//!
//! Run with:
//! ```
//! cargo run -p race-data --bin simulate -- [scenario.json] [course-out.gpx]
//! ```
//!
//! Without a config file the default scenario is used. `SIM_PARTICIPANTS`,
//! `SIM_TICK_SECONDS`, `SIM_SEED` and `SIM_GPX` override the loaded values.

use course::Marker;
use race_data::builders::ScenarioBuilder;
use race_data::config::ScenarioConfig;
use race_data::sources::GpxLoader;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ScenarioConfig::from_file(&path)?,
        None => ScenarioConfig::default(),
    }
    .apply_env()?;
    config.validate()?;

    tracing::info!(
        participants = config.participant_count,
        seed = config.seed,
        "Loaded scenario config"
    );

    let result = ScenarioBuilder::from_config(&config)
        .with_metrics(true)
        .build()?;

    // Summary output
    tracing::info!("Simulation completed!");
    tracing::info!("  Course length: {:.0} m", result.course.total_length_m);
    tracing::info!("  Laps: {}", result.course.lap_count);
    tracing::info!(
        "  Width: {:.1}-{:.1} m",
        result.course.min_width_m,
        result.course.max_width_m
    );
    tracing::info!("  Finished: {}", result.finish_order.len());
    tracing::info!("  Blocked ticks: {}", result.stats.total_blocked_ticks());
    tracing::info!("  Overtakes: {}", result.stats.overtakes);
    for (rank, hotspot) in result.hotspots.iter().enumerate() {
        tracing::info!(
            "  Hotspot {}: {:.0}-{:.0} m ({} blocked ticks)",
            rank + 1,
            hotspot.start_distance,
            hotspot.end_distance,
            hotspot.blocked_ticks
        );
    }

    if let Some(gpx_path) = args.next() {
        let markers: Vec<Marker> = result
            .hotspots
            .iter()
            .enumerate()
            .map(|(rank, h)| Marker::new(h.position, format!("Hotspot {}", rank + 1)))
            .collect();
        GpxLoader::write_file(
            &gpx_path,
            &result.course_points,
            Some("Simulated course"),
            &markers,
        )?;
        tracing::info!(path = %gpx_path, "Wrote course GPX");
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
