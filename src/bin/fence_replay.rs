//! KyroFence scenario replay
//!
//! Runs a recorded scenario (fence, vertices, and a sequence of check cycles)
//! through a monitor backed by the in-memory engine and prints every alert as
//! one JSON line on stdout.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kyrofence::{
    DrawingShape, EntityId, FenceMonitor, GeoFence, GeoPoint, InMemorySpatialEngine, MonitorConfig,
    MonitoredEntity, SharedEngine,
};

/// Replay options
struct Config {
    /// Scenario file
    scenario: Option<PathBuf>,
    /// Monitor config file, overriding the scenario's inline config
    monitor_config: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Scenario {
    fence: GeoFence,
    vertices: Vec<GeoPoint>,
    #[serde(default)]
    config: MonitorConfig,
    #[serde(default = "default_true")]
    compare_to_previous: bool,
    cycles: Vec<Cycle>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Cycle {
    /// Replace the fence vertices before this cycle.
    #[serde(default)]
    vertices: Option<Vec<GeoPoint>>,
    /// Entities to stop monitoring before this cycle.
    #[serde(default)]
    remove: Vec<EntityId>,
    #[serde(default)]
    entities: Vec<MonitoredEntity>,
}

const fn default_true() -> bool {
    true
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config {
        scenario: None,
        monitor_config: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config.monitor_config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --config requires a value");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                println!("fence-replay - replay a geofence scenario");
                println!();
                println!("USAGE:");
                println!("    fence-replay [OPTIONS] <SCENARIO>");
                println!();
                println!("OPTIONS:");
                println!("    -c, --config <FILE>       Monitor config (JSON), overrides the scenario's");
                println!("    -h, --help                Print help information");
                println!();
                println!("Logging is controlled with RUST_LOG (default: warn).");
                std::process::exit(0);
            }
            arg if arg.starts_with('-') => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
            path => {
                config.scenario = Some(PathBuf::from(path));
                i += 1;
            }
        }
    }

    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = parse_args();
    let Some(path) = config.scenario else {
        eprintln!("error: missing <SCENARIO> argument (see --help)");
        std::process::exit(1);
    };

    let scenario: Scenario = serde_json::from_str(&fs::read_to_string(&path)?)?;
    let monitor_config = match config.monitor_config {
        Some(p) => MonitorConfig::from_path(p)?,
        None => {
            scenario.config.validate()?;
            scenario.config
        }
    };

    let shape = Arc::new(DrawingShape::closed(scenario.vertices));
    let monitor = FenceMonitor::new(
        scenario.fence,
        shape.clone(),
        SharedEngine::new(InMemorySpatialEngine::new()),
        monitor_config,
    );
    info!(
        fence = %monitor.fence().name,
        valid = monitor.is_valid(),
        range_m = monitor.monitoring_range_m(),
        cycles = scenario.cycles.len(),
        "replay starting"
    );

    let mut fired = 0usize;
    for cycle in scenario.cycles {
        if let Some(vertices) = cycle.vertices {
            shape.set_points(vertices);
        }
        for id in &cycle.remove {
            monitor.remove_entity(id);
        }
        let trigger = monitor.fence().trigger;
        for alert in monitor.check(trigger, &cycle.entities, scenario.compare_to_previous) {
            println!("{}", serde_json::to_string(&alert)?);
            fired += 1;
        }
    }

    info!(alerts = fired, "replay finished");
    monitor.dispose();
    Ok(())
}
