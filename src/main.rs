//! Hardware topology report tool.
//!
//! This is the entry point for the topology CLI. It runs discovery against
//! the configured sources, prints the debug report, emits the benchmark
//! hygiene advisories, and exits non-zero when the host fails the minimum
//! CPU requirements.

use tracing_subscriber::{filter::EnvFilter, fmt};

use hwtopo::{
    config::ProbeConfig,
    diagnostics,
    topology::HardwareTopology,
};

fn main() {
    // Initialize tracing
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // Load configuration
    let config = match ProbeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let topology = HardwareTopology::detect(&config);
    print!("{}", topology);

    diagnostics::verify_performance_governor(&topology, &config);
    diagnostics::verify_turbo_disabled(&config);

    if let Err(e) = diagnostics::enforce_minimum_features(&topology) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
