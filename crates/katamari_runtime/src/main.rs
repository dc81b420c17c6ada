//! Katamari headless runner
//!
//! Run with: cargo run -p katamari_runtime
//!       or: cargo run --bin katamari
//!
//! Logging follows `RUST_LOG` (default `info`); `RUST_LOG=katamari_cluster=debug`
//! prints every sampled envelope vertex.

use katamari_runtime::{Driver, RuntimeConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match RuntimeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };
    config.log_summary();

    if let Err(e) = run(config) {
        log::error!("Run failed: {}", e);
        std::process::exit(1);
    }
}

fn run(config: RuntimeConfig) -> katamari_runtime::Result<()> {
    let mut driver = Driver::new(config)?;
    let summary = driver.run()?;

    log::info!("=== Run Summary ===");
    log::info!("  Steps:     {}", summary.steps);
    log::info!("  Merges:    {}", summary.merges);
    log::info!("  Jumps:     {}", summary.jumps);
    log::info!("  Mass:      {:.3}", summary.mass);
    log::info!("  Radius:    {:.3}", summary.max_radius);
    log::info!("  Position:  {:?}", summary.final_position);
    Ok(())
}
