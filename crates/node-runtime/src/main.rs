//! # Accord Ledger Node Runtime
//!
//! Runs three participants and an arbiter in one process and walks an IOU
//! through its whole lifecycle.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, then `AC_*` environment overrides)
//! 2. Install logging (`RUST_LOG`, else `AC_LOG`, else `info`)
//! 3. Create the arbiter and network, then one participant per identity
//! 4. Issue, transfer and settle an IOU
//! 5. Print a JSON summary and shut the participants down

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::{run_lifecycle, LifecyclePlan, NodeConfig, PartyContainer};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = NodeConfig::from_env().context("invalid configuration")?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("===========================================");
    info!("  Accord Ledger Node Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!(
        endorsement_timeout_ms = config.coordinator.endorsement_timeout.as_millis() as u64,
        finality_timeout_ms = config.coordinator.finality_timeout.as_millis() as u64,
        arbiter_attempts = config.coordinator.arbiter_retry.max_attempts,
        "Configuration loaded"
    );

    let mut container = PartyContainer::new(config, "Arbiter");
    let alice = container.add_party("Alice");
    let bob = container.add_party("Bob");
    let charlie = container.add_party("Charlie");

    let summary = run_lifecycle(
        &container,
        &alice,
        &bob,
        &charlie,
        &LifecyclePlan::default(),
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    container.shutdown().await;
    Ok(())
}
