pub mod config;
pub mod models;
pub mod db;
pub mod scoring; // Health score normalization (single score table)
pub mod evolution; // Evolution periods + trend classification
pub mod aggregates; // Per-owner aggregate cache + invalidation
pub mod diagnosis; // Diagnosis orchestrator, analysis capability, image probe
pub mod garden; // Plant lifecycle service
pub mod optimistic; // Pending/confirmed/failed local projection

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Reads `RUST_LOG` when present, otherwise falls back to
/// [`config::default_log_filter`]. Safe to call more than once; later calls
/// are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("Verdant core v{}", config::APP_VERSION);
}
