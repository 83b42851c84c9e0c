// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod batch;
pub mod classify;
pub mod config;
pub mod debug;
pub mod export;
pub mod ingest;
pub mod metrics;
pub mod tone;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::batch::{classify_batch, classify_one, ClassificationResult};
pub use crate::classify::remote::{RemoteClassifier, RemoteVerdict};
pub use crate::classify::{Classification, MatchSource, TriggerClassifier};
pub use crate::config::{RemoteConfig, Tone, TriggerConfig};

use axum::Router;
use tracing::info;

pub const ENV_DEBUG_ROUTES: &str = "DEBUG_ROUTES";

/// Build the full application router from env/on-disk configuration.
/// `/metrics` is mounted only with `DEBUG_ROUTES=1`.
pub fn app() -> anyhow::Result<Router> {
    let state = AppState::from_env()?;
    let labels = state.classifier.candidate_labels().len();
    let mut router = api::router(state);

    if std::env::var(ENV_DEBUG_ROUTES).ok().as_deref() == Some("1") {
        if let Some(m) = crate::metrics::Metrics::init(labels) {
            info!("debug routes enabled: /metrics");
            router = router.merge(m.router());
        }
    }
    Ok(router)
}
