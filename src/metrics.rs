use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::warn;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder (once) and publish the
    /// taxonomy size as a static gauge. `None` if another recorder owns the slot.
    pub fn init(taxonomy_labels: usize) -> Option<Self> {
        let handle = match HANDLE.get() {
            Some(h) => h.clone(),
            None => match PrometheusBuilder::new().install_recorder() {
                Ok(h) => HANDLE.get_or_init(|| h).clone(),
                Err(e) => {
                    warn!(error = %e, "prometheus recorder not installed");
                    return None;
                }
            },
        };

        gauge!("triggers_taxonomy_labels").set(taxonomy_labels as f64);

        Some(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
