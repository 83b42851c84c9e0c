//! Smart Triggers service: binary entrypoint.
//! Boots the Axum HTTP server with the classifier built from env/on-disk config.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smart_triggers::debug::{is_dev_env, ENV_DEV_LOG};

/// Compact tracing logs in development only.
/// Needs TRIGGERS_DEV_LOG=1 and a dev environment (debug build or SHUTTLE_ENV in {local, development, dev}).
fn enable_dev_tracing() {
    let dev_flag = std::env::var(ENV_DEV_LOG).ok().is_some_and(|v| v == "1");
    if !(dev_flag && (cfg!(debug_assertions) || is_dev_env())) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("triggers=info,smart_triggers=info,warn"));

    // shuttle may already own the global subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // .env in local/dev; no-op in prod
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let router = smart_triggers::app()?;
    Ok(router.into())
}
