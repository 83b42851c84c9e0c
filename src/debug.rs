// src/debug.rs
//! Dev-only classification logging. Raw text is never logged, only a short
//! SHA-256 derived id.

use tracing::info;

use crate::classify::Classification;

pub const ENV_DEV_LOG: &str = "TRIGGERS_DEV_LOG";

// Dev logging gate: TRIGGERS_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub fn dev_logging_enabled() -> bool {
    let on = std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    is_dev_env()
}

pub fn is_dev_env() -> bool {
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub(crate) fn dev_log_classification(text: &str, c: &Classification) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(text);
    info!(
        target: "triggers",
        %id,
        label = %c.label,
        final_label = %c.final_label,
        confidence = c.confidence,
        source = c.source.as_str(),
        triggers = ?c.triggers
    );
}
