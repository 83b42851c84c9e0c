// src/config/remote.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};
use tracing::{info, warn};

pub const DEFAULT_REMOTE_CONFIG_PATH: &str = "config/remote.json";
pub const ENV_REMOTE_CONFIG_PATH: &str = "REMOTE_CONFIG_PATH";
pub const ENV_API_TOKEN: &str = "HF_API_TOKEN";

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 30;

fn default_provider() -> String {
    "huggingface".to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_daily_limit() -> u32 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub enabled: bool,
    /// Only "huggingface" is implemented (case-insensitive).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_url: String,
    /// "ENV" means: read from HF_API_TOKEN. Empty means no credential.
    #[serde(default)]
    pub api_token: String,
    /// Upper bound for a single inference call; clamped to 1..=30.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Real API calls allowed per UTC day; cache hits are free.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// Response cache directory; `None` disables the file cache.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            api_url: String::new(),
            api_token: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            daily_limit: default_daily_limit(),
            cache_dir: None,
        }
    }
}

impl RemoteConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: RemoteConfig = serde_json::from_str(&data)?;
        Ok(cfg.normalized())
    }

    /// Load using env var + fallbacks; never fails. A missing or broken file
    /// yields a disabled config (local-only classification).
    pub fn load_default() -> Self {
        let path = env::var(ENV_REMOTE_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_REMOTE_CONFIG_PATH));
        if !path.exists() {
            info!(path = %path.display(), "remote config not found, fallback disabled");
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(cfg) => {
                // Safe diagnostics: never the token itself.
                info!(
                    provider = %cfg.provider,
                    enabled = cfg.enabled,
                    key_len = cfg.api_token.len(),
                    timeout_secs = cfg.timeout_secs,
                    "remote config loaded"
                );
                cfg
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "remote config unreadable, fallback disabled");
                Self::default()
            }
        }
    }

    fn normalized(mut self) -> Self {
        self.provider = self.provider.trim().to_lowercase();

        // A missing env token is the documented degraded mode, not an error.
        if self.api_token.trim().eq_ignore_ascii_case("env") {
            self.api_token = env::var(ENV_API_TOKEN).unwrap_or_default();
        }
        self.api_token = self.api_token.trim().to_string();

        self.timeout_secs = self.timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);
        self
    }

    pub fn has_credential(&self) -> bool {
        !self.api_token.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
