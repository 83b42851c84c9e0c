//! Remote zero-shot fallback: provider abstraction + file cache + daily limit.
//!
//! The classifier only sees [`RemoteClassifier`], which answers `Option`:
//! every failure (timeout, transport, status, malformed body, unknown label,
//! limit) is logged here and collapses to `None`.

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RemoteConfig;

pub const ENV_REMOTE_TEST_MODE: &str = "REMOTE_TEST_MODE";

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Top-ranked label reported by the remote model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteVerdict {
    pub label: String,
    /// Probability in [0,1].
    pub score: f32,
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("no API credential configured")]
    NoCredential,
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("label '{0}' is not one of the candidate labels")]
    UnknownLabel(String),
    #[error("daily limit of {0} calls reached")]
    DailyLimit(u32),
}

impl RemoteError {
    /// Short tag for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            RemoteError::NoCredential => "no_credential",
            RemoteError::Timeout => "timeout",
            RemoteError::Transport(_) => "transport",
            RemoteError::Status(_) => "status",
            RemoteError::Malformed(_) => "malformed",
            RemoteError::UnknownLabel(_) => "unknown_label",
            RemoteError::DailyLimit(_) => "limited",
        }
    }
}

/// Capability used by the classifier when no keyword matched.
pub trait RemoteClassifier: Send + Sync {
    fn classify_remote<'a>(
        &'a self,
        text: &'a str,
        candidate_labels: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Option<RemoteVerdict>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynRemote = Arc<dyn RemoteClassifier>;

/// Factory: build a client according to config and environment variables.
///
/// * `REMOTE_TEST_MODE=mock` → deterministic mock (first candidate, score 0.75).
/// * `REMOTE_TEST_MODE=error` → provider that always fails.
/// * disabled or no credential → [`DisabledClient`].
/// * otherwise the Hugging Face provider wrapped with caching + daily limit.
pub fn build_remote_from_config(config: &RemoteConfig) -> DynRemote {
    match std::env::var(ENV_REMOTE_TEST_MODE).as_deref() {
        Ok("mock") => {
            return Arc::new(CachingClient::new(
                MockProvider::default(),
                None,
                config.daily_limit,
            ))
        }
        Ok("error") => {
            return Arc::new(CachingClient::new(ErrorProvider, None, config.daily_limit))
        }
        _ => {}
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }
    if !config.has_credential() {
        info!("no API credential configured, remote fallback runs in local-only mode");
        return Arc::new(DisabledClient);
    }

    match config.provider.as_str() {
        "huggingface" => match HfZeroShotProvider::new(config) {
            Ok(provider) => Arc::new(CachingClient::new(
                provider,
                config.cache_dir.clone(),
                config.daily_limit,
            )),
            Err(e) => {
                warn!(error = %e, "could not build inference client, remote fallback disabled");
                Arc::new(DisabledClient)
            }
        },
        other => {
            warn!(provider = %other, "unsupported remote provider, remote fallback disabled");
            Arc::new(DisabledClient)
        }
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: does the real call and reports why it failed.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(
        &'a self,
        text: &'a str,
        candidate_labels: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<RemoteVerdict, RemoteError>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

/// Hugging Face Inference API, zero-shot-classification task.
pub struct HfZeroShotProvider {
    http: reqwest::Client,
    api_url: String,
    api_token: String,
}

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ZeroShotBody {
    labels: Vec<String>,
    scores: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Single(ZeroShotBody),
    Wrapped(Vec<ZeroShotBody>),
}

impl HfZeroShotProvider {
    pub fn new(config: &RemoteConfig) -> anyhow::Result<Self> {
        if config.api_url.trim().is_empty() {
            anyhow::bail!("api_url is empty");
        }
        let timeout = config.timeout();
        let http = reqwest::Client::builder()
            .user_agent("smart-triggers/0.1")
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim().to_string(),
            api_token: config.api_token.clone(),
        })
    }
}

impl Provider for HfZeroShotProvider {
    fn fetch<'a>(
        &'a self,
        text: &'a str,
        candidate_labels: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<RemoteVerdict, RemoteError>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_token.is_empty() {
                return Err(RemoteError::NoCredential);
            }

            let req = ZeroShotRequest {
                inputs: text,
                parameters: ZeroShotParameters { candidate_labels },
            };

            let resp = self
                .http
                .post(&self.api_url)
                .bearer_auth(&self.api_token)
                .json(&req)
                .send()
                .await
                .map_err(transport_error)?;

            if !resp.status().is_success() {
                return Err(RemoteError::Status(resp.status().as_u16()));
            }
            let body = resp.bytes().await.map_err(transport_error)?;
            parse_zero_shot(&body, candidate_labels)
        })
    }
    fn name(&self) -> &'static str {
        "huggingface"
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Transport(e.to_string())
    }
}

/// Decode a zero-shot response body and take its top-ranked label.
pub fn parse_zero_shot(
    body: &[u8],
    candidate_labels: &[String],
) -> Result<RemoteVerdict, RemoteError> {
    let parsed: ZeroShotResponse =
        serde_json::from_slice(body).map_err(|e| RemoteError::Malformed(e.to_string()))?;
    let body = match parsed {
        ZeroShotResponse::Single(b) => b,
        ZeroShotResponse::Wrapped(mut v) => {
            if v.len() != 1 {
                return Err(RemoteError::Malformed(format!(
                    "expected one result, got {}",
                    v.len()
                )));
            }
            v.remove(0)
        }
    };

    if body.labels.is_empty() || body.labels.len() != body.scores.len() {
        return Err(RemoteError::Malformed(format!(
            "{} labels vs {} scores",
            body.labels.len(),
            body.scores.len()
        )));
    }

    let label = body.labels[0].trim().to_string();
    let score = body.scores[0];
    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(RemoteError::Malformed(format!("score {score} outside [0,1]")));
    }
    if !candidate_labels.iter().any(|c| *c == label) {
        return Err(RemoteError::UnknownLabel(label));
    }
    Ok(RemoteVerdict { label, score })
}

/// Returns `None` always; used when the fallback is disabled or has no credential.
pub struct DisabledClient;

impl RemoteClassifier for DisabledClient {
    fn classify_remote<'a>(
        &'a self,
        _text: &'a str,
        _candidate_labels: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Option<RemoteVerdict>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic provider for tests/local runs.
/// With `label: None` it answers the first candidate.
#[derive(Clone, Debug)]
pub struct MockProvider {
    pub label: Option<String>,
    pub score: f32,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            label: None,
            score: 0.75,
        }
    }
}

impl Provider for MockProvider {
    fn fetch<'a>(
        &'a self,
        _text: &'a str,
        candidate_labels: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<RemoteVerdict, RemoteError>> + Send + 'a>> {
        let label = self
            .label
            .clone()
            .or_else(|| candidate_labels.first().cloned());
        let score = self.score;
        Box::pin(async move {
            let label = label.ok_or_else(|| RemoteError::Malformed("no candidates".into()))?;
            Ok(RemoteVerdict { label, score })
        })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Always fails; exercises the sentinel path.
pub struct ErrorProvider;

impl Provider for ErrorProvider {
    fn fetch<'a>(
        &'a self,
        _text: &'a str,
        _candidate_labels: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<RemoteVerdict, RemoteError>> + Send + 'a>> {
        Box::pin(async { Err(RemoteError::Transport("simulated failure".into())) })
    }
    fn name(&self) -> &'static str {
        "error"
    }
}

// ------------------------------------------------------------
// Caching client wrapper (file cache + daily limit)
// ------------------------------------------------------------

/// Wraps a [`Provider`] with a file cache and a per-day call limit.
/// Answers outside the candidate labels are rejected; failures are logged.
pub struct CachingClient<P: Provider> {
    inner: P,
    cache_dir: Option<PathBuf>,
    daily_limit_max: u32,
    counter: Mutex<DailyCounter>,
}

impl<P: Provider> CachingClient<P> {
    pub fn new(inner: P, cache_dir: Option<PathBuf>, daily_limit_max: u32) -> Self {
        let counter = cache_dir
            .as_deref()
            .and_then(|dir| {
                let _ = fs::create_dir_all(dir); // best-effort
                load_daily_counter(dir).ok()
            })
            .unwrap_or_default();
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter: Mutex::new(counter),
        }
    }

    async fn classify_impl(
        &self,
        text: &str,
        candidate_labels: &[String],
    ) -> Result<RemoteVerdict, RemoteError> {
        // 1) Cache lookup; hits are free and bypass the limit.
        let key = cache_key(text, candidate_labels);
        if let Some(dir) = &self.cache_dir {
            if let Some(hit) = read_cache_file(dir, &key) {
                if candidate_labels.contains(&hit.label) {
                    debug!(provider = self.inner.name(), "remote cache hit");
                    return Ok(hit);
                }
            }
        }

        // 2) Daily limit (only real calls count).
        {
            let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
            if g.is_expired() {
                g.reset_to_today();
                self.persist_counter(&g);
            }
            if g.count >= self.daily_limit_max {
                return Err(RemoteError::DailyLimit(self.daily_limit_max));
            }
        }

        // 3) Real call.
        let fresh = self.inner.fetch(text, candidate_labels).await?;
        if !candidate_labels.contains(&fresh.label) {
            return Err(RemoteError::UnknownLabel(fresh.label));
        }
        if let Some(dir) = &self.cache_dir {
            let _ = write_cache_file(dir, &key, &fresh);
        }
        let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        g.count = g.count.saturating_add(1);
        self.persist_counter(&g);
        Ok(fresh)
    }

    fn persist_counter(&self, counter: &DailyCounter) {
        if let Some(dir) = &self.cache_dir {
            let _ = save_daily_counter(dir, counter);
        }
    }
}

impl<P: Provider> RemoteClassifier for CachingClient<P> {
    fn classify_remote<'a>(
        &'a self,
        text: &'a str,
        candidate_labels: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Option<RemoteVerdict>> + Send + 'a>> {
        Box::pin(async move {
            match self.classify_impl(text, candidate_labels).await {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(provider = self.inner.name(), outcome = e.outcome(), error = %e, "remote fallback failed");
                    metrics::counter!("triggers_remote_fallback_total", "outcome" => e.outcome())
                        .increment(1);
                    None
                }
            }
        })
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

fn cache_key(text: &str, candidate_labels: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    for label in candidate_labels {
        hasher.update([0x1f]);
        hasher.update(label.as_bytes());
    }
    let digest = hasher.finalize();
    digest.iter().take(16).map(|b| format!("{b:02x}")).collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<RemoteVerdict> {
    let buf = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&buf).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &RemoteVerdict) -> io::Result<()> {
    let json = serde_json::to_string(value).map_err(io::Error::other)?;
    write_atomic(&cache_path(dir, key), json.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    fs::rename(tmp, path)
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: NaiveDate,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let json = serde_json::to_string(dc).map_err(io::Error::other)?;
    write_atomic(&counter_path(dir), json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["spam".into(), "praise".into()]
    }

    #[test]
    fn parses_plain_and_wrapped_bodies() {
        let plain = br#"{"sequence":"x","labels":["praise","spam"],"scores":[0.91,0.09]}"#;
        let v = parse_zero_shot(plain, &labels()).unwrap();
        assert_eq!(v.label, "praise");
        assert!((v.score - 0.91).abs() < 1e-6);

        let wrapped = br#"[{"labels":["spam"],"scores":[0.5]}]"#;
        assert_eq!(parse_zero_shot(wrapped, &labels()).unwrap().label, "spam");
    }

    #[test]
    fn rejects_unknown_labels_and_bad_shapes() {
        let unknown = br#"{"labels":["weather"],"scores":[0.99]}"#;
        assert!(matches!(
            parse_zero_shot(unknown, &labels()),
            Err(RemoteError::UnknownLabel(l)) if l == "weather"
        ));

        let mismatch = br#"{"labels":["spam","praise"],"scores":[0.9]}"#;
        assert!(matches!(
            parse_zero_shot(mismatch, &labels()),
            Err(RemoteError::Malformed(_))
        ));

        let out_of_range = br#"{"labels":["spam"],"scores":[1.7]}"#;
        assert!(parse_zero_shot(out_of_range, &labels()).is_err());

        assert!(parse_zero_shot(b"<html>busy</html>", &labels()).is_err());
    }

    #[tokio::test]
    async fn daily_limit_blocks_after_budget_is_spent() {
        let client = CachingClient::new(MockProvider::default(), None, 1);
        let first = client.classify_remote("раз", &labels()).await;
        assert_eq!(first.map(|v| v.label).as_deref(), Some("spam"));
        assert!(client.classify_remote("два", &labels()).await.is_none());
    }

    #[tokio::test]
    async fn cache_hit_does_not_spend_budget() {
        let tmp = tempfile::tempdir().unwrap();
        let client = CachingClient::new(
            MockProvider::default(),
            Some(tmp.path().to_path_buf()),
            1,
        );
        assert!(client.classify_remote("текст", &labels()).await.is_some());
        // Same input → cache, even though the budget of one call is spent.
        assert!(client.classify_remote("текст", &labels()).await.is_some());
        assert!(client.classify_remote("другой", &labels()).await.is_none());
    }

    #[tokio::test]
    async fn provider_label_outside_candidates_is_rejected() {
        let client = CachingClient::new(
            MockProvider {
                label: Some("weather".into()),
                score: 0.9,
            },
            None,
            10,
        );
        assert!(client.classify_remote("x", &labels()).await.is_none());
    }

    fn classifier_for(config: &RemoteConfig) -> crate::classify::TriggerClassifier {
        let triggers = crate::config::TriggerConfig::builder()
            .trigger("spam", ["казино"])
            .trigger("praise", ["отлично"])
            .build()
            .unwrap();
        crate::classify::TriggerClassifier::new(
            Arc::new(triggers),
            build_remote_from_config(config),
        )
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn enabled_without_credential_degrades_to_sentinel() {
        std::env::remove_var(ENV_REMOTE_TEST_MODE);
        let config = RemoteConfig {
            enabled: true,
            api_url: "http://127.0.0.1:9/never-called".into(),
            api_token: String::new(),
            ..RemoteConfig::default()
        };
        let c = classifier_for(&config);
        assert_eq!(c.remote_provider(), "disabled");
        assert_eq!(c.classify("погода сегодня").await.pair(), ("neutral", 40.0));
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn disabled_config_never_builds_a_provider() {
        std::env::remove_var(ENV_REMOTE_TEST_MODE);
        let config = RemoteConfig {
            enabled: false,
            api_token: "hf_present".into(),
            ..RemoteConfig::default()
        };
        assert_eq!(build_remote_from_config(&config).provider_name(), "disabled");
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn error_test_mode_yields_sentinel() {
        std::env::set_var(ENV_REMOTE_TEST_MODE, "error");
        let c = classifier_for(&RemoteConfig::default());
        std::env::remove_var(ENV_REMOTE_TEST_MODE);

        assert_eq!(c.remote_provider(), "error");
        let out = c.classify("погода сегодня").await;
        assert_eq!(out.pair(), ("neutral", 40.0));
        assert_eq!(out.source, crate::classify::MatchSource::Fallback);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn mock_test_mode_answers_first_candidate() {
        std::env::set_var(ENV_REMOTE_TEST_MODE, "mock");
        let c = classifier_for(&RemoteConfig::default());
        std::env::remove_var(ENV_REMOTE_TEST_MODE);

        assert_eq!(c.classify("погода сегодня").await.pair(), ("spam", 75.0));
    }
}
