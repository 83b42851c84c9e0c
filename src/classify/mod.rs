// src/classify/mod.rs
//! Trigger classifier: keyword match → priority tie-break → count tier,
//! otherwise remote zero-shot fallback, otherwise the neutral sentinel.
//! The confidence threshold then decides the accepted `final_label`.

pub mod keywords;
pub mod remote;
pub mod scoring;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::TriggerConfig;
use crate::debug::dev_log_classification;
use keywords::KeywordMatcher;
use remote::{DisabledClient, DynRemote};
use scoring::remote_confidence;

pub use keywords::{normalize, LabelHits};
pub use remote::{RemoteClassifier, RemoteVerdict};
pub use scoring::ConfidencePolicy;

/// Outer bound for one fallback call, on top of the HTTP client's own timeout.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(20);

/// Where the label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Keyword,
    Remote,
    Fallback,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Keyword => "keyword",
            MatchSource::Remote => "remote",
            MatchSource::Fallback => "fallback",
        }
    }
}

/// Outcome for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// What matched (or the sentinel).
    pub label: String,
    /// 0–100.
    pub confidence: f32,
    /// What was accepted after the confidence threshold.
    pub final_label: String,
    /// Every matched label, best rank first. Empty for remote/fallback results.
    pub triggers: Vec<String>,
    pub source: MatchSource,
}

impl Classification {
    pub fn pair(&self) -> (&str, f32) {
        (&self.label, self.confidence)
    }
}

pub struct TriggerClassifier {
    config: Arc<TriggerConfig>,
    matcher: KeywordMatcher,
    candidates: Vec<String>,
    remote: DynRemote,
    remote_timeout: Duration,
}

impl TriggerClassifier {
    pub fn new(config: Arc<TriggerConfig>, remote: DynRemote) -> Self {
        let matcher = KeywordMatcher::new(&config);
        let candidates = config.labels();
        Self {
            config,
            matcher,
            candidates,
            remote,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    /// Keyword matching only; unmatched texts get the sentinel.
    pub fn local_only(config: Arc<TriggerConfig>) -> Self {
        Self::new(config, Arc::new(DisabledClient))
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    pub fn candidate_labels(&self) -> &[String] {
        &self.candidates
    }

    pub fn remote_provider(&self) -> &'static str {
        self.remote.provider_name()
    }

    /// Classify one text. Never fails: every remote problem collapses to the sentinel.
    pub async fn classify(&self, text: &str) -> Classification {
        let out = match self.classify_keywords(text) {
            Some(c) => c,
            None => self.classify_fallback(text).await,
        };
        metrics::counter!("triggers_classified_total", "source" => out.source.as_str())
            .increment(1);
        dev_log_classification(text, &out);
        out
    }

    /// Keyword step alone; `None` when no phrase matched.
    pub fn classify_keywords(&self, text: &str) -> Option<Classification> {
        let hits = self.matcher.scan(text);
        let best = hits.first()?;
        let policy = self.config.policy();
        let confidence = policy.tier_for(best.count);
        Some(Classification {
            label: best.label.clone(),
            confidence,
            final_label: policy.accept(&best.label, confidence).to_string(),
            triggers: hits.iter().map(|h| h.label.clone()).collect(),
            source: MatchSource::Keyword,
        })
    }

    async fn classify_fallback(&self, text: &str) -> Classification {
        let call = self.remote.classify_remote(text, &self.candidates);
        let verdict = match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(v) => v,
            Err(_) => {
                warn!(
                    provider = self.remote.provider_name(),
                    timeout_ms = self.remote_timeout.as_millis() as u64,
                    "remote fallback timed out"
                );
                metrics::counter!("triggers_remote_fallback_total", "outcome" => "timeout")
                    .increment(1);
                None
            }
        };

        // Re-check membership: the capability may be any implementation.
        match verdict {
            Some(v) if self.candidates.contains(&v.label) && (0.0..=1.0).contains(&v.score) => {
                let confidence = remote_confidence(v.score);
                let final_label = self.config.policy().accept(&v.label, confidence).to_string();
                Classification {
                    label: v.label,
                    confidence,
                    final_label,
                    triggers: Vec::new(),
                    source: MatchSource::Remote,
                }
            }
            _ => self.sentinel(),
        }
    }

    fn sentinel(&self) -> Classification {
        let policy = self.config.policy();
        let confidence = policy.fallback_confidence;
        Classification {
            label: policy.fallback_label.clone(),
            confidence,
            final_label: policy.fallback_label.clone(),
            triggers: Vec::new(),
            source: MatchSource::Fallback,
        }
    }
}
