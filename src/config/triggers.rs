// src/config/triggers.rs
//! Trigger taxonomy configuration (`config/triggers.toml`).
//!
//! Triggers are declared as a TOML array of tables so declaration order is
//! preserved; it is the tie-break order when no `priority` list is given.
//!
//! ```toml
//! fallback_label = "neutral"
//! min_confidence = 55.0
//! priority = ["complaint", "negative"]
//!
//! [[trigger]]
//! label = "negative"
//! phrases = ["надоел", "ужас"]
//!
//! [tone]
//! negative = "negative"
//! ```

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::classify::keywords::normalize;
use crate::classify::scoring::{
    ConfidencePolicy, DEFAULT_FALLBACK_CONFIDENCE, DEFAULT_FALLBACK_LABEL, DEFAULT_TIERS,
};

pub const DEFAULT_TRIGGERS_CONFIG_PATH: &str = "config/triggers.toml";
pub const ENV_TRIGGERS_CONFIG_PATH: &str = "TRIGGERS_CONFIG_PATH";
pub const DEFAULT_MAX_BATCH_ITEMS: usize = 5000;

static BUILTIN_TOML: &str = include_str!("../../config/triggers.toml");

static BUILTIN: Lazy<std::result::Result<TriggerConfig, String>> =
    Lazy::new(|| TriggerConfig::from_toml_str(BUILTIN_TOML).map_err(|e| format!("{e:#}")));

/// How phrases are located in the normalized text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Plain substring search (`"надоел"` matches `"надоела"`).
    #[default]
    Substring,
    /// Phrase must be delimited by non-word characters or the text edges.
    WholeWord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Negative,
    Positive,
    Neutral,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Negative, Tone::Positive, Tone::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Negative => "negative",
            Tone::Positive => "positive",
            Tone::Neutral => "neutral",
        }
    }
}

/// Label → tone lookup. Unknown labels are neutral.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToneMap(HashMap<String, Tone>);

impl ToneMap {
    pub fn new(entries: HashMap<String, Tone>) -> Self {
        Self(entries)
    }

    pub fn tone_for(&self, label: &str) -> Tone {
        self.0.get(label).copied().unwrap_or(Tone::Neutral)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
    pub label: String,
    pub phrases: Vec<String>,
}

/* ----------------------------
File schema (from TOML)
---------------------------- */

fn default_fallback_label() -> String {
    DEFAULT_FALLBACK_LABEL.to_string()
}
fn default_fallback_confidence() -> f32 {
    DEFAULT_FALLBACK_CONFIDENCE
}
fn default_tiers() -> Vec<f32> {
    DEFAULT_TIERS.to_vec()
}
fn default_max_batch_items() -> usize {
    DEFAULT_MAX_BATCH_ITEMS
}

#[derive(Debug, Clone, Deserialize)]
struct TriggerFile {
    #[serde(default = "default_fallback_label")]
    fallback_label: String,
    #[serde(default = "default_fallback_confidence")]
    fallback_confidence: f32,
    #[serde(default)]
    min_confidence: Option<f32>,
    #[serde(default = "default_tiers")]
    confidence_tiers: Vec<f32>,
    #[serde(default)]
    match_mode: MatchMode,
    #[serde(default = "default_max_batch_items")]
    max_batch_items: usize,
    #[serde(default)]
    priority: Option<Vec<String>>,
    #[serde(rename = "trigger", default)]
    triggers: Vec<TriggerDef>,
    #[serde(default)]
    tone: Option<HashMap<String, Tone>>,
}

/// Validated, immutable trigger configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerConfig {
    /// Declaration order; phrases normalized and de-duplicated.
    triggers: Vec<TriggerDef>,
    /// Indices into `triggers`, best rank first.
    ranking: Vec<usize>,
    tone_map: Option<ToneMap>,
    policy: ConfidencePolicy,
    match_mode: MatchMode,
    max_batch_items: usize,
}

impl TriggerConfig {
    pub fn builder() -> TriggerConfigBuilder {
        TriggerConfigBuilder::default()
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: TriggerFile = toml::from_str(s).context("parsing trigger config TOML")?;
        TriggerConfigBuilder {
            triggers: file.triggers,
            priority: file.priority,
            tone: file.tone,
            policy: ConfidencePolicy {
                tiers: file.confidence_tiers,
                fallback_label: file.fallback_label,
                fallback_confidence: file.fallback_confidence,
                min_confidence: file.min_confidence,
            },
            match_mode: file.match_mode,
            max_batch_items: file.max_batch_items,
        }
        .build()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading trigger config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid trigger config in {}", path.display()))
    }

    /// The taxonomy compiled into the binary.
    pub fn builtin() -> Result<Self> {
        BUILTIN
            .as_ref()
            .map(Clone::clone)
            .map_err(|e| anyhow!("built-in trigger config is invalid: {e}"))
    }

    /// Load using env var + fallbacks:
    /// 1) $TRIGGERS_CONFIG_PATH (must exist)
    /// 2) config/triggers.toml
    /// 3) built-in copy
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_TRIGGERS_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_TRIGGERS_CONFIG_PATH} points to non-existent path");
            }
            return Self::load_from_file(&pb);
        }
        let local = PathBuf::from(DEFAULT_TRIGGERS_CONFIG_PATH);
        if local.exists() {
            return Self::load_from_file(&local);
        }
        info!("no trigger config on disk, using built-in taxonomy");
        Self::builtin()
    }

    pub fn triggers(&self) -> &[TriggerDef] {
        &self.triggers
    }

    /// Triggers in tie-break order (priority first, then declaration order).
    pub fn ranked(&self) -> impl Iterator<Item = &TriggerDef> + '_ {
        self.ranking.iter().map(move |&i| &self.triggers[i])
    }

    /// Labels in declaration order; the candidate set for the remote fallback.
    pub fn labels(&self) -> Vec<String> {
        self.triggers.iter().map(|t| t.label.clone()).collect()
    }

    pub fn tone_map(&self) -> Option<&ToneMap> {
        self.tone_map.as_ref()
    }

    /// Tone for `label`, or `None` when no tone map is configured.
    pub fn tone_for(&self, label: &str) -> Option<Tone> {
        self.tone_map.as_ref().map(|m| m.tone_for(label))
    }

    pub fn policy(&self) -> &ConfidencePolicy {
        &self.policy
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    pub fn max_batch_items(&self) -> usize {
        self.max_batch_items
    }
}

/// Programmatic construction; also the validation path for TOML input.
#[derive(Debug, Clone)]
pub struct TriggerConfigBuilder {
    triggers: Vec<TriggerDef>,
    priority: Option<Vec<String>>,
    tone: Option<HashMap<String, Tone>>,
    policy: ConfidencePolicy,
    match_mode: MatchMode,
    max_batch_items: usize,
}

impl Default for TriggerConfigBuilder {
    fn default() -> Self {
        Self {
            triggers: Vec::new(),
            priority: None,
            tone: None,
            policy: ConfidencePolicy::default(),
            match_mode: MatchMode::default(),
            max_batch_items: DEFAULT_MAX_BATCH_ITEMS,
        }
    }
}

impl TriggerConfigBuilder {
    pub fn trigger<I, S>(mut self, label: &str, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers.push(TriggerDef {
            label: label.to_string(),
            phrases: phrases.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn priority<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn tone(mut self, label: &str, tone: Tone) -> Self {
        self.tone
            .get_or_insert_with(HashMap::new)
            .insert(label.to_string(), tone);
        self
    }

    pub fn tiers(mut self, tiers: &[f32]) -> Self {
        self.policy.tiers = tiers.to_vec();
        self
    }

    pub fn fallback(mut self, label: &str, confidence: f32) -> Self {
        self.policy.fallback_label = label.to_string();
        self.policy.fallback_confidence = confidence;
        self
    }

    pub fn min_confidence(mut self, min: f32) -> Self {
        self.policy.min_confidence = Some(min);
        self
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn max_batch_items(mut self, max: usize) -> Self {
        self.max_batch_items = max;
        self
    }

    pub fn build(self) -> Result<TriggerConfig> {
        if self.triggers.is_empty() {
            bail!("taxonomy must declare at least one trigger");
        }

        let mut seen = HashSet::new();
        let mut triggers = Vec::with_capacity(self.triggers.len());
        for def in self.triggers {
            let label = def.label.trim().to_string();
            if label.is_empty() {
                bail!("trigger label must not be empty");
            }
            if !seen.insert(label.clone()) {
                bail!("duplicate trigger label '{label}'");
            }
            triggers.push(TriggerDef {
                label,
                phrases: clean_phrases(def.phrases),
            });
        }

        let index: HashMap<&str, usize> = triggers
            .iter()
            .enumerate()
            .map(|(i, t)| (t.label.as_str(), i))
            .collect();

        let mut ranking = Vec::with_capacity(triggers.len());
        if let Some(prio) = &self.priority {
            for label in prio {
                let i = *index
                    .get(label.as_str())
                    .ok_or_else(|| anyhow!("priority references unknown label '{label}'"))?;
                if ranking.contains(&i) {
                    bail!("label '{label}' listed twice in priority");
                }
                ranking.push(i);
            }
        }
        for i in 0..triggers.len() {
            if !ranking.contains(&i) {
                ranking.push(i);
            }
        }

        let policy = self.policy;
        if policy.fallback_label.trim().is_empty() {
            bail!("fallback_label must not be empty");
        }
        if policy.tiers.is_empty() {
            bail!("confidence_tiers must not be empty");
        }
        if !policy.tiers.iter().all(|t| (0.0..=100.0).contains(t)) {
            bail!("confidence_tiers must lie in 0..=100");
        }
        if policy.tiers.windows(2).any(|w| w[1] < w[0]) {
            bail!("confidence_tiers must be non-decreasing");
        }
        if !(0.0..=100.0).contains(&policy.fallback_confidence) {
            bail!("fallback_confidence must lie in 0..=100");
        }
        if let Some(min) = policy.min_confidence {
            if !(0.0..=100.0).contains(&min) {
                bail!("min_confidence must lie in 0..=100");
            }
        }
        if self.max_batch_items == 0 {
            bail!("max_batch_items must be at least 1");
        }

        let tone_map = match self.tone {
            Some(map) => {
                for label in map.keys() {
                    if !index.contains_key(label.as_str()) && *label != policy.fallback_label {
                        bail!("tone map references unknown label '{label}'");
                    }
                }
                Some(ToneMap::new(map))
            }
            None => None,
        };

        Ok(TriggerConfig {
            triggers,
            ranking,
            tone_map,
            policy,
            match_mode: self.match_mode,
            max_batch_items: self.max_batch_items,
        })
    }
}

/// Normalize, drop empties, de-duplicate while keeping first occurrence.
fn clean_phrases(phrases: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    phrases
        .into_iter()
        .map(|p| normalize(&p))
        .filter(|p| !p.is_empty())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
