//! Local keyword matching: counts distinct trigger phrases per label.
//!
//! Text and phrases are normalized the same way (Unicode lowercase, collapsed
//! whitespace) so `"НЕ   работает"` matches the phrase `"не работает"`.

use regex::Regex;
use tracing::warn;

use crate::config::{MatchMode, TriggerConfig};

/// Hits for one label, reported in ranking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelHits {
    pub label: String,
    /// Distinct phrases of this label found in the text.
    pub count: usize,
}

enum Phrase {
    Substring(String),
    WholeWord(Regex),
}

impl Phrase {
    fn is_in(&self, text: &str) -> bool {
        match self {
            Phrase::Substring(p) => text.contains(p.as_str()),
            Phrase::WholeWord(re) => re.is_match(text),
        }
    }
}

struct Entry {
    label: String,
    phrases: Vec<Phrase>,
}

/// Pre-compiled matcher built once from a [`TriggerConfig`].
pub struct KeywordMatcher {
    entries: Vec<Entry>,
}

impl KeywordMatcher {
    pub fn new(config: &TriggerConfig) -> Self {
        let mode = config.match_mode();
        let entries = config
            .ranked()
            .map(|t| Entry {
                label: t.label.clone(),
                phrases: t.phrases.iter().map(|p| compile(p, mode)).collect(),
            })
            .collect();
        Self { entries }
    }

    /// Labels with at least one hit, best rank first.
    pub fn scan(&self, text: &str) -> Vec<LabelHits> {
        let text = normalize(text);
        if text.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter_map(|e| {
                let count = e.phrases.iter().filter(|p| p.is_in(&text)).count();
                (count > 0).then(|| LabelHits {
                    label: e.label.clone(),
                    count,
                })
            })
            .collect()
    }
}

fn compile(phrase: &str, mode: MatchMode) -> Phrase {
    match mode {
        MatchMode::Substring => Phrase::Substring(phrase.to_string()),
        MatchMode::WholeWord => {
            let pattern = format!(r"(?u)(?:^|\W){}(?:\W|$)", regex::escape(phrase));
            match Regex::new(&pattern) {
                Ok(re) => Phrase::WholeWord(re),
                Err(e) => {
                    warn!(%phrase, error = %e, "whole-word pattern rejected, using substring match");
                    Phrase::Substring(phrase.to_string())
                }
            }
        }
    }
}

/// Lowercase (Unicode-aware) and collapse runs of whitespace to one space.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = true;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}
