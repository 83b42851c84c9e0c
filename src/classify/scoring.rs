//! Confidence policy: keyword count tiers, the neutral sentinel and the
//! optional acceptance threshold.
//!
//! Keyword confidence = `tiers[min(count, tiers.len()) - 1]`, so the last tier
//! saturates. Remote confidence = reported probability × 100, rounded to two
//! decimals. Both are deterministic for a given input.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIERS: [f32; 4] = [78.0, 86.0, 91.0, 96.0];
pub const DEFAULT_FALLBACK_LABEL: &str = "neutral";
pub const DEFAULT_FALLBACK_CONFIDENCE: f32 = 40.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    /// Confidence for 1, 2, 3, ... distinct phrase matches.
    pub tiers: Vec<f32>,
    /// Sentinel label used when nothing matched and the fallback failed.
    pub fallback_label: String,
    pub fallback_confidence: f32,
    /// Results below this confidence are reported with `final_label = fallback_label`.
    pub min_confidence: Option<f32>,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            tiers: DEFAULT_TIERS.to_vec(),
            fallback_label: DEFAULT_FALLBACK_LABEL.to_string(),
            fallback_confidence: DEFAULT_FALLBACK_CONFIDENCE,
            min_confidence: None,
        }
    }
}

impl ConfidencePolicy {
    /// Confidence for a label with `count` distinct phrase hits (0 for no hits).
    pub fn tier_for(&self, count: usize) -> f32 {
        if count == 0 || self.tiers.is_empty() {
            return 0.0;
        }
        let idx = count.min(self.tiers.len()) - 1;
        self.tiers[idx]
    }

    /// Label accepted for display after applying `min_confidence`.
    pub fn accept<'a>(&'a self, label: &'a str, confidence: f32) -> &'a str {
        match self.min_confidence {
            Some(min) if confidence < min => self.fallback_label.as_str(),
            _ => label,
        }
    }

    pub fn has_threshold(&self) -> bool {
        self.min_confidence.is_some()
    }
}

/// Map a probability in [0,1] to a 0–100 confidence with two decimals.
pub fn remote_confidence(score: f32) -> f32 {
    round2(score.clamp(0.0, 1.0) * 100.0)
}

#[inline]
pub(crate) fn round2(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_saturate_at_last_entry() {
        let p = ConfidencePolicy::default();
        assert_eq!(p.tier_for(0), 0.0);
        assert_eq!(p.tier_for(1), 78.0);
        assert_eq!(p.tier_for(2), 86.0);
        assert_eq!(p.tier_for(3), 91.0);
        assert_eq!(p.tier_for(4), 96.0);
        assert_eq!(p.tier_for(17), 96.0);
    }

    #[test]
    fn threshold_downgrades_only_below_minimum() {
        let p = ConfidencePolicy {
            min_confidence: Some(55.0),
            ..Default::default()
        };
        assert_eq!(p.accept("spam", 54.99), "neutral");
        assert_eq!(p.accept("spam", 55.0), "spam");

        let open = ConfidencePolicy::default();
        assert_eq!(open.accept("spam", 1.0), "spam");
    }

    #[test]
    fn remote_score_is_scaled_and_rounded() {
        assert_eq!(remote_confidence(0.8734), 87.34);
        assert_eq!(remote_confidence(1.0), 100.0);
        assert_eq!(remote_confidence(0.0), 0.0);
    }
}
