// src/tone.rs
//! Tone summary: count and share of results per tone bucket.
//!
//! Each share is the bucket's own percentage rounded to two decimals, so the
//! total may differ from 100.00 by a rounding step.

use serde::{Deserialize, Serialize};

use crate::batch::ClassificationResult;
use crate::config::{Tone, ToneMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneBucket {
    pub tone: Tone,
    pub count: usize,
    /// Percent of all results, two decimals.
    pub percent: f64,
}

/// Buckets present in `results`, in the order negative, positive, neutral.
/// Tones are looked up by each row's accepted `final_label`.
pub fn summarize(results: &[ClassificationResult], tones: &ToneMap) -> Vec<ToneBucket> {
    if results.is_empty() {
        return Vec::new();
    }
    let total = results.len() as f64;

    let mut counts = [0usize; 3];
    for r in results {
        counts[bucket_index(tones.tone_for(&r.final_label))] += 1;
    }

    Tone::ALL
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(tone, count)| ToneBucket {
            tone: *tone,
            count,
            percent: round2(count as f64 * 100.0 / total),
        })
        .collect()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn bucket_index(tone: Tone) -> usize {
    match tone {
        Tone::Negative => 0,
        Tone::Positive => 1,
        Tone::Neutral => 2,
    }
}
