// src/batch.rs
//! Batch driver: classifies texts one by one, in input order.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classify::{MatchSource, TriggerClassifier};
use crate::config::Tone;
use crate::ingest::InputError;

/// One table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// 1-based position among the classified (non-blank) texts.
    pub id: usize,
    /// Verbatim input.
    pub text: String,
    #[serde(default)]
    pub triggers: Vec<String>,
    pub label: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    pub final_label: String,
    pub source: MatchSource,
}

/// Classify a single manually entered text.
pub async fn classify_one(
    classifier: &TriggerClassifier,
    text: &str,
) -> Result<ClassificationResult, InputError> {
    let mut rows = classify_batch(classifier, [text]).await?;
    rows.pop().ok_or(InputError::EmptyInput)
}

/// Classify every non-blank text. Duplicates are classified independently.
/// Fails only before any classification: no texts at all, or more than the
/// configured `max_batch_items`.
pub async fn classify_batch<I, S>(
    classifier: &TriggerClassifier,
    texts: I,
) -> Result<Vec<ClassificationResult>, InputError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let texts: Vec<S> = texts
        .into_iter()
        .filter(|t| !AsRef::<str>::as_ref(t).trim().is_empty())
        .collect();
    if texts.is_empty() {
        return Err(InputError::EmptyInput);
    }
    let max = classifier.config().max_batch_items();
    if texts.len() > max {
        return Err(InputError::TooManyRecords {
            count: texts.len(),
            max,
        });
    }

    let mut rows = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        let text: &str = text.as_ref();
        let c = classifier.classify(text).await;
        debug!(id = i + 1, label = %c.label, source = c.source.as_str(), "classified");
        rows.push(ClassificationResult {
            id: i + 1,
            text: text.to_string(),
            tone: classifier.config().tone_for(&c.final_label),
            triggers: c.triggers,
            label: c.label,
            confidence: c.confidence,
            final_label: c.final_label,
            source: c.source,
        });
    }
    info!(count = rows.len(), "batch classified");
    Ok(rows)
}
