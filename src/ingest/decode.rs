//! Character encoding detection.
//!
//! Order: BOM (UTF-8, UTF-16LE, UTF-16BE), then strict UTF-8. Otherwise the
//! legacy Cyrillic code pages windows-1251 and KOI8-R are both tried without
//! replacement characters. Either one decodes almost any byte sequence, so
//! the winner is the decoding whose Cyrillic letters are mostly lowercase:
//! KOI8-R read as windows-1251 (and the reverse) swaps the letter cases.

use encoding_rs::{Encoding, KOI8_R, UTF_8, WINDOWS_1251};

use super::InputError;

fn legacy_candidates() -> [&'static Encoding; 2] {
    [WINDOWS_1251, KOI8_R]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// WHATWG name of the encoding that decoded cleanly.
    pub encoding: &'static str,
}

pub fn decode_text(bytes: &[u8]) -> Result<DecodedText, InputError> {
    if let Some((enc, bom_len)) = Encoding::for_bom(bytes) {
        return enc
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            .map(|text| DecodedText {
                text: text.into_owned(),
                encoding: enc.name(),
            })
            .ok_or_else(|| InputError::UnsupportedEncoding {
                tried: enc.name().to_string(),
            });
    }

    if let Some(text) = clean_decode(UTF_8, bytes) {
        return Ok(DecodedText {
            text,
            encoding: UTF_8.name(),
        });
    }

    // Strict `>`: on a tie the earlier code page wins.
    let mut best: Option<(DecodedText, f32)> = None;
    for enc in legacy_candidates() {
        let Some(text) = clean_decode(enc, bytes) else {
            continue;
        };
        let score = lowercase_share(&text);
        if best.as_ref().map_or(true, |(_, s)| score > *s) {
            best = Some((
                DecodedText {
                    text,
                    encoding: enc.name(),
                },
                score,
            ));
        }
    }

    best.map(|(decoded, _)| decoded)
        .ok_or_else(|| InputError::UnsupportedEncoding {
            tried: std::iter::once(UTF_8)
                .chain(legacy_candidates())
                .map(|e| e.name())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

fn clean_decode(enc: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let text = enc.decode_without_bom_handling_and_without_replacement(bytes)?;
    (!text.contains('\0')).then(|| text.into_owned())
}

/// Share of Cyrillic letters that are lowercase; 0 when there are none.
fn lowercase_share(text: &str) -> f32 {
    let (mut lower, mut total) = (0usize, 0usize);
    for ch in text.chars().filter(|c| is_cyrillic(*c) && c.is_alphabetic()) {
        total += 1;
        if ch.is_lowercase() {
            lower += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        lower as f32 / total as f32
    }
}

fn is_cyrillic(ch: char) -> bool {
    matches!(ch, '\u{0400}'..='\u{04FF}')
}
