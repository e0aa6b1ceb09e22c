//! Text heuristics that recover a transaction id or block height from a proof
//! description or from raw verification evidence.
//!
//! Rules are evaluated in the fixed order of [`EXTRACTION_RULES`]; the first
//! rule that produces a value for a field wins. A span claimed by a
//! [`ExtractionRule::HexToken`] match is never reconsidered as a height.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::engine::RawEvidence;

/// Attestation kinds whose marker carries the block height, e.g.
/// `BitcoinBlockHeaderAttestation(820001)`.
pub const ATTESTATION_KINDS: &[&str] = &["BitcoinBlockHeaderAttestation"];

static HEX_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-fA-F0-9]{64}\b").expect("hex token pattern"));

static HEIGHT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:block\s*#?|height)\s*:?\s*(\d{2,10})\b").expect("height token pattern")
});

static ATTESTATION_MARKER: Lazy<Regex> = Lazy::new(|| {
    let kinds = ATTESTATION_KINDS
        .iter()
        .map(|kind| regex::escape(kind))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{kinds})\((\d{{1,20}})\)")).expect("attestation marker pattern")
});

/// A single extraction strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExtractionRule {
    /// A 64-hex-character token, read as a transaction id.
    HexToken,
    /// `block`, `block#` or `height` followed by 2 to 10 digits.
    HeightToken,
    /// `<Kind>(<digits>)` for one of [`ATTESTATION_KINDS`].
    AttestationMarker,
}

/// Priority order in which rules are applied.
pub const EXTRACTION_RULES: [ExtractionRule; 3] = [
    ExtractionRule::HexToken,
    ExtractionRule::HeightToken,
    ExtractionRule::AttestationMarker,
];

/// Value produced by a rule together with the span it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleMatch {
    Txid { value: String, span: Range<usize> },
    Height { value: u64, span: Range<usize> },
}

impl ExtractionRule {
    /// Applies the rule to `text`, ignoring any candidate that overlaps one of
    /// the `claimed` spans.
    pub fn apply(self, text: &str, claimed: &[Range<usize>]) -> Option<RuleMatch> {
        match self {
            ExtractionRule::HexToken => HEX_TOKEN
                .find_iter(text)
                .find(|m| !overlaps(&m.range(), claimed))
                .map(|m| RuleMatch::Txid {
                    value: m.as_str().to_ascii_lowercase(),
                    span: m.range(),
                }),
            ExtractionRule::HeightToken => first_height(&HEIGHT_TOKEN, text, claimed),
            ExtractionRule::AttestationMarker => first_height(&ATTESTATION_MARKER, text, claimed),
        }
    }
}

fn first_height(pattern: &Regex, text: &str, claimed: &[Range<usize>]) -> Option<RuleMatch> {
    pattern.captures_iter(text).find_map(|captures| {
        let digits = captures.get(1)?;
        if overlaps(&digits.range(), claimed) {
            return None;
        }
        let value = digits.as_str().parse::<u64>().ok()?;
        Some(RuleMatch::Height {
            value,
            span: digits.range(),
        })
    })
}

fn overlaps(span: &Range<usize>, claimed: &[Range<usize>]) -> bool {
    claimed
        .iter()
        .any(|other| span.start < other.end && other.start < span.end)
}

/// Partial block metadata recovered from text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedMetadata {
    pub txid: Option<String>,
    pub block_height: Option<u64>,
}

impl ExtractedMetadata {
    pub fn is_empty(&self) -> bool {
        self.txid.is_none() && self.block_height.is_none()
    }
}

/// Runs every rule over `text`. Absent or blank text yields an empty result.
pub fn extract(text: Option<&str>) -> ExtractedMetadata {
    let mut found = ExtractedMetadata::default();
    let Some(text) = text.filter(|text| !text.trim().is_empty()) else {
        return found;
    };

    let mut claimed: Vec<Range<usize>> = Vec::new();
    for rule in EXTRACTION_RULES {
        let wanted = match rule {
            ExtractionRule::HexToken => found.txid.is_none(),
            ExtractionRule::HeightToken | ExtractionRule::AttestationMarker => {
                found.block_height.is_none()
            }
        };
        if !wanted {
            continue;
        }
        match rule.apply(text, &claimed) {
            Some(RuleMatch::Txid { value, span }) => {
                claimed.push(span);
                found.txid = Some(value);
            }
            Some(RuleMatch::Height { value, span }) => {
                claimed.push(span);
                found.block_height = Some(value);
            }
            None => {}
        }
    }
    found
}

/// Extracts from the proof description first; when that yields nothing, tries
/// each evidence value in key order and keeps the first non-empty result.
pub fn extract_with_fallback(
    description: Option<&str>,
    evidence: &RawEvidence,
) -> ExtractedMetadata {
    let found = extract(description);
    if !found.is_empty() {
        return found;
    }
    evidence
        .values()
        .map(|value| extract(Some(value.as_str())))
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_default()
}
