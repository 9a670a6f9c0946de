//! # Barcode Normalizer
//!
//! Converts noisy or partial decoded text into a canonical barcode string.
//!
//! ## Extraction Cascade
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Normalizer Cascade (first match wins)                │
//! │                                                                         │
//! │  raw text                                                               │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  1. fast_path          all digits, 6..=14 long      → unchanged         │
//! │     │ no                                                                │
//! │     ▼                                                                   │
//! │  2. standard_length    bounded run of 13 / 12 / 8   → EAN-13/UPC-A/     │
//! │     │ no               (or separator-stripped)         EAN-8/UPC-E      │
//! │     ▼                                                                   │
//! │  3. relaxed_length     bounded run of 11-13 / 7-9   → one damaged digit │
//! │     │ no                                                                │
//! │     ▼                                                                   │
//! │  4. digit_run          any run of 6+ digits                             │
//! │     │ no                                                                │
//! │     ▼                                                                   │
//! │  5. strip_non_digits   all digits joined, if 6+                         │
//! │     │ no                                                                │
//! │     ▼                                                                   │
//! │  None  (ExtractionFailure: event discarded, no catalog lookup)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Structure is preferred over recall: noisier extraction only runs when no
//! standard-length code is visible.
//!
//! Every output is all-digit and at least [`MIN_BARCODE_DIGITS`] long, and
//! `normalize(normalize(x)) == normalize(x)` whenever the first call
//! succeeds.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::Symbology;
use crate::MIN_BARCODE_DIGITS;

/// Longest all-digit input taken verbatim by the fast path.
const FAST_PATH_MAX_DIGITS: usize = 14;

/// Characters a label printer or keyboard wedge puts between digit groups.
const SEPARATORS: &[char] = &[' ', '-', '.', '_', '/'];

// =============================================================================
// Strategy Table
// =============================================================================

/// One named step of the cascade.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub extract: fn(&str) -> Option<String>,
}

/// The cascade, in priority order.
pub const CASCADE: [Strategy; 5] = [
    Strategy {
        name: "fast_path",
        extract: fast_path,
    },
    Strategy {
        name: "standard_length",
        extract: standard_length,
    },
    Strategy {
        name: "relaxed_length",
        extract: relaxed_length,
    },
    Strategy {
        name: "digit_run",
        extract: digit_run,
    },
    Strategy {
        name: "strip_non_digits",
        extract: strip_non_digits,
    },
];

/// Result of a successful normalization, with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub code: String,
    pub strategy: &'static str,
}

impl Normalized {
    /// Symbology implied by the code's length, if standard.
    pub fn symbology(&self) -> Option<Symbology> {
        detect_symbology(&self.code)
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Normalizes decoded text into a barcode, or `None` if nothing usable.
///
/// ## Example
/// ```rust
/// use titan_scan_core::normalizer::normalize;
///
/// assert_eq!(normalize("8901030875071").as_deref(), Some("8901030875071"));
/// assert_eq!(normalize("lbl1234567end").as_deref(), Some("1234567"));
/// assert_eq!(normalize("12-34"), None);
/// ```
pub fn normalize(raw: &str) -> Option<String> {
    normalize_detailed(raw).map(|n| n.code)
}

/// Like [`normalize`], but reports which strategy matched.
pub fn normalize_detailed(raw: &str) -> Option<Normalized> {
    CASCADE.iter().find_map(|strategy| {
        (strategy.extract)(raw)
            .filter(|code| code.len() >= MIN_BARCODE_DIGITS)
            .map(|code| Normalized {
                code,
                strategy: strategy.name,
            })
    })
}

/// Names the symbology a code's length corresponds to.
///
/// An 8-digit code starting with `0` is reported as UPC-E.
pub fn detect_symbology(code: &str) -> Option<Symbology> {
    if !is_all_digits(code) {
        return None;
    }
    match code.len() {
        13 => Some(Symbology::Ean13),
        12 => Some(Symbology::UpcA),
        8 if code.starts_with('0') => Some(Symbology::UpcE),
        8 => Some(Symbology::Ean8),
        _ => None,
    }
}

// =============================================================================
// Strategies
// =============================================================================

/// 1. Already clean.
pub fn fast_path(raw: &str) -> Option<String> {
    let len = raw.len();
    if is_all_digits(raw) && (MIN_BARCODE_DIGITS..=FAST_PATH_MAX_DIGITS).contains(&len) {
        Some(raw.to_string())
    } else {
        None
    }
}

/// 2. Exact EAN-13 / UPC-A / EAN-8 (UPC-E) length.
pub fn standard_length(raw: &str) -> Option<String> {
    if let Some(m) = standard_run().find(raw) {
        return Some(m.as_str().to_string());
    }

    // "89-0103-087507": only digits and separators, so the groups are one code
    let trimmed = raw.trim();
    if !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || SEPARATORS.contains(&c))
    {
        let joined: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        if matches!(joined.len(), 13 | 12 | 8) {
            return Some(joined);
        }
    }

    None
}

/// 3. Off by one digit at either end of a standard length.
pub fn relaxed_length(raw: &str) -> Option<String> {
    relaxed_run().find(raw).map(|m| m.as_str().to_string())
}

/// 4. First run of six or more digits, wherever it sits.
pub fn digit_run(raw: &str) -> Option<String> {
    long_run().find(raw).map(|m| m.as_str().to_string())
}

/// 5. Every digit in the text, joined.
pub fn strip_non_digits(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() >= MIN_BARCODE_DIGITS).then_some(digits)
}

// =============================================================================
// Patterns
// =============================================================================

// `\b` makes letters count as part of the run, so "lbl1234567end" has no
// bounded run at all and falls through to `digit_run`.

fn standard_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:[0-9]{13}|[0-9]{12}|[0-9]{8})\b").expect("static pattern")
    })
}

fn relaxed_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:[0-9]{11,13}|[0-9]{7,9})\b").expect("static pattern")
    })
}

fn long_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]{6,}").expect("static pattern"))
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// =============================================================================
// Unit Tests
// =============================================================================
