//! # Product Resolver
//!
//! Looks up a normalized barcode in the catalog, falling back to bounded
//! fuzzy matching when the exact lookup misses.
//!
//! ## Lookup Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         resolve(code)                                   │
//! │                                                                         │
//! │  1. EXACT        catalog.get_by_barcode(code)          confidence 1.0   │
//! │        │ miss                                                           │
//! │        ▼                                                                │
//! │  2. CONTAINMENT  (len ≥ 4)                                              │
//! │        prefix pass     "890103087507" ⊂ "8901030875071"                 │
//! │        suffix pass     "01030875071"  ⊂ "8901030875071"                 │
//! │        substring pass  "0103087507"   ⊂ "8901030875071"                 │
//! │                        confidence = len(code) / len(barcode)            │
//! │        │ miss                                                           │
//! │        ▼                                                                │
//! │  3. OVERLAP      (len > 6)                                              │
//! │        slide code across each barcode; accept the first window whose   │
//! │        per-position match ratio is > 0.8        confidence = ratio      │
//! │        │ miss                                                           │
//! │        ▼                                                                │
//! │     None  (ProductNotFound)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The resolver never deduplicates: scanning the same product twice yields
//! two matches, and merging them into one cart line is the cart's job.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::ProductCatalog;
use crate::error::{ScanError, ScanResult};
use crate::DEFAULT_FUZZY_THRESHOLD;

// =============================================================================
// Match Kind
// =============================================================================

/// Which lookup strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Prefix,
    Suffix,
    Substring,
    Fuzzy,
}

impl MatchKind {
    /// Returns true for anything other than an exact hit.
    pub fn is_approximate(&self) -> bool {
        !matches!(self, MatchKind::Exact)
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKind::Exact => write!(f, "exact"),
            MatchKind::Prefix => write!(f, "prefix"),
            MatchKind::Suffix => write!(f, "suffix"),
            MatchKind::Substring => write!(f, "substring"),
            MatchKind::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

// =============================================================================
// Product Match
// =============================================================================

/// A catalog product matched to a scanned code.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductMatch<P> {
    /// The catalog barcode that matched (not the scanned code).
    pub barcode: String,
    pub product: P,
    pub match_kind: MatchKind,
    /// 0.0 – 1.0
    pub confidence: f64,
}

// =============================================================================
// Settings
// =============================================================================

/// Tunable resolver thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// A fuzzy window must match strictly more than this share of positions.
    pub fuzzy_threshold: f64,

    /// Shortest code eligible for prefix/suffix/substring matching.
    pub min_containment_len: usize,

    /// Codes must be longer than this for the overlap pass.
    pub min_overlap_len: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        ResolverSettings {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            min_containment_len: 4,
            min_overlap_len: 6,
        }
    }
}

impl ResolverSettings {
    /// Validates threshold ranges.
    pub fn validate(&self) -> ScanResult<()> {
        if !(0.0..1.0).contains(&self.fuzzy_threshold) {
            return Err(ScanError::InvalidConfig(format!(
                "fuzzy_threshold must be in [0.0, 1.0), got {}",
                self.fuzzy_threshold
            )));
        }
        if self.min_containment_len == 0 {
            return Err(ScanError::InvalidConfig(
                "min_containment_len must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves codes against an injected catalog.
pub struct Resolver<C> {
    catalog: C,
    settings: ResolverSettings,
}

impl<C: ProductCatalog> Resolver<C> {
    /// Creates a resolver with default thresholds.
    pub fn new(catalog: C) -> Self {
        Self::with_settings(catalog, ResolverSettings::default())
    }

    /// Creates a resolver with custom thresholds.
    pub fn with_settings(catalog: C, settings: ResolverSettings) -> Self {
        Resolver { catalog, settings }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Resolves a normalized code, or `None` when every strategy misses.
    pub fn resolve(&self, code: &str) -> Option<ProductMatch<C::Product>> {
        if code.is_empty() {
            return None;
        }

        if let Some(product) = self.catalog.get_by_barcode(code) {
            return Some(ProductMatch {
                barcode: code.to_string(),
                product,
                match_kind: MatchKind::Exact,
                confidence: 1.0,
            });
        }

        let need_containment = code.len() >= self.settings.min_containment_len;
        let need_overlap = code.len() > self.settings.min_overlap_len;
        if !need_containment && !need_overlap {
            return None;
        }

        let mut barcodes = self.catalog.barcodes();
        loop {
            let candidate = need_containment
                .then(|| containment_match(code, &barcodes))
                .flatten()
                .or_else(|| {
                    need_overlap
                        .then(|| overlap_match(code, &barcodes, self.settings.fuzzy_threshold))
                        .flatten()
                })?;

            if let Some(product) = self.catalog.get_by_barcode(&candidate.barcode) {
                return Some(ProductMatch {
                    barcode: candidate.barcode,
                    product,
                    match_kind: candidate.kind,
                    confidence: candidate.confidence,
                });
            }
            // Enumeration and lookup can disagree if the catalog changed
            // between calls; drop the stale entry and search again
            barcodes.retain(|b| *b != candidate.barcode);
        }
    }

    /// Like [`Resolver::resolve`], but reports a miss as `ProductNotFound`.
    pub fn try_resolve(&self, code: &str) -> ScanResult<ProductMatch<C::Product>> {
        self.resolve(code).ok_or_else(|| ScanError::ProductNotFound {
            code: code.to_string(),
        })
    }
}

// =============================================================================
// Matching Passes
// =============================================================================

/// A barcode chosen by one of the fuzzy passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub barcode: String,
    pub kind: MatchKind,
    pub confidence: f64,
}

/// Prefix, then suffix, then substring, each over the whole catalog.
pub fn containment_match(code: &str, barcodes: &[String]) -> Option<Candidate> {
    let passes: [(MatchKind, fn(&str, &str) -> bool); 3] = [
        (MatchKind::Prefix, |b, c| b.starts_with(c)),
        (MatchKind::Suffix, |b, c| b.ends_with(c)),
        (MatchKind::Substring, |b, c| b.contains(c)),
    ];

    passes.iter().find_map(|(kind, test)| {
        barcodes
            .iter()
            .find(|b| b.len() > code.len() && test(b, code))
            .map(|b| Candidate {
                barcode: b.clone(),
                kind: *kind,
                confidence: code.len() as f64 / b.len() as f64,
            })
    })
}

/// First window, across the catalog in order, with a match ratio above
/// `threshold`.
pub fn overlap_match(code: &str, barcodes: &[String], threshold: f64) -> Option<Candidate> {
    let code = code.as_bytes();
    barcodes.iter().find_map(|barcode| {
        best_window(code, barcode.as_bytes(), threshold).map(|ratio| Candidate {
            barcode: barcode.clone(),
            kind: MatchKind::Fuzzy,
            confidence: ratio,
        })
    })
}

/// Ratio of the first window of `barcode` that beats `threshold`.
fn best_window(code: &[u8], barcode: &[u8], threshold: f64) -> Option<f64> {
    if code.is_empty() || barcode.len() < code.len() {
        return None;
    }
    barcode.windows(code.len()).find_map(|window| {
        let ratio = overlap_ratio(code, window);
        (ratio > threshold).then_some(ratio)
    })
}

/// Share of positions where `a` and `b` agree.
pub fn overlap_ratio(a: &[u8], b: &[u8]) -> f64 {
    let len = a.len().max(b.len());
    if len == 0 {
        return 0.0;
    }
    let same = a.iter().zip(b.iter()).filter(|(x, y)| x == y).count();
    same as f64 / len as f64
}

// =============================================================================
// Unit Tests
// =============================================================================
