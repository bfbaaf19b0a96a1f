//! Resolves noisy free-text CPU/GPU names onto canonical benchmark entries:
//! exact match first, then a brand-stripped fuzzy search with a fixed
//! acceptance threshold.

use crate::model::BenchmarkEntry;
use strsim::normalized_levenshtein;
use tracing::warn;

/// Similarity (0-100) below which a fuzzy candidate is rejected.
pub const MATCH_THRESHOLD: f64 = 80.0;

/// Vendor/brand tokens that carry no model information and differ wildly
/// between vendor listings and benchmark tables.
const BRAND_TOKENS: &[&str] = &[
    "nvidia", "geforce", "quadro", "intel", "amd", "radeon", "graphics",
];

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Resolved to a benchmark entry, exactly or fuzzily.
    Matched { name: String, score: f64 },
    /// The "Integrated" literal; scored as a fixed baseline, never fuzzed.
    Integrated,
    /// No entry above the threshold (or the "N/A" literal).
    Unmatched,
}

/// Lowercases, drops any "@ 3.20GHz" clock suffix, strips brand tokens and
/// collapses whitespace. Applied to both query and candidates before every
/// comparison.
pub fn clean_name(name: &str) -> String {
    let base = name.split('@').next().unwrap_or(name).to_lowercase();
    base.split_whitespace()
        .filter(|token| !BRAND_TOKENS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolution order: special literals, exact canonical name, fuzzy search.
/// Ties on the fuzzy ratio break to the first candidate in table order
/// (tables are sorted by name).
pub fn resolve(query: &str, table: &[BenchmarkEntry]) -> MatchOutcome {
    let query = query.trim();
    if query.is_empty() || query.eq_ignore_ascii_case("n/a") {
        return MatchOutcome::Unmatched;
    }
    if query.eq_ignore_ascii_case("integrated") {
        return MatchOutcome::Integrated;
    }

    if let Some(entry) = table.iter().find(|e| e.name == query) {
        return MatchOutcome::Matched { name: entry.name.clone(), score: entry.score };
    }

    let cleaned_query = clean_name(query);
    let mut best: Option<(&BenchmarkEntry, f64)> = None;
    for entry in table {
        let ratio = normalized_levenshtein(&cleaned_query, &clean_name(&entry.name)) * 100.0;
        if best.is_none_or(|(_, best_ratio)| ratio > best_ratio) {
            best = Some((entry, ratio));
        }
    }

    match best {
        Some((entry, ratio)) if ratio >= MATCH_THRESHOLD => {
            MatchOutcome::Matched { name: entry.name.clone(), score: entry.score }
        }
        Some((entry, ratio)) => {
            warn!(
                "no benchmark match for {query:?}; best candidate {:?} at {ratio:.1}",
                entry.name
            );
            MatchOutcome::Unmatched
        }
        None => {
            warn!("no benchmark match for {query:?}; table is empty");
            MatchOutcome::Unmatched
        }
    }
}
