//! Gene-like token extraction from free-text hit descriptions.

use regex::Regex;
use std::sync::LazyLock;

/// Patterns in priority order; group 1 is the candidate token
static GENE_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // MGC clone names, e.g. MGC2752
        r"(?i)\b(MGC\d+)\b",
        // token followed by "protein"
        r"(?i)\b([A-Z0-9]{2,})\s+protein\b",
        // "protein" followed by token
        r"(?i)protein\s+([A-Z0-9]{2,})\b",
        // letters then digits, the generic symbol shape
        r"(?i)\b([A-Z]{2,}[0-9]{1,})\b",
    ]
    .map(|pattern| Regex::new(pattern).expect("gene pattern is valid"))
});

static SYMBOL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z0-9]+$").expect("symbol shape pattern is valid"));

/// Guess a gene-name candidate from description text.
///
/// Returns the first pattern's capture with its original casing, or `None`
/// when nothing matches.
pub fn extract_gene_name(text: &str) -> Option<&str> {
    GENE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    })
}

/// Whether an identifier is shaped like a gene symbol (alphanumeric only)
pub fn looks_like_symbol(identifier: &str) -> bool {
    SYMBOL_SHAPE.is_match(identifier)
}
