//! Name canonicalization for fuzzy matching.
//!
//! Category and forum names drift between the catalog and the live guild:
//! trailing punctuation, doubled spaces, case changes. `normalize` produces
//! the canonical key both sides are matched on. Post titles are deliberately
//! NOT normalized anywhere - they are the catalog's primary key.

/// Canonicalize a display name for equality comparison.
///
/// Strips every character outside the word/whitespace class, collapses
/// internal whitespace to single spaces, trims, and lower-cases. Pure and
/// total; `normalize(normalize(x)) == normalize(x)` for all inputs.
pub fn normalize(name: &str) -> String {
    // Lower-case first: some case folds expand into combining marks, and
    // stripping must see the folded form for a second pass to be a no-op.
    let stripped: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
