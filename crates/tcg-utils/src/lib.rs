//! Shared string helpers for the deck tracker.
//!
//! Card names, set labels, and catalog ids are compared case-insensitively
//! throughout the system; these helpers use Unicode lowercase folding since
//! card names are not ASCII-only.

/// Case-insensitive string equality.
pub fn eq_fold(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Case-insensitive substring containment.
pub fn contains_fold(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_fold_ignores_case() {
        assert!(eq_fold("A1-045", "a1-045"));
        assert!(eq_fold("Pikachu", "PIKACHU"));
        assert!(!eq_fold("Pikachu", "Raichu"));
    }

    #[test]
    fn eq_fold_handles_non_ascii() {
        assert!(eq_fold("Pokémon", "POKÉMON"));
    }

    #[test]
    fn contains_fold_matches_substrings() {
        assert!(contains_fold("Genetic Apex (A1)", "apex"));
        assert!(contains_fold("Genetic Apex (A1)", "(a1)"));
        assert!(!contains_fold("Genetic Apex (A1)", "mythical"));
    }
}
