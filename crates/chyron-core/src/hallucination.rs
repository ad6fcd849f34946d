//! Hallucination-drop protection (spec.md §4.3.4).
//!
//! When a long prior partial is about to be replaced by a much shorter,
//! context-disjoint new text, the old text is protected by forcibly
//! committing it instead of silently discarding it.

/// "Significant word" threshold retained verbatim from the source behavior;
/// do not tune without evidence (spec.md §9).
const SIGNIFICANT_WORD_MIN_LEN: usize = 2;

/// True if `last_partial` should be force-committed and replaced by `text`
/// rather than simply becoming the new partial.
pub fn should_force_commit(last_partial: &str, text: &str) -> bool {
    let old: Vec<&str> = last_partial.split_whitespace().collect();
    let new: Vec<&str> = text.split_whitespace().collect();

    if !(old.len() >= 3 && !new.is_empty() && new.len() < old.len()) {
        return false;
    }

    let new_lower: Vec<String> = new.iter().map(|w| w.to_lowercase()).collect();
    let old_significant: Vec<&&str> = old
        .iter()
        .filter(|w| w.len() > SIGNIFICANT_WORD_MIN_LEN)
        .collect();

    let matches = old_significant
        .iter()
        .filter(|w| new_lower.contains(&w.to_lowercase()))
        .count();

    old_significant.len() >= 2 && matches == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_context_disjoint_replacement() {
        assert!(should_force_commit(
            "the quick brown fox jumps over",
            "cat"
        ));
    }

    #[test]
    fn does_not_trigger_when_words_overlap() {
        assert!(!should_force_commit(
            "the quick brown fox jumps over",
            "the fox jumps"
        ));
    }

    #[test]
    fn does_not_trigger_when_old_partial_too_short() {
        assert!(!should_force_commit("cat dog", "fish"));
    }

    #[test]
    fn does_not_trigger_when_new_is_not_shorter() {
        assert!(!should_force_commit("cat dog bird", "cat dog bird fish"));
    }

    #[test]
    fn does_not_trigger_on_empty_new_text() {
        assert!(!should_force_commit("the quick brown fox jumps over", ""));
    }
}
