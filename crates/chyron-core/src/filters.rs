//! Ordered text filters applied to raw STT output before it becomes a
//! partial or final event (spec.md §4.3.3).

use regex::Regex;
use std::sync::OnceLock;
use std::time::Instant;

fn brackets_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[.*?\]").unwrap())
}

fn parens_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(.*?\)").unwrap())
}

/// Removes `[...]`, `(...)` and the musical-note glyph, then trims.
pub fn strip_tags(text: &str) -> String {
    let s = brackets_re().replace_all(text, "");
    let s = parens_re().replace_all(&s, "");
    s.replace('♪', "").trim().to_string()
}

pub fn is_silence_hallucination(text: &str) -> bool {
    let t = text.trim();
    t.eq_ignore_ascii_case("thank you") || t.eq_ignore_ascii_case("thank you.")
}

/// Outcome of running the ordered filter pipeline on one piece of raw text.
pub struct FilterResult {
    /// `Some(text)` if the update should proceed to hallucination-drop
    /// protection and partial update; `None` if it should be dropped.
    pub text: Option<String>,
    /// True whenever the stripped text qualified as a "pure tag" (whether
    /// ultimately passed through or suppressed), for metrics.
    pub was_pure_tag: bool,
}

/// Applies the ordered filters from spec.md §4.3.3 to trimmed raw text.
/// `tag_streak_start` is segmenter-owned state threaded through calls.
pub fn apply_filters(
    raw_trimmed: &str,
    tag_streak_start: &mut Option<Instant>,
    now: Instant,
    tag_hold_s: f64,
) -> FilterResult {
    let stripped = strip_tags(raw_trimmed);
    let is_pure_tag = stripped.chars().count() < 2 && raw_trimmed.chars().count() >= 2;

    let candidate = if !is_pure_tag {
        *tag_streak_start = None;
        if stripped.trim().is_empty() || stripped.chars().count() < 2 {
            return FilterResult {
                text: None,
                was_pure_tag: false,
            };
        }
        stripped
    } else {
        let start = *tag_streak_start.get_or_insert(now);
        if now.duration_since(start).as_secs_f64() < tag_hold_s {
            return FilterResult {
                text: None,
                was_pure_tag: true,
            };
        }
        raw_trimmed.to_string()
    };

    if is_silence_hallucination(&candidate) {
        return FilterResult {
            text: None,
            was_pure_tag: is_pure_tag,
        };
    }

    FilterResult {
        text: Some(candidate),
        was_pure_tag: is_pure_tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_brackets_parens_and_note_glyph() {
        assert_eq!(strip_tags("[noise] hello (aside) world ♪"), "hello  world");
    }

    #[test]
    fn drops_known_silence_hallucination() {
        let mut streak = None;
        let result = apply_filters("Thank you.", &mut streak, Instant::now(), 4.0);
        assert!(result.text.is_none());
    }

    #[test]
    fn pure_tag_is_held_then_passed() {
        let mut streak = None;
        let now = Instant::now();
        let first = apply_filters("[music]", &mut streak, now, 4.0);
        assert!(first.text.is_none());
        assert!(first.was_pure_tag);

        let later = now + std::time::Duration::from_secs(5);
        let second = apply_filters("[music]", &mut streak, later, 4.0);
        assert_eq!(second.text.as_deref(), Some("[music]"));
    }

    #[test]
    fn ordinary_speech_resets_tag_streak() {
        let mut streak = Some(Instant::now());
        let result = apply_filters("hello world", &mut streak, Instant::now(), 4.0);
        assert_eq!(result.text.as_deref(), Some("hello world"));
        assert!(streak.is_none());
    }

    #[test]
    fn short_stripped_result_is_dropped() {
        let mut streak = None;
        let result = apply_filters("a", &mut streak, Instant::now(), 4.0);
        assert!(result.text.is_none());
    }
}
