//! Turns the `(text, final)` event stream into a stable two-line display
//! (spec.md §4.4).

use crate::config::RendererConfig;
use crate::filters::{is_silence_hallucination, strip_tags};
use regex::Regex;
use std::sync::OnceLock;

const PROFANITY_BLACKLIST: &[&str] = &["damn", "hell", "shit", "fuck", "ass", "bitch", "crap"];

fn profanity_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        PROFANITY_BLACKLIST
            .iter()
            .map(|word| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))).unwrap())
            .collect()
    })
}

fn mask_profanity(text: &str) -> String {
    let mut result = text.to_string();
    for pattern in profanity_patterns() {
        result = pattern.replace_all(&result, "***").to_string();
    }
    result
}

fn comparison_form(word: &str) -> String {
    let w = word.trim_start_matches(['"', '\'']);
    let w = w.trim_end_matches(['.', ',', '?', '!', '"', '\'']);
    w.to_lowercase()
}

fn split_at_chars(s: &str, n: usize) -> (&str, &str) {
    match s.char_indices().nth(n) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    }
}

/// Greedy word-wrap into lines no wider than `chars_per_line`. A single word
/// longer than the line width is hard-split so the "no line exceeds
/// chars_per_line" invariant always holds.
pub fn wrap_lines(text: &str, chars_per_line: usize) -> Vec<String> {
    let width = chars_per_line.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut remaining = word;
        while remaining.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let (head, tail) = split_at_chars(remaining, width);
            lines.push(head.to_string());
            remaining = tail;
        }
        if remaining.is_empty() {
            continue;
        }
        if current.is_empty() {
            current = remaining.to_string();
        } else if current.chars().count() + 1 + remaining.chars().count() <= width {
            current.push(' ');
            current.push_str(remaining);
        } else {
            lines.push(std::mem::take(&mut current));
            current = remaining.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Overlap-aware splice of `addition` onto the tail of `history`
/// (spec.md §4.4.2). Two distinct search paths are preserved deliberately
/// (see spec.md §9's open question): the anchor search tries descending
/// `k` and, for each `k`, scans candidate start indices from the back,
/// returning the first (and therefore latest) match; the suffix-prefix
/// fallback scans `k` ascending and keeps the largest matching `k`.
pub fn merge(history: &str, addition: &str) -> String {
    if addition.trim().is_empty() {
        return history.to_string();
    }
    if history.trim().is_empty() {
        return addition.to_string();
    }

    let hist_words: Vec<&str> = history.split_whitespace().collect();
    let add_words: Vec<&str> = addition.split_whitespace().collect();
    let hist_cmp: Vec<String> = hist_words.iter().map(|w| comparison_form(w)).collect();
    let add_cmp: Vec<String> = add_words.iter().map(|w| comparison_form(w)).collect();

    let search_start = hist_words.len().saturating_sub(100);
    let max_k = [5, add_words.len(), hist_words.len()]
        .into_iter()
        .min()
        .unwrap_or(0);

    for k in (2..=max_k).rev() {
        if k > hist_words.len() {
            continue;
        }
        let hi = hist_words.len() - k;
        if hi < search_start {
            continue;
        }
        for i in (search_start..=hi).rev() {
            if hist_cmp[i..i + k] == add_cmp[0..k] {
                let mut result_words: Vec<&str> = hist_words[0..i].to_vec();
                result_words.extend_from_slice(&add_words);
                return result_words.join(" ");
            }
        }
    }

    let max_sp_k = hist_words.len().min(add_words.len());
    let mut best_k = 0usize;
    for k in 1..=max_sp_k {
        if hist_cmp[hist_words.len() - k..] == add_cmp[0..k] {
            best_k = k;
        }
    }
    if best_k > 0 {
        let mut result_words: Vec<&str> = hist_words.clone();
        result_words.extend_from_slice(&add_words[best_k..]);
        return result_words.join(" ");
    }

    format!("{history} {addition}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLines {
    pub line1: String,
    pub line2: String,
}

fn normalize_for_display(s: &str) -> String {
    if s.is_empty() {
        " ".to_string()
    } else {
        s.to_string()
    }
}

pub struct OutputRenderer {
    config: RendererConfig,
    history: String,
    pinned_line1: Option<String>,
    translator: Option<Box<dyn Fn(&str) -> String + Send + Sync>>,
}

impl OutputRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            history: String::new(),
            pinned_line1: None,
            translator: None,
        }
    }

    pub fn set_translator(&mut self, translator: Box<dyn Fn(&str) -> String + Send + Sync>) {
        self.translator = Some(translator);
    }

    /// Exposed as a mutable property; the renderer never computes it itself
    /// (spec.md §4.4.5).
    pub fn set_chars_per_line(&mut self, chars_per_line: usize) {
        self.config.chars_per_line = chars_per_line;
    }

    pub fn history(&self) -> &str {
        &self.history
    }

    /// Idempotent with respect to rendering; must be called from a single
    /// logical thread.
    pub fn on_text(&mut self, text: &str, is_final: bool) -> Option<RenderedLines> {
        let filtered = self.pre_filter(text)?;
        if is_final {
            self.history = merge(&self.history, &filtered);
            self.trim_history();
            Some(self.layout(&self.history.clone()))
        } else {
            let merged = merge(&self.history, &filtered);
            Some(self.layout(&merged))
        }
    }

    fn pre_filter(&self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.chars().count() < 2 {
            return None;
        }
        if is_silence_hallucination(trimmed) {
            return None;
        }

        let mut result = trimmed.to_string();
        if !self.config.show_audio_tags {
            result = strip_tags(&result);
            if result.chars().count() < 2 {
                return None;
            }
        }
        if self.config.filter_profanity {
            result = mask_profanity(&result);
        }
        if let Some(translator) = &self.translator {
            result = translator(&result);
        }
        Some(result)
    }

    fn trim_history(&mut self) {
        let lines = wrap_lines(&self.history, self.config.chars_per_line);
        if lines.len() > self.config.max_history_lines {
            let start = lines.len() - self.config.max_history_lines;
            self.history = lines[start..].join(" ");
        }
    }

    fn layout(&mut self, text: &str) -> RenderedLines {
        let lines = wrap_lines(text, self.config.chars_per_line);
        if lines.len() == 1 {
            return RenderedLines {
                line1: normalize_for_display(&lines[0]),
                line2: normalize_for_display(""),
            };
        }
        let target1 = &lines[lines.len() - 2];
        let target2 = &lines[lines.len() - 1];

        let line1 = match &self.pinned_line1 {
            Some(pinned) if target1.to_lowercase().starts_with(&pinned.to_lowercase()) => {
                pinned.clone()
            }
            _ => {
                self.pinned_line1 = Some(target1.clone());
                target1.clone()
            }
        };

        RenderedLines {
            line1: normalize_for_display(&line1),
            line2: normalize_for_display(target2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_empty_addition_is_identity() {
        assert_eq!(merge("hello world", ""), "hello world");
    }

    #[test]
    fn merge_empty_history_returns_addition() {
        assert_eq!(merge("", "hello world"), "hello world");
    }

    #[test]
    fn merge_full_duplicate_is_suppressed() {
        let history = "I went to the store";
        assert_eq!(merge(history, history), history);
    }

    #[test]
    fn merge_splices_overlap_scenario() {
        let history = "I went to the store";
        let addition = "to the store yesterday";
        assert_eq!(merge(history, addition), "I went to the store yesterday");
    }

    #[test]
    fn merge_suffix_prefix_fallback_keeps_largest_k() {
        let history = "a b c d e";
        let addition = "d e f";
        assert_eq!(merge(history, addition), "a b c d e f");
    }

    #[test]
    fn merge_falls_back_to_space_join_when_no_overlap() {
        assert_eq!(merge("completely unrelated", "brand new text"), "completely unrelated brand new text");
    }

    #[test]
    fn wrap_lines_never_exceeds_width() {
        let lines = wrap_lines("the quick brown fox jumps over the lazy dog", 10);
        for line in &lines {
            assert!(line.chars().count() <= 10, "line {line:?} exceeded width");
        }
    }

    #[test]
    fn single_line_renders_empty_second_line() {
        let mut renderer = OutputRenderer::new(RendererConfig {
            chars_per_line: 80,
            ..RendererConfig::default()
        });
        let rendered = renderer.on_text("hello world", true).unwrap();
        assert_eq!(rendered.line1, "hello world");
        assert_eq!(rendered.line2, " ");
    }

    #[test]
    fn pinned_line1_survives_prefix_matching_rewrap() {
        let mut renderer = OutputRenderer::new(RendererConfig {
            chars_per_line: 20,
            ..RendererConfig::default()
        });
        let first = renderer
            .on_text("alpha beta gamma delta epsilon", true)
            .unwrap();
        let pinned = renderer.pinned_line1.clone().unwrap();
        assert_eq!(first.line1, pinned);
        assert_eq!(pinned, "alpha beta gamma");

        // Appending a word that only grows the second line must keep line 1
        // pinned to the same text rather than recomputing the wrap from
        // scratch.
        let second = renderer.on_text("epsilon zeta", true).unwrap();
        assert_eq!(second.line1, pinned);
        assert_eq!(second.line2, "delta epsilon zeta");
    }

    #[test]
    fn pre_filter_drops_blank_and_short_and_hallucination() {
        let mut renderer = OutputRenderer::new(RendererConfig::default());
        assert!(renderer.on_text("   ", false).is_none());
        assert!(renderer.on_text("a", false).is_none());
        assert!(renderer.on_text("Thank you.", false).is_none());
    }

    #[test]
    fn profanity_is_masked_when_enabled() {
        let mut renderer = OutputRenderer::new(RendererConfig {
            filter_profanity: true,
            ..RendererConfig::default()
        });
        let rendered = renderer.on_text("that is damn good", false).unwrap();
        assert!(rendered.line1.contains("***"));
        assert!(!rendered.line1.to_lowercase().contains("damn"));
    }

    #[test]
    fn audio_tags_stripped_when_disabled() {
        let mut renderer = OutputRenderer::new(RendererConfig {
            show_audio_tags: false,
            ..RendererConfig::default()
        });
        assert!(renderer.on_text("[music]", false).is_none());
    }
}
