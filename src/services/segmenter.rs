use once_cell::sync::Lazy;
use regex::Regex;

/// Sentence segmentation service.
///
/// Returned spans are ordered, do not overlap, and concatenate back to the
/// input text. `language` is the source language code of the document
/// (`en`, `de-CH`) for segmenters with per-language rules.
pub trait Segmenter {
    fn segment(&self, text: &str, language: &str) -> Vec<String>;
}

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+[\)\]'\u{201D}\u{2019}]*\s+").expect("sentence pattern is valid"));

/// Breaks after `.`, `!` or `?` followed by whitespace; the whitespace stays
/// with the sentence it follows. The same rule applies to every language.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationSegmenter;

impl Segmenter for PunctuationSegmenter {
    fn segment(&self, text: &str, _language: &str) -> Vec<String> {
        let mut spans = Vec::new();
        let mut last = 0;
        for m in SENTENCE_END.find_iter(text) {
            if m.end() < text.len() {
                spans.push(text[last..m.end()].to_string());
                last = m.end();
            }
        }
        if last < text.len() {
            spans.push(text[last..].to_string());
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_concatenate_to_input() {
        let text = "First one. Second one!  Third? tail";
        let spans = PunctuationSegmenter.segment(text, "en");
        assert_eq!(spans, vec!["First one. ", "Second one!  ", "Third? ", "tail"]);
        assert_eq!(spans.concat(), text);
    }

    #[test]
    fn trailing_space_stays_in_last_span() {
        let spans = PunctuationSegmenter.segment("Only one. ", "en");
        assert_eq!(spans, vec!["Only one. "]);
    }

    #[test]
    fn empty_text_has_no_spans() {
        assert!(PunctuationSegmenter.segment("", "en").is_empty());
    }
}
