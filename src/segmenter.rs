//! Sentence segmentation for TTS chunk alignment.
//!
//! The backend chunks submitted text with the same rules, one audio clip per
//! sentence, so chunk indices here must match its indices exactly. Keep the
//! normalization steps in lockstep with the server's chunker.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use ts_rs::TS;

static RE_PARAGRAPH_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
static RE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// One element of the display layout: a speakable sentence or a paragraph
/// break that only affects rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
#[ts(export)]
pub enum Segment {
    Sentence(String),
    ParagraphBreak,
}

impl Segment {
    pub fn is_break(&self) -> bool {
        matches!(self, Segment::ParagraphBreak)
    }

    pub fn sentence(&self) -> Option<&str> {
        match self {
            Segment::Sentence(text) => Some(text),
            Segment::ParagraphBreak => None,
        }
    }
}

/// Split raw text into sentences with paragraph-break markers between
/// non-empty paragraphs.
pub fn segment(text: &str) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }
    let normalized = text.replace("\r\n", "\n");

    let mut segments = Vec::new();
    for paragraph in RE_PARAGRAPH_BOUNDARY.split(&normalized) {
        let clean = RE_WHITESPACE_RUN.replace_all(paragraph, " ");
        let clean = clean.trim();
        if clean.is_empty() {
            continue;
        }
        let sentences = split_sentences(clean);
        if sentences.is_empty() {
            continue;
        }
        if !segments.is_empty() {
            segments.push(Segment::ParagraphBreak);
        }
        segments.extend(sentences.into_iter().map(Segment::Sentence));
    }
    segments
}

/// Sentence texts only, in chunk-index order.
pub fn logical_sentences(segments: &[Segment]) -> Vec<String> {
    segments
        .iter()
        .filter_map(|segment| segment.sentence().map(str::to_string))
        .collect()
}

pub fn logical_sentence_count(segments: &[Segment]) -> usize {
    segments.iter().filter(|segment| !segment.is_break()).count()
}

/// Split a whitespace-collapsed paragraph on the single spaces that directly
/// follow terminal punctuation.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut prev: Option<char> = None;

    for (pos, ch) in paragraph.char_indices() {
        if ch == ' ' && matches!(prev, Some('.' | '!' | '?')) {
            let sentence = &paragraph[start..pos];
            if !sentence.trim().is_empty() {
                sentences.push(sentence.to_string());
            }
            start = pos + ch.len_utf8();
        }
        prev = Some(ch);
    }

    let tail = &paragraph[start..];
    if !tail.trim().is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(text: &str) -> Vec<String> {
        logical_sentences(&segment(text))
    }

    #[test]
    fn paragraph_breaks_do_not_count_as_sentences() {
        let segments = segment("A. B.\n\nC.");
        assert_eq!(
            segments,
            vec![
                Segment::Sentence("A.".into()),
                Segment::Sentence("B.".into()),
                Segment::ParagraphBreak,
                Segment::Sentence("C.".into()),
            ]
        );
        assert_eq!(logical_sentence_count(&segments), 3);
    }

    #[test]
    fn punctuation_stays_with_preceding_sentence() {
        assert_eq!(
            sentences("Is it? Yes! It is. Done"),
            vec!["Is it?", "Yes!", "It is.", "Done"]
        );
    }

    #[test]
    fn punctuation_without_following_space_does_not_split() {
        assert_eq!(sentences("Version 1.2 shipped.Twice"), vec!["Version 1.2 shipped.Twice"]);
    }

    #[test]
    fn internal_whitespace_is_collapsed() {
        assert_eq!(
            sentences("Hello   world.\tGoodbye\nnow."),
            vec!["Hello world.", "Goodbye now."]
        );
    }

    #[test]
    fn whitespace_reformatting_keeps_boundaries() {
        let compact = segment("One two. Three four!\n\nFive six?");
        let loose = segment("  One   two.\n Three\tfour!  \r\n \r\n\n   Five\n six?   ");
        assert_eq!(compact, loose);
    }

    #[test]
    fn crlf_paragraphs_are_recognized() {
        let segments = segment("First.\r\n\r\nSecond.");
        assert_eq!(segments.len(), 3);
        assert!(segments[1].is_break());
    }

    #[test]
    fn no_leading_or_trailing_or_doubled_breaks() {
        let segments = segment("\n\n  \n\nA.\n\n\n\n   \n\nB.\n\n\n");
        assert_eq!(
            segments,
            vec![
                Segment::Sentence("A.".into()),
                Segment::ParagraphBreak,
                Segment::Sentence("B.".into()),
            ]
        );
    }

    #[test]
    fn empty_and_blank_text_yield_nothing() {
        assert!(segment("").is_empty());
        assert!(segment(" \n\n \t").is_empty());
    }

    #[test]
    fn single_newline_is_not_a_paragraph() {
        let segments = segment("Line one\nline two.");
        assert_eq!(segments, vec![Segment::Sentence("Line one line two.".into())]);
    }
}
