//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`SentenceChunker`]: cuts after sentence terminators, falling back to
//!   whitespace and finally to a hard cut at `max_length`
//! - [`FixedSizeChunker`]: cuts every `max_length` characters
//!
//! Both count lengths in characters, never split a UTF-8 sequence, and
//! produce contiguous passages: `passage.text == document.text[start..end]`.
//! Consecutive passages share up to `overlap` characters; [`stitch`] undoes
//! the overlap and reproduces the original text.

use crate::document::{Document, Passage};

/// A strategy for splitting documents into passages.
///
/// Implementations must be deterministic: the same document and settings
/// always yield the same passages.
pub trait Chunker: Send + Sync {
    /// Split a document into passages.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Passage>;
}

/// Splits text into passages of at most `max_length` characters, preferring
/// to end a passage right after a sentence.
///
/// Chunk IDs are generated as `{document_id}_{index}`. Each passage inherits
/// the parent document's metadata plus a `passage_index` field.
///
/// # Example
///
/// ```rust
/// use ragchat_rag::{Chunker, Document, SentenceChunker};
///
/// let doc = Document::new("people", "Alice is 30 years old. Bob is 25 years old.");
/// let passages = SentenceChunker::new(25, 0).chunk(&doc);
/// assert_eq!(passages.len(), 2);
/// assert_eq!(passages[0].text, "Alice is 30 years old. ");
/// ```
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    max_length: usize,
    overlap: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Arguments
    ///
    /// * `max_length`: maximum number of characters per passage (at least 1)
    /// * `overlap`: characters shared by consecutive passages (less than `max_length`)
    pub fn new(max_length: usize, overlap: usize) -> Self {
        let max_length = max_length.max(1);
        Self { max_length, overlap: overlap.min(max_length - 1) }
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, document: &Document) -> Vec<Passage> {
        let spans = split_spans(&document.text, self.max_length, self.overlap, sentence_break);
        to_passages(document, spans)
    }
}

/// Splits text into fixed-size passages by character count with overlap.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    max_length: usize,
    overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `max_length`: number of characters per passage (at least 1)
    /// * `overlap`: characters shared by consecutive passages (less than `max_length`)
    pub fn new(max_length: usize, overlap: usize) -> Self {
        let max_length = max_length.max(1);
        Self { max_length, overlap: overlap.min(max_length - 1) }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Passage> {
        let spans = split_spans(&document.text, self.max_length, self.overlap, |_, _, _| None);
        to_passages(document, spans)
    }
}

/// Reassemble the text the passages were cut from, dropping the overlapping
/// prefix of every passage after the first.
///
/// Passages must be in index order and come from a single document.
pub fn stitch(passages: &[Passage]) -> String {
    let mut text = String::new();
    let mut covered = 0usize;
    for passage in passages {
        let skip = covered.saturating_sub(passage.start).min(passage.text.len());
        text.push_str(&passage.text[skip..]);
        covered = covered.max(passage.end);
    }
    text
}

/// Picks an end position in `(floor, limit]` (character indices) or `None`
/// to cut hard at `limit`.
type BreakFn = fn(&[char], usize, usize) -> Option<usize>;

/// Latest sentence end in `(floor, limit]`, else the latest whitespace.
fn sentence_break(chars: &[char], floor: usize, limit: usize) -> Option<usize> {
    let mut whitespace = None;
    for end in (floor + 1..=limit).rev() {
        let last = chars[end - 1];
        if last == '\n' {
            return Some(end);
        }
        if last.is_whitespace() {
            if end >= 2 && matches!(chars[end - 2], '.' | '!' | '?') {
                return Some(end);
            }
            whitespace.get_or_insert(end);
        }
    }
    whitespace
}

/// Compute byte ranges of consecutive passages.
fn split_spans(
    text: &str,
    max_length: usize,
    overlap: usize,
    pick_break: BreakFn,
) -> Vec<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let offsets: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let total = chars.len();

    let mut spans = Vec::new();
    let mut start = 0;
    let mut prev_end = 0;

    while start < total {
        let limit = (start + max_length).min(total);
        let end = if limit == total {
            total
        } else {
            pick_break(&chars, prev_end.max(start), limit).unwrap_or(limit)
        };

        spans.push((offsets[start], offsets[end]));
        if end == total {
            break;
        }
        prev_end = end;
        start = end.saturating_sub(overlap).max(start + 1);
    }

    spans
}

fn to_passages(document: &Document, spans: Vec<(usize, usize)>) -> Vec<Passage> {
    spans
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| {
            let mut metadata = document.metadata.clone();
            metadata.insert("passage_index".to_string(), index.to_string());
            Passage {
                id: format!("{}_{index}", document.id),
                document_id: document.id.clone(),
                index,
                text: document.text[start..end].to_string(),
                start,
                end,
                metadata,
            }
        })
        .collect()
}
