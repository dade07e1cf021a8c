//! Fixed-size sliding-window text chunker.
//!
//! Splits document text into windows of `chunk_size` characters, each
//! starting `chunk_size - overlap` characters after the previous one.
//! Sizes count Unicode scalar values, so a window never splits a code point.
//!
//! Iteration stops once a window reaches the end of the text; a trailing
//! window that would lie entirely inside its predecessor is never produced.
//! For a text of `L` characters this gives `ceil((L - O) / (S - O))` chunks
//! when `L > S`, one chunk when `0 < L <= S`, and none for empty text.
//! A plain `start += stride` loop would also emit that contained tail window
//! (two chunks for `S - O < L <= S`); this chunker deliberately does not.

use std::iter::FusedIterator;

use crate::error::ChunkConfigError;
use crate::models::{Chunk, Document};

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_OVERLAP: usize = 50;

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker, rejecting `size == 0` and `overlap >= size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkConfigError> {
        if size == 0 {
            return Err(ChunkConfigError::ZeroSize);
        }
        if overlap >= size {
            return Err(ChunkConfigError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily split `text` into overlapping windows.
    pub fn split<'a>(&self, text: &'a str) -> Windows<'a> {
        Windows {
            text,
            start: 0,
            size: self.size,
            stride: self.size - self.overlap,
            finished: text.is_empty(),
        }
    }

    /// Chunk a document, numbering windows from 0.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        self.split(&doc.content)
            .enumerate()
            .map(|(sequence_index, text)| Chunk {
                text: text.to_string(),
                source: doc.source.clone(),
                sequence_index,
            })
            .collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Iterator over the windows of one text. See [`Chunker::split`].
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    text: &'a str,
    /// Byte offset of the next window.
    start: usize,
    size: usize,
    stride: usize,
    finished: bool,
}

/// Byte offset reached after advancing `chars` characters from `from`,
/// clamped to the end of `text`.
fn advance(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

impl<'a> Iterator for Windows<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.finished || self.start >= self.text.len() {
            self.finished = true;
            return None;
        }

        let end = advance(self.text, self.start, self.size);
        let window = &self.text[self.start..end];

        if end >= self.text.len() {
            self.finished = true;
        } else {
            self.start = advance(self.text, self.start, self.stride);
        }

        Some(window)
    }
}

impl FusedIterator for Windows<'_> {}
