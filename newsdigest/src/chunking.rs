// Token-window chunking for texts that exceed a model's context window
use anyhow::{bail, Result};
use std::iter::FusedIterator;

pub const DEFAULT_MAX_TOKENS: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 200;

/// Window parameters for [`chunk_text`].
///
/// Construction guarantees `overlap < max_tokens`, so consecutive windows always
/// advance by at least one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkWindow {
    max_tokens: usize,
    overlap: usize,
}

impl ChunkWindow {
    pub fn new(max_tokens: usize, overlap: usize) -> Result<Self> {
        if max_tokens == 0 {
            bail!("chunk max_tokens must be greater than zero");
        }
        if overlap >= max_tokens {
            bail!(
                "chunk overlap ({}) must be smaller than max_tokens ({})",
                overlap,
                max_tokens
            );
        }
        Ok(Self { max_tokens, overlap })
    }

    /// Distance between the starts of two consecutive windows
    pub fn stride(&self) -> usize {
        self.max_tokens - self.overlap
    }

    /// Number of windows produced for a text of `token_count` tokens
    pub fn chunk_count(&self, token_count: usize) -> usize {
        if token_count == 0 {
            0
        } else if token_count <= self.max_tokens {
            1
        } else {
            (token_count - self.overlap).div_ceil(self.stride())
        }
    }
}

impl Default for ChunkWindow {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Lazy iterator over overlapping token windows, see [`chunk_text`]
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    tokens: Vec<&'a str>,
    window: ChunkWindow,
    start: usize,
    done: bool,
}

/// Split `text` on whitespace and yield overlapping windows of tokens, each
/// re-joined with single spaces.
///
/// The first window covers `tokens[0..max_tokens]`, every following window starts
/// `max_tokens - overlap` tokens later. Iteration ends with the first window that
/// reaches the last token. Whitespace-only text yields nothing.
pub fn chunk_text(text: &str, window: ChunkWindow) -> Chunks<'_> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let done = tokens.is_empty();
    Chunks {
        tokens,
        window,
        start: 0,
        done,
    }
}

impl Chunks<'_> {
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn remaining(&self) -> usize {
        if self.done {
            return 0;
        }
        let left = self.tokens.len() - self.start;
        if left <= self.window.max_tokens {
            1
        } else {
            (left - self.window.overlap).div_ceil(self.window.stride())
        }
    }
}

impl Iterator for Chunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }

        let end = (self.start + self.window.max_tokens).min(self.tokens.len());
        let chunk = self.tokens[self.start..end].join(" ");

        if end == self.tokens.len() {
            self.done = true;
        } else {
            self.start += self.window.stride();
        }

        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

impl FusedIterator for Chunks<'_> {}
