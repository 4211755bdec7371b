use std::ops::Range;

use crate::error::{Result, SeqfeatError};
use crate::sentence::Sentence;
use crate::BOUNDARY;

/// Default number of empty pairs padded before a sentence.
pub const DEFAULT_FILLER_LENGTH: usize = 10;

/// Largest distance a feature template looks away from the current position.
pub const MAX_OFFSET: usize = 3;

/// A sentence with its trailing boundary pair, surrounded by empty pairs so
/// that every template offset stays inside the buffer.
///
/// `filler` empty pairs are prepended and `2 * filler` appended.
#[derive(Debug, Clone)]
pub struct PaddedSequence {
    labels: Vec<String>,
    tokens: Vec<String>,
    filler: usize,
    len: usize,
}

impl PaddedSequence {
    /// Pads `sentence` with `filler` empty pairs.
    ///
    /// # Errors
    /// Returns [`SeqfeatError::InvalidConfig`] if `filler` is smaller than
    /// [`MAX_OFFSET`].
    pub fn new(sentence: &Sentence, filler: usize) -> Result<Self> {
        if filler < MAX_OFFSET {
            return Err(SeqfeatError::invalid_config(format!(
                "filler length must be at least {}, got {}",
                MAX_OFFSET, filler
            )));
        }
        let len = sentence.len() + 1;
        let capacity = filler + len + 2 * filler;
        let mut labels = Vec::with_capacity(capacity);
        let mut tokens = Vec::with_capacity(capacity);

        labels.resize(filler, String::new());
        tokens.resize(filler, String::new());
        for (label, token) in sentence.pairs() {
            labels.push(label.clone());
            tokens.push(token.clone());
        }
        labels.push(BOUNDARY.to_string());
        tokens.push(BOUNDARY.to_string());
        labels.resize(capacity, String::new());
        tokens.resize(capacity, String::new());

        Ok(PaddedSequence {
            labels,
            tokens,
            filler,
            len,
        })
    }

    /// Number of real positions, including the trailing boundary.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn filler(&self) -> usize {
        self.filler
    }

    /// Padded indices of the real positions, in traversal order.
    pub fn positions(&self) -> Range<usize> {
        self.filler..self.filler + self.len
    }

    /// Returns the view centered on padded index `i`.
    ///
    /// # Panics
    /// Panics if `i` is not one of [`positions`](Self::positions).
    pub fn window(&self, i: usize) -> Window<'_> {
        assert!(
            self.positions().contains(&i),
            "position {} is outside {:?}",
            i,
            self.positions()
        );
        Window { seq: self, center: i }
    }
}

/// Fixed lookback/lookahead accessor over a [`PaddedSequence`].
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    seq: &'a PaddedSequence,
    center: usize,
}

impl<'a> Window<'a> {
    /// Index of the current position among the real positions.
    pub fn position(&self) -> usize {
        self.center - self.seq.filler
    }

    pub fn label(&self) -> &'a str {
        &self.seq.labels[self.center]
    }

    /// Token at `offset` from the current position.
    ///
    /// Offsets within `-MAX_OFFSET..=MAX_OFFSET` always resolve, to an empty
    /// string outside the sentence.
    pub fn token(&self, offset: isize) -> &'a str {
        debug_assert!(offset.unsigned_abs() <= MAX_OFFSET);
        let i = self.center as isize + offset;
        &self.seq.tokens[i as usize]
    }

    pub fn is_boundary(&self) -> bool {
        self.label() == BOUNDARY
    }
}
