// ============================================================
// Layer 3 — IndexBatch Domain Type
// ============================================================
// A padded batch of token indices, exactly as the upstream
// tokenizer hands it over. Axis naming:
//
//   Ls — word positions within a sentence
//   G  — groups: batch × hierarchical depth (sentences per doc)
//   Lw — character positions within a word
//
//   chars: [Ls][G][Lw]
//   words: [Ls][G]
//
// Index 0 is the padding index. The batch must already be
// rectangular; this type only checks, it never pads.

use serde::{Deserialize, Serialize};

use crate::domain::error::EmbedError;

/// Reserved vocabulary index for "no token".
pub const PAD_IDX: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBatch {
    /// Number of documents b; G must be a multiple of it
    pub batch_size: usize,

    /// Character indices, [Ls][G][Lw]
    #[serde(default)]
    pub chars: Vec<Vec<Vec<u32>>>,

    /// Word indices, [Ls][G]
    #[serde(default)]
    pub words: Vec<Vec<u32>>,
}

impl IndexBatch {
    pub fn new(batch_size: usize, chars: Vec<Vec<Vec<u32>>>, words: Vec<Vec<u32>>) -> Self {
        Self { batch_size, chars, words }
    }

    /// Check the batch is rectangular and the two streams agree on (Ls, G).
    /// Returns the dims `([Ls, G, Lw], [Ls, G])`; an empty stream is
    /// reported with the other stream's (Ls, G) and `Lw = 0`.
    pub fn validate(&self) -> Result<([usize; 3], [usize; 2]), EmbedError> {
        if self.batch_size == 0 {
            return Err(EmbedError::shape("batch size must be positive"));
        }

        let mut words_dims = rect2(&self.words, "words")?;
        let mut chars_dims = match self.chars.first() {
            Some(first) => {
                let g = first.len();
                let lw = first.first().map_or(0, Vec::len);
                for (i, row) in self.chars.iter().enumerate() {
                    if row.len() != g {
                        return Err(EmbedError::shape(format!(
                            "chars[{i}] has {} groups, expected {g}", row.len()
                        )));
                    }
                    for (j, word) in row.iter().enumerate() {
                        if word.len() != lw {
                            return Err(EmbedError::shape(format!(
                                "chars[{i}][{j}] has {} characters, expected {lw}", word.len()
                            )));
                        }
                    }
                }
                [self.chars.len(), g, lw]
            }
            None => [0, 0, 0],
        };
        if !self.chars.is_empty() && chars_dims[2] == 0 {
            return Err(EmbedError::shape(format!(
                "chars are [{}, {}, 0]: words need at least one character position",
                chars_dims[0], chars_dims[1]
            )));
        }

        // An omitted stream takes the (Ls, G) of the other one
        match (self.chars.is_empty(), self.words.is_empty()) {
            (true, true) => return Err(EmbedError::shape("batch has neither chars nor words")),
            (true, false) => chars_dims = [words_dims[0], words_dims[1], 0],
            (false, true) => words_dims = [chars_dims[0], chars_dims[1]],
            (false, false) => {}
        }

        if chars_dims[..2] != words_dims[..] {
            return Err(EmbedError::shape(format!(
                "chars are [{}, {}, _] but words are [{}, {}]",
                chars_dims[0], chars_dims[1], words_dims[0], words_dims[1]
            )));
        }

        Ok((chars_dims, words_dims))
    }
}

fn rect2(rows: &[Vec<u32>], name: &str) -> Result<[usize; 2], EmbedError> {
    let cols = rows.first().map_or(0, Vec::len);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != cols {
            return Err(EmbedError::shape(format!(
                "{name}[{i}] has {} entries, expected {cols}", row.len()
            )));
        }
    }
    Ok([rows.len(), cols])
}
