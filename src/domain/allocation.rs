// ============================================================
// Layer 3 — Model Kinds and Dimension Allocation
// ============================================================
// The composer is configured with a mapping from model name to
// output width, e.g. { "cnn": 50, "sae": 64 }.
//
// Four model names are valid:
//
//   name     modality    encoder
//   ──────   ─────────   ──────────────────────────────
//   lookup   word        plain embedding table
//   cnn      character   convolution + max-pool + projection
//   rnn      character   bidirectional stacked GRU/LSTM
//   sae      word        self-attentive (transformer) encoder
//
// At most one model per modality may be active. The composer's
// output width is the sum of the allocated widths, with the
// character slice first and the word slice second.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::EmbedError;

/// Which token stream a model consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    Character,
    Word,
}

/// The four recognised sub-encoder names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Lookup,
    Cnn,
    Rnn,
    Sae,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [Self::Lookup, Self::Cnn, Self::Rnn, Self::Sae];

    pub fn name(self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Cnn    => "cnn",
            Self::Rnn    => "rnn",
            Self::Sae    => "sae",
        }
    }

    pub fn modality(self) -> Modality {
        match self {
            Self::Cnn | Self::Rnn    => Modality::Character,
            Self::Lookup | Self::Sae => Modality::Word,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                EmbedError::configuration(format!(
                    "unknown model '{s}': expected one of lookup, cnn, rnn, sae"
                ))
            })
    }
}

/// One active sub-encoder and the width of its output slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub kind: ModelKind,
    pub dim:  usize,
}

/// A validated model → width mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionAllocation {
    character: Option<Slot>,
    word:      Option<Slot>,
}

impl DimensionAllocation {
    /// Validate a raw name → width mapping.
    ///
    /// Fails with a configuration error for unknown names, zero widths,
    /// an empty mapping, or two models competing for one modality.
    pub fn from_map(map: &BTreeMap<String, usize>) -> Result<Self, EmbedError> {
        if map.is_empty() {
            return Err(EmbedError::configuration(
                "dimension allocation is empty: at least one model must be configured",
            ));
        }

        let mut character: Option<Slot> = None;
        let mut word:      Option<Slot> = None;

        for (name, &dim) in map {
            let kind: ModelKind = name.parse()?;
            if dim == 0 {
                return Err(EmbedError::configuration(format!(
                    "model '{kind}' is allocated zero dimensions"
                )));
            }

            let target = match kind.modality() {
                Modality::Character => &mut character,
                Modality::Word      => &mut word,
            };
            if let Some(existing) = target {
                return Err(EmbedError::configuration(format!(
                    "models '{}' and '{}' both encode {:?} tokens; only one is allowed",
                    existing.kind, kind, kind.modality()
                )));
            }
            *target = Some(Slot { kind, dim });
        }

        Ok(Self { character, word })
    }

    pub fn character(&self) -> Option<Slot> {
        self.character
    }

    pub fn word(&self) -> Option<Slot> {
        self.word
    }

    /// Sum of all allocated widths: the composer's output feature size.
    pub fn total_dim(&self) -> usize {
        self.slots().map(|s| s.dim).sum()
    }

    /// Active slots in concatenation order (character first).
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.character.into_iter().chain(self.word)
    }
}
