// ============================================================
// Layer 5 — Recurrent Encoder
// ============================================================
// Runs a stacked (optionally bidirectional) GRU or LSTM over a
// sequence and keeps the final hidden state of the last layer.
//
// Two modes:
//
//   non-hierarchical — token indices in, one vector per word
//     [Ls, G, Lw] → flatten → [Ls·G, Lw] → embed → [N, Lw, H]
//     → RNN over Lw → [N, H] → [Ls, G, H]
//
//   hierarchical — embedded vectors in, one vector per group
//     [Ls, G, Din] → [G, Ls, Din] → RNN over Ls → [G, H]
//
// Hidden size per direction is H / directions, so concatenating
// the forward and backward final states gives exactly H.
// Every call starts from a zero state (zero cell state as well
// for LSTM); nothing is carried between calls.

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        lstm::{Lstm, LstmConfig, LstmState},
        Dropout, DropoutConfig,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::EmbedError;
use crate::ml::lookup::{LookupEncoder, LookupEncoderConfig};

/// Which recurrent cell the encoder stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrentCellKind {
    Gru,
    Lstm,
}

#[derive(Config, Debug)]
pub struct RecurrentEncoderConfig {
    /// Vocabulary size, or the input vector width in hierarchical mode
    pub input_size: usize,
    /// Output width H
    pub embed_dim: usize,
    /// Consume embedded vectors instead of indices
    #[config(default = false)]
    pub hierarchical: bool,
    #[config(default = "RecurrentCellKind::Gru")]
    pub cell: RecurrentCellKind,
    #[config(default = 2)]
    pub num_layers: usize,
    #[config(default = true)]
    pub bidirectional: bool,
    /// Applied between stacked layers, never after the last one
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl RecurrentEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<RecurrentEncoder<B>, EmbedError> {
        if self.embed_dim == 0 || self.input_size == 0 {
            return Err(EmbedError::configuration(
                "recurrent encoder needs positive input size and embedding dimension",
            ));
        }
        if self.num_layers == 0 {
            return Err(EmbedError::configuration("recurrent encoder needs at least one layer"));
        }
        let dirs = if self.bidirectional { 2 } else { 1 };
        if self.embed_dim % dirs != 0 {
            return Err(EmbedError::configuration(format!(
                "embedding dimension {} cannot be split over {dirs} directions",
                self.embed_dim
            )));
        }
        let hidden = self.embed_dim / dirs;

        let embedding = if self.hierarchical {
            None
        } else {
            Some(LookupEncoderConfig::new(self.input_size, self.embed_dim).init(device)?)
        };
        let first_input = if self.hierarchical { self.input_size } else { self.embed_dim };

        let layers = (0..self.num_layers)
            .map(|i| {
                let d_input = if i == 0 { first_input } else { hidden * dirs };
                RecurrentLayer {
                    forward_cell:  RecurrentCell::new(self.cell, d_input, hidden, device),
                    backward_cell: self
                        .bidirectional
                        .then(|| RecurrentCell::new(self.cell, d_input, hidden, device)),
                    hidden,
                }
            })
            .collect();

        tracing::debug!(
            "Recurrent encoder: {:?} x{} layers, {} direction(s), hidden {}, hierarchical={}",
            self.cell, self.num_layers, dirs, hidden, self.hierarchical
        );

        Ok(RecurrentEncoder {
            embedding,
            layers,
            dropout:    DropoutConfig::new(self.dropout).init(),
            input_size: self.input_size,
            embed_dim:  self.embed_dim,
        })
    }
}

// ─── Cells ────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub enum RecurrentCell<B: Backend> {
    Gru(Gru<B>),
    Lstm(Lstm<B>),
}

impl<B: Backend> RecurrentCell<B> {
    fn new(kind: RecurrentCellKind, d_input: usize, d_hidden: usize, device: &B::Device) -> Self {
        match kind {
            RecurrentCellKind::Gru  => Self::Gru(GruConfig::new(d_input, d_hidden, true).init(device)),
            RecurrentCellKind::Lstm => Self::Lstm(LstmConfig::new(d_input, d_hidden, true).init(device)),
        }
    }

    /// [N, T, d_input] → [N, T, d_hidden], starting from a zero state.
    pub fn forward(&self, x: Tensor<B, 3>, d_hidden: usize) -> Tensor<B, 3> {
        let [n, _, _] = x.dims();
        let zeros = Tensor::<B, 2>::zeros([n, d_hidden], &x.device());
        match self {
            Self::Gru(gru) => gru.forward(x, Some(zeros)),
            Self::Lstm(lstm) => {
                let (outputs, _state) = lstm.forward(x, Some(LstmState::new(zeros.clone(), zeros)));
                outputs
            }
        }
    }
}

#[derive(Module, Debug)]
pub struct RecurrentLayer<B: Backend> {
    pub forward_cell:  RecurrentCell<B>,
    pub backward_cell: Option<RecurrentCell<B>>,
    pub hidden:        usize,
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct RecurrentEncoder<B: Backend> {
    /// Absent in hierarchical mode
    pub embedding:  Option<LookupEncoder<B>>,
    pub layers:     Vec<RecurrentLayer<B>>,
    pub dropout:    Dropout,
    pub input_size: usize,
    pub embed_dim:  usize,
}

impl<B: Backend> RecurrentEncoder<B> {
    pub fn is_hierarchical(&self) -> bool {
        self.embedding.is_none()
    }

    /// Non-hierarchical mode. indices: [Ls, G, Lw] → [Ls, G, H]
    pub fn forward_indices(&self, indices: Tensor<B, 3, Int>) -> Result<Tensor<B, 3>, EmbedError> {
        let Some(embedding) = &self.embedding else {
            return Err(EmbedError::configuration(
                "hierarchical recurrent encoder consumes embedded vectors, not indices",
            ));
        };

        let [ls, g, lw] = indices.dims();
        let x: Tensor<B, 3> = embedding.forward(indices.reshape([ls * g, lw]))?; // [N, Lw, H]
        let h = self.final_state(x);                                            // [N, H]

        Ok(h.reshape([ls, g, self.embed_dim]))
    }

    /// Hierarchical mode. x: [Ls, G, Din] → [G, H]
    pub fn forward_embedded(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 2>, EmbedError> {
        if !self.is_hierarchical() {
            return Err(EmbedError::configuration(
                "non-hierarchical recurrent encoder consumes indices, not vectors",
            ));
        }

        let [ls, g, d] = x.dims();
        if d != self.input_size {
            return Err(EmbedError::shape(format!(
                "sentence aggregator expects width {}, got {d}", self.input_size
            )));
        }
        if ls == 0 || g == 0 {
            return Err(EmbedError::shape(format!("empty input [{ls}, {g}, {d}]")));
        }

        // The sentence-position axis becomes the time axis
        Ok(self.final_state(x.swap_dims(0, 1)))
    }

    /// Run the stack over [N, T, Din] and concatenate the last layer's
    /// final forward and backward states → [N, H].
    fn final_state(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let mut input  = x;
        let mut finals = Vec::new();

        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                input = self.dropout.forward(input);
            }

            let fwd       = layer.forward_cell.forward(input.clone(), layer.hidden);
            let fwd_final = time_step(fwd.clone(), Step::Last);

            match &layer.backward_cell {
                Some(cell) => {
                    // Run on the reversed sequence, then flip back so both
                    // directions line up on the same time axis
                    let bwd = reverse_time(cell.forward(reverse_time(input), layer.hidden));
                    let bwd_final = time_step(bwd.clone(), Step::First);
                    input  = Tensor::cat(vec![fwd, bwd], 2);
                    finals = vec![fwd_final, bwd_final];
                }
                None => {
                    input  = fwd;
                    finals = vec![fwd_final];
                }
            }
        }

        Tensor::cat(finals, 1)
    }
}

enum Step {
    First,
    Last,
}

/// [N, T, H] → [N, H] at the first or last time step
fn time_step<B: Backend>(x: Tensor<B, 3>, step: Step) -> Tensor<B, 2> {
    let [n, t, h] = x.dims();
    let at = match step {
        Step::First => 0,
        Step::Last  => t - 1,
    };
    x.slice([0..n, at..at + 1, 0..h]).reshape([n, h])
}

fn reverse_time<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 3> {
    let [_, t, _] = x.dims();
    let order: Vec<i32> = (0..t as i32).rev().collect();
    let order = Tensor::<B, 1, Int>::from_ints(order.as_slice(), &x.device());
    x.select(1, order)
}
