// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `init-config`, `encode` and
// `inspect`, and all their configurable flags.
//
// clap's derive macros generate help text, error messages
// for missing args and type conversion.

use std::collections::BTreeMap;

use clap::{Args, Subcommand};

use crate::application::{
    encode_use_case::EncodeRequest,
    init_config_use_case::InitConfigRequest,
};
use crate::ml::recurrent::RecurrentCellKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an embedder configuration from a dimension allocation
    InitConfig(InitConfigArgs),

    /// Encode a padded index batch (JSON) into feature vectors
    Encode(EncodeArgs),

    /// Show the sub-encoders, output width and parameter count of a config
    Inspect(InspectArgs),
}

/// Arguments for `init-config`.
/// At most one of --cnn/--rnn and one of --lookup/--sae may be given.
#[derive(Args, Debug)]
pub struct InitConfigArgs {
    /// Where to write the config
    #[arg(long, default_value = "embedder.json")]
    pub output: String,

    /// Width of the word lookup table
    #[arg(long)]
    pub lookup: Option<usize>,

    /// Width of the character CNN
    #[arg(long)]
    pub cnn: Option<usize>,

    /// Width of the character RNN
    #[arg(long)]
    pub rnn: Option<usize>,

    /// Width of the self-attentive word encoder
    #[arg(long)]
    pub sae: Option<usize>,

    /// Character vocabulary size, padding index included
    #[arg(long, default_value_t = 128)]
    pub char_vocab: usize,

    /// Word vocabulary size, padding index included
    #[arg(long, default_value_t = 30000)]
    pub word_vocab: usize,

    /// Aggregate each sentence into one vector with a sentence-level RNN
    #[arg(long)]
    pub hierarchical: bool,

    /// Put the batch axis first in hierarchical output
    #[arg(long)]
    pub batch_first: bool,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Use LSTM cells instead of GRU in recurrent encoders
    #[arg(long)]
    pub lstm: bool,

    /// Attention heads of the self-attentive encoder; must divide --sae
    #[arg(long, default_value_t = 8)]
    pub sae_heads: usize,
}

impl From<InitConfigArgs> for InitConfigRequest {
    fn from(a: InitConfigArgs) -> Self {
        let allocation: BTreeMap<String, usize> = [
            ("lookup", a.lookup),
            ("cnn",    a.cnn),
            ("rnn",    a.rnn),
            ("sae",    a.sae),
        ]
        .into_iter()
        .filter_map(|(name, dim)| dim.map(|d| (name.to_string(), d)))
        .collect();

        InitConfigRequest {
            output_path:     a.output,
            allocation,
            char_vocab_size: a.char_vocab,
            word_vocab_size: a.word_vocab,
            hierarchical:    a.hierarchical,
            batch_first:     a.batch_first,
            dropout:         a.dropout,
            rnn_cell:        if a.lstm { RecurrentCellKind::Lstm } else { RecurrentCellKind::Gru },
            sae_heads:       a.sae_heads,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Embedder config written by `init-config`
    #[arg(long, default_value = "embedder.json")]
    pub config: String,

    /// JSON file with batch_size, chars and words
    #[arg(long)]
    pub batch: String,

    /// Write { shape, values } JSON here instead of printing a summary only
    #[arg(long)]
    pub output: Option<String>,
}

impl From<EncodeArgs> for EncodeRequest {
    fn from(a: EncodeArgs) -> Self {
        EncodeRequest {
            config_path: a.config,
            batch_path:  a.batch,
            output_path: a.output,
        }
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(long, default_value = "embedder.json")]
    pub config: String,
}
