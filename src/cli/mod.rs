// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
// Commands:
//   1. `init-config` — write an embedder config from widths
//   2. `encode`      — encode a JSON index batch
//   3. `inspect`     — describe the embedder a config builds

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EncodeArgs, InitConfigArgs, InspectArgs};

#[derive(Parser, Debug)]
#[command(
    name = "seq-embed",
    version,
    about = "Encode padded character/word index batches into sequence features."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::InitConfig(args) => run_init_config(args),
            Commands::Encode(args)     => run_encode(args),
            Commands::Inspect(args)    => run_inspect(args),
        }
    }
}

fn run_init_config(args: InitConfigArgs) -> Result<()> {
    use crate::application::init_config_use_case::InitConfigUseCase;

    let output = args.output.clone();
    let (config, dim) = InitConfigUseCase::new(args.into()).execute()?;

    println!("Wrote '{output}'");
    println!("  models:       {:?}", config.allocation);
    println!("  output width: {dim}");
    println!("  hierarchical: {}", config.hierarchical);
    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    use crate::application::encode_use_case::EncodeUseCase;

    let output   = args.output.clone();
    let features = EncodeUseCase::new(args.into()).execute()?;

    println!("Encoded features: shape {:?}", features.shape);
    match output {
        Some(path) => println!("Written to '{path}'"),
        None => {
            let preview: Vec<String> = features.values.iter().take(8).map(|v| format!("{v:.4}")).collect();
            println!("First values: [{}]", preview.join(", "));
        }
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let report = InspectUseCase::new(args.config).execute()?;
    let models: Vec<String> = report.active_models.iter().map(ToString::to_string).collect();

    println!("Active models: {}", models.join(" + "));
    println!("Output width:  {}", report.dim);
    println!("Hierarchical:  {}", report.hierarchical);
    if report.hierarchical {
        println!("Batch first:   {}", report.batch_first);
    }
    println!("Parameters:    {}", report.num_params);
    Ok(())
}
