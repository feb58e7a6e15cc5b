//! The `infill` command: run the generation driver over a corpus.

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use cadenza_core::{
    GenerationDriver, PieceOutcome, RunConfig, RunMode, RunReport, WindowSpec,
};
use cadenza_midi::{MidiDataset, MidiRenderer};
use cadenza_model::{EmbeddingCodec, LatentSampler, ModelConfig};

/// Everything `infill` needs, resolved from CLI arguments.
pub(crate) struct InfillOptions {
    pub dataset_dir: String,
    pub codec_params: String,
    pub sampler_params: String,
    pub out_dir: String,
    pub piece: Option<String>,
    pub all: bool,
    pub samples: usize,
    pub seed: u64,
    pub json: bool,
    pub window: WindowSpec,
    pub subdivision: u16,
    pub model: ModelConfig,
}

pub(crate) fn run(options: InfillOptions) -> Result<()> {
    let mode = match (&options.piece, options.all) {
        (Some(id), _) => RunMode::SinglePiece { id: id.clone() },
        (None, true) => RunMode::AllQualifying,
        (None, false) => bail!("pass --piece <id> or --all to select pieces"),
    };

    // Models must load before any piece is touched; a missing parameter
    // file fails the run here.
    let codec = EmbeddingCodec::load(Path::new(&options.codec_params), &options.model)
        .context("loading codec parameters")?;
    let sampler = LatentSampler::load(
        Path::new(&options.sampler_params),
        options.window,
        codec,
    )
    .context("loading sampler parameters")?;

    let dataset = MidiDataset::new(&options.dataset_dir, options.subdivision);
    let renderer = MidiRenderer::new(&options.out_dir, options.subdivision);

    let config = RunConfig {
        mode,
        samples_per_piece: options.samples,
        window: options.window,
        base_seed: options.seed,
        ..RunConfig::default()
    };

    let driver = GenerationDriver::new(&sampler, &dataset, &renderer, config)
        .context("window geometry disagrees with the generator")?;
    let report = driver.run().context("generation run failed")?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    for (id, outcome) in &report.outcomes {
        match outcome {
            PieceOutcome::Generated {
                rendered,
                failed_samples,
            } => {
                println!(
                    "{} {} ({} file(s) written)",
                    "ok".green().bold(),
                    id,
                    rendered.len()
                );
                for failure in failed_samples {
                    println!("   {} {}", "failed".red(), failure);
                }
            }
            PieceOutcome::SkippedFiltered => {
                println!("{} {} (does not match --piece)", "skip".yellow(), id);
            }
            PieceOutcome::SkippedTooShort { have, need } => {
                println!(
                    "{} {} (only {} of {} required ticks)",
                    "skip".yellow(),
                    id,
                    have,
                    need
                );
            }
            PieceOutcome::SkippedUnreadable { reason } => {
                println!("{} {} ({})", "skip".yellow(), id, reason);
            }
        }
    }

    println!(
        "\n{} piece(s) qualified, {} file(s) written",
        report.qualifying_count(),
        report.rendered_count()
    );
}
