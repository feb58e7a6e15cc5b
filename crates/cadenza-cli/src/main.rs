//! Cadenza CLI - conditional infilling of symbolic melodies.
//!
//! This binary drives the full pipeline: corpus enumeration, measure
//! segmentation, context-conditioned generation, reassembly, and MIDI
//! rendering.

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

mod cli_args;
mod commands;

use cli_args::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Infill {
            dataset_dir,
            codec_params,
            sampler_params,
            out_dir,
            piece,
            all,
            samples,
            seed,
            json,
            window,
            model,
        } => {
            let subdivision = window.subdivision;
            commands::infill::run(commands::infill::InfillOptions {
                dataset_dir,
                codec_params,
                sampler_params,
                out_dir,
                piece,
                all,
                samples,
                seed,
                json,
                window: window.to_spec(),
                subdivision,
                model: model.to_config(),
            })
        }
        Commands::Pieces {
            dataset_dir,
            json,
            window,
        } => {
            let subdivision = window.subdivision;
            commands::pieces::run(&dataset_dir, window.to_spec(), subdivision, json)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {err:#}", "error".red());
            ExitCode::FAILURE
        }
    }
}
