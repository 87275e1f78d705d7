use std::path::PathBuf;

use alf_trials::data::export::{to_record_batch, write_parquet};
use alf_trials::data::listing::{flatten_references, list_experiments};
use alf_trials::data::model::ANALYSIS_COLUMNS;
use alf_trials::data::summary::{perf_per_contrast, CHOICE_LEFT, DEFAULT_CONTRASTS};
use alf_trials::data::trials::load_trial_table_with;
use alf_trials::{AlfConfig, ExperimentReference};
use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "alf-trials", about = "Inspect ALF session trees and trial tables")]
struct Cli {
    /// Root of the subject/date/sequence tree
    #[arg(long, global = true, env = "ALF_ROOT")]
    root: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a subject's experiments in chronological order
    List { subject: String },
    /// Print the trial table of one session
    Load {
        /// Experiment reference, e.g. 2018-09-30_2_Mouse
        reference: String,
        /// Also write the table to this Parquet file
        #[arg(long)]
        parquet: Option<PathBuf>,
    },
    /// Print the leftward-choice proportion per contrast for every session
    Perf { subject: String },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AlfConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => AlfConfig::from_env(),
    };
    if let Some(root) = cli.root {
        config = config.with_root(root);
    }

    match cli.command {
        Command::List { subject } => {
            let listings = list_experiments(&subject, &config.root)
                .with_context(|| format!("listing experiments for {subject}"))?;
            let mut refs = flatten_references(&listings);
            refs.sort();
            for r in refs {
                println!("{r}");
            }
        }
        Command::Load { reference, parquet } => {
            let reference: ExperimentReference = reference.parse()?;
            let Some(table) = load_trial_table_with(&reference, &config)
                .with_context(|| format!("loading {reference}"))?
            else {
                println!("{reference}: nothing to process");
                return Ok(());
            };
            if let Err(e) = table.require_columns(&ANALYSIS_COLUMNS) {
                log::warn!("{reference}: not usable for behaviour plots: {e}");
            }
            let batch = to_record_batch(&table)?;
            println!("{}", pretty_format_batches(&[batch])?);
            if let Some(out) = parquet {
                write_parquet(&table, &out)
                    .with_context(|| format!("writing {}", out.display()))?;
                println!("Wrote {} trials to {}", table.len(), out.display());
            }
        }
        Command::Perf { subject } => {
            let listings = list_experiments(&subject, &config.root)
                .with_context(|| format!("listing experiments for {subject}"))?;
            let mut refs = flatten_references(&listings);
            refs.sort();
            let header: Vec<String> = DEFAULT_CONTRASTS.iter().map(|c| format!("{c:>7}")).collect();
            println!("{:<28}{}", "session", header.join(""));
            for r in refs {
                let Some(table) = load_trial_table_with(&r, &config)? else {
                    continue;
                };
                let row: Vec<String> = perf_per_contrast(&table, &DEFAULT_CONTRASTS, CHOICE_LEFT)?
                    .into_iter()
                    .map(|p| match p {
                        Some(v) => format!("{v:>7.2}"),
                        None => format!("{:>7}", "-"),
                    })
                    .collect();
                println!("{:<28}{}", r.to_string(), row.join(""));
            }
        }
    }
    Ok(())
}
