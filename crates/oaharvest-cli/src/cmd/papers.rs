//! Papers subcommand - list works for authors found by an authors run

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rustc_hash::FxHashSet;

use oaharvest_core::{SharedProgress, StopFlag};
use oaharvest_openalex::{load_author_candidates, load_paper_candidates, run_papers};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct PapersArgs {
    /// Author table written by `oaharvest authors` (default: <output>/author_db.csv)
    #[arg(long)]
    pub authors_table: Option<PathBuf>,

    /// Only authors listed here, one `author<TAB>institution` per line
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Maximum number of tasks to run
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,
}

pub fn run(args: PapersArgs, config: &Config, progress: &SharedProgress, stop: &StopFlag) -> Result<()> {
    let oa_config = super::run_config(config, args.output, args.workers, args.limit, stop);
    let authors_table = args
        .authors_table
        .unwrap_or_else(|| oa_config.output_dir.join("author_db.csv"));

    let only: Option<FxHashSet<(String, String)>> = match &args.input {
        Some(path) => Some(
            load_author_candidates(path)
                .with_context(|| format!("Failed to read {}", path.display()))?
                .into_iter()
                .collect(),
        ),
        None => None,
    };
    let candidates = load_paper_candidates(&authors_table, only.as_ref())
        .with_context(|| format!("Failed to read {}", authors_table.display()))?;

    log::info!("Listing works for authors in {}", authors_table.display());
    log::info!("  Output: {}", oa_config.output_dir.display());

    let client = oa_config.client();
    let summary = run_papers(&oa_config, candidates, &client, progress)?;
    super::report("Papers", &summary)
}
