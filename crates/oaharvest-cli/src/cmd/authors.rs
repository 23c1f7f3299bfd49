//! Authors subcommand - match local author/institution pairs to OpenAlex authors

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use oaharvest_core::{SharedProgress, StopFlag};
use oaharvest_openalex::{TableResolver, load_author_candidates, run_authors};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct AuthorsArgs {
    /// Candidate list, one `author<TAB>institution` per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// Institution name table, one `local<TAB>english` per line
    #[arg(long)]
    pub institutions: PathBuf,

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

pub fn run(args: AuthorsArgs, config: &Config, progress: &SharedProgress, stop: &StopFlag) -> Result<()> {
    let resolver = TableResolver::from_file(&args.institutions)
        .with_context(|| format!("Failed to read {}", args.institutions.display()))?;
    let candidates = load_author_candidates(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let oa_config = super::run_config(config, args.output, args.workers, args.limit, stop);
    log::info!("Matching authors from {}", args.input.display());
    log::info!("  Institutions: {} names", resolver.len());
    log::info!("  Output: {}", oa_config.output_dir.display());

    let client = oa_config.client();
    let summary = run_authors(&oa_config, candidates, &resolver, &client, progress)?;
    super::report("Authors", &summary)
}
