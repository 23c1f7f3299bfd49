//! oaharvest - match local author lists against OpenAlex
//!
//! `authors` finds OpenAlex author records for local author/institution
//! pairs; `papers` lists the works of the authors found. Both append to
//! CSV tables plus raw JSON backups and resume where the last run stopped.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "oaharvest")]
#[command(about = "Match local author lists against OpenAlex")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./oaharvest.toml or ~/.config/oaharvest/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Find OpenAlex authors for author/institution pairs
    Authors(cmd::authors::AuthorsArgs),
    /// List works of previously matched authors
    Papers(cmd::papers::PapersArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(oaharvest_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug (progress bars show activity)
    //   non-TTY: info unless --debug (logs are the only progress indicator)
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    if let Err(e) = oaharvest_core::init_logging(quiet, cli.debug, multi) {
        eprintln!("warning: logger already initialized: {e}");
    }

    let mut config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };
    if let Some(secs) = cli.timeout {
        config.http.timeout_secs = secs;
    }

    // First SIGINT/SIGTERM: finish current tasks. Second: exit immediately.
    let stop = oaharvest_core::install_signal_handlers()?;

    match cli.command {
        Command::Authors(args) => cmd::authors::run(args, &config, &progress, &stop),
        Command::Papers(args) => cmd::papers::run(args, &config, &progress, &stop),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Output directory",
                &config.output.default_dir.display().to_string(),
            ]);
            table.add_row(vec![
                "Workers",
                &format!("{} (max: {})", config.workers.default, config.workers.max),
            ]);
            table.add_row(vec!["OpenAlex base URL", &config.openalex.base_url]);
            table.add_row(vec![
                "OpenAlex mailto",
                config.openalex.mailto.as_deref().unwrap_or("not set"),
            ]);
            table.add_row(vec![
                "Request timeout",
                &format!("{}s", config.http.timeout_secs),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
