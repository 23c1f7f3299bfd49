//! oaharvest OpenAlex - author and paper harvesting
//!
//! Resolves local author/institution names, queries the OpenAlex API from
//! a pool of workers, keeps the records that match and appends them to a
//! CSV table plus a raw JSON backup. Runs resume from what is already on
//! disk.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use oaharvest_core::ProgressContext;
//! use oaharvest_openalex::{Config, TableResolver, load_author_candidates, run_authors};
//!
//! let config = Config::default();
//! let resolver = TableResolver::from_file(Path::new("institutions.tsv")).unwrap();
//! let candidates = load_author_candidates(Path::new("authors.tsv")).unwrap();
//! let progress = Arc::new(ProgressContext::new());
//!
//! let summary = run_authors(&config, candidates, &resolver, &config.client(), &progress)
//!     .expect("author run failed");
//! println!("{} authors matched", summary.written);
//! ```

pub mod api;
pub mod config;
pub mod input;
pub mod names;
pub mod runner;
pub mod state;
pub mod transform;
pub mod worker;

// Re-exports for convenience
pub use api::{DEFAULT_BASE_URL, OpenAlexClient, RecordSource};
pub use config::Config;
pub use input::{load_author_candidates, load_paper_candidates};
pub use names::{NameResolver, TableResolver};
pub use runner::{RunSummary, run_authors, run_papers};
pub use state::{Mode, OutputPaths, Task};
