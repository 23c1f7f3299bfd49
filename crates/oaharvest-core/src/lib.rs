//! oaharvest core - fetch/match/persist pipeline plumbing
//!
//! Domain-neutral building blocks: a lock-free task queue, shared run
//! state, a single-writer result sink, resume keys, progress monitoring
//! and a blocking HTTP helper.

pub mod error;
pub mod http;
pub mod logging;
pub mod progress;
pub mod resume;
pub mod shutdown;
pub mod sink;
pub mod state;
pub mod work_queue;

// Re-exports for convenience
pub use error::FetchError;
pub use http::{DEFAULT_TIMEOUT, SHARED_RUNTIME, get_json, http_client};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, ProgressMonitor, SharedProgress, fmt_num};
pub use resume::{RecoveryCache, ensure_table, read_key_pairs};
pub use shutdown::{StopFlag, install_signal_handlers, stop_flag};
pub use sink::{ErrorFlag, Matched, ResultSink, ResultWriter};
pub use state::RunState;
pub use work_queue::TaskQueue;
