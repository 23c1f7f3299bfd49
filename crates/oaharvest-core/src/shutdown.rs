//! Graceful shutdown via a shared stop flag

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Stop flag shared between signal handlers and workers
pub type StopFlag = Arc<AtomicBool>;

/// Fresh, unset stop flag
pub fn stop_flag() -> StopFlag {
    Arc::new(AtomicBool::new(false))
}

/// Install SIGINT/SIGTERM handlers that set the returned flag.
///
/// First signal: flag is set, workers finish their current task and stop.
/// Second signal: exit immediately with status 130.
pub fn install_signal_handlers() -> std::io::Result<StopFlag> {
    let flag = stop_flag();
    for sig in [SIGINT, SIGTERM] {
        // Registered first so it only fires once the flag is already set
        signal_hook::flag::register_conditional_shutdown(sig, 130, Arc::clone(&flag))?;
        signal_hook::flag::register(sig, Arc::clone(&flag))?;
    }
    Ok(flag)
}

/// Check if shutdown was requested
pub fn is_stop_requested(flag: &StopFlag) -> bool {
    flag.load(Ordering::Relaxed)
}
