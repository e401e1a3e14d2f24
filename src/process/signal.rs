use crate::process::ProcessError;

use libc::{c_int, killpg, pid_t, ESRCH, SIGHUP, SIGTERM};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Raises `flag` on every Ctrl-C instead of terminating the shell.
pub fn install_interrupt_handler(flag: Arc<AtomicBool>) -> Result<(), ProcessError> {
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| ProcessError::SignalError(e.to_string()))
}

/// Raises `quit` (and `interrupt`, so a running pipeline is torn down) on
/// SIGTERM or SIGHUP. A second SIGTERM while `quit` is already raised exits
/// the process immediately.
pub fn register_quit_signals(
    quit: Arc<AtomicBool>,
    interrupt: Arc<AtomicBool>,
) -> Result<(), ProcessError> {
    let register_err = |e: io::Error| ProcessError::SignalError(e.to_string());

    signal_hook::flag::register_conditional_shutdown(SIGTERM, 1, Arc::clone(&quit))
        .map_err(register_err)?;
    for signal in [SIGTERM, SIGHUP] {
        signal_hook::flag::register(signal, Arc::clone(&quit)).map_err(register_err)?;
        signal_hook::flag::register(signal, Arc::clone(&interrupt)).map_err(register_err)?;
    }
    Ok(())
}

/// Sends `signal` to every process in group `pgid`. A group whose members
/// have all exited is not an error.
pub fn signal_group(pgid: u32, signal: c_int) -> io::Result<()> {
    debug!(pgid, signal, "signalling process group");
    let result = unsafe { killpg(pgid as pid_t, signal) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}
