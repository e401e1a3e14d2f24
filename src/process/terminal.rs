//! Controlling-terminal handoff for pipelines started from the prompt.

use std::{io, mem, ptr};

use libc::{pid_t, SIGCONT, SIGTTOU, SIG_BLOCK, SIG_SETMASK, STDIN_FILENO};
use tracing::{debug, warn};

use super::signal;

/// Holds the terminal for a pipeline's process group and gives it back to
/// the shell on drop.
pub struct ForegroundGuard {
    shell_pgid: pid_t,
}

impl ForegroundGuard {
    /// Makes `pgid` the terminal's foreground group. Returns `None` when
    /// stdin is not a terminal or the shell does not own it.
    pub fn acquire(pgid: u32) -> Option<Self> {
        let shell_pgid = unsafe {
            if libc::isatty(STDIN_FILENO) != 1 {
                return None;
            }
            let shell_pgid = libc::getpgrp();
            if libc::tcgetpgrp(STDIN_FILENO) != shell_pgid {
                return None;
            }
            if libc::tcsetpgrp(STDIN_FILENO, pgid as pid_t) == -1 {
                warn!(pgid, error = %io::Error::last_os_error(), "could not hand over the terminal");
                return None;
            }
            shell_pgid
        };
        debug!(pgid, "pipeline owns the terminal");

        // A stage that read from the terminal before the handoff was stopped.
        if let Err(err) = signal::signal_group(pgid, SIGCONT) {
            warn!(pgid, error = %err, "failed to resume pipeline");
        }
        Some(Self { shell_pgid })
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        // The shell is a background group now, so SIGTTOU stays blocked
        // while it takes the terminal back.
        unsafe {
            let mut block: libc::sigset_t = mem::zeroed();
            let mut previous: libc::sigset_t = mem::zeroed();
            libc::sigemptyset(&mut block);
            libc::sigaddset(&mut block, SIGTTOU);
            libc::pthread_sigmask(SIG_BLOCK, &block, &mut previous);
            if libc::tcsetpgrp(STDIN_FILENO, self.shell_pgid) == -1 {
                warn!(error = %io::Error::last_os_error(), "could not reclaim the terminal");
            }
            libc::pthread_sigmask(SIG_SETMASK, &previous, ptr::null_mut());
        }
    }
}
