//! Controlling-terminal handoff for foreground jobs.

use std::io;

use nix::unistd::{getpgrp, tcsetpgrp, Pid};
use tracing::{debug, warn};

/// Moves the terminal between the shell and foreground jobs. Inert when job
/// control is off.
pub struct Terminal {
    shell_pgid: Option<Pid>,
}

impl Terminal {
    pub fn new(job_control: bool) -> Self {
        if !job_control {
            return Self::disabled();
        }

        // Reclaiming the terminal from a background group raises SIGTTOU.
        unsafe {
            libc::signal(libc::SIGTTOU, libc::SIG_IGN);
        }
        Terminal {
            shell_pgid: Some(getpgrp()),
        }
    }

    pub fn disabled() -> Self {
        Terminal { shell_pgid: None }
    }

    pub fn give_to(&self, pgid: Pid) {
        if self.shell_pgid.is_some() {
            debug!(%pgid, "handing terminal to job");
            if let Err(e) = tcsetpgrp(io::stdin(), pgid) {
                warn!(%pgid, error = %e, "failed to give terminal");
            }
        }
    }

    pub fn reclaim(&self) {
        if let Some(pgid) = self.shell_pgid {
            if let Err(e) = tcsetpgrp(io::stdin(), pgid) {
                warn!(error = %e, "failed to reclaim terminal");
            }
        }
    }
}
