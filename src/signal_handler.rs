//! Turns OS notifications into job table updates.
//!
//! SIGINT, SIGTSTP and SIGCHLD arrive through signal-hook's self-pipe and are
//! handled on a dedicated thread, so none of the work below runs inside an
//! actual signal handler.

use std::io;
use std::os::raw::c_int;
use std::sync::Arc;
use std::thread;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use signal_hook::consts::signal::{SIGCHLD, SIGINT, SIGTSTP};
use signal_hook::iterator::Signals;
use tracing::{debug, warn};

use crate::process::ProcessControl;
use crate::session::{ChildEvent, Session};

#[derive(Clone)]
pub struct SignalHandler {
    session: Arc<Session>,
    control: Arc<dyn ProcessControl>,
}

impl SignalHandler {
    pub fn new(session: Arc<Session>, control: Arc<dyn ProcessControl>) -> Self {
        SignalHandler { session, control }
    }

    /// Registers the signals and starts the thread that processes them.
    pub fn setup_handler(&self) -> io::Result<()> {
        let mut signals = Signals::new([SIGINT, SIGTSTP, SIGCHLD])?;
        let handler = self.clone();

        thread::Builder::new()
            .name("signal-bridge".into())
            .spawn(move || {
                for signal in signals.forever() {
                    handler.dispatch(signal);
                }
            })?;
        Ok(())
    }

    pub fn dispatch(&self, signal: c_int) {
        match signal {
            SIGINT => self.forward(Signal::SIGINT),
            SIGTSTP => self.forward(Signal::SIGTSTP),
            SIGCHLD => self.reap_children(),
            other => debug!(signal = other, "ignoring signal"),
        }
    }

    /// Sends `signal` to the foreground job's process group and releases the
    /// foreground. Without a foreground job nothing is sent.
    fn forward(&self, signal: Signal) {
        let Some(pid) = self.session.foreground().current() else {
            debug!(?signal, "no foreground job");
            return;
        };

        debug!(%pid, ?signal, "forwarding to foreground job");
        if let Err(e) = self.control.signal_job(pid, signal) {
            warn!(%pid, ?signal, error = %e, "failed to forward signal");
        }
        self.session.foreground().clear_if(pid);
    }

    /// Polls every job that can still change state. One SIGCHLD may stand
    /// for several children, so no single pid is assumed.
    pub fn reap_children(&self) {
        for pid in self.session.live_pids() {
            match self.control.try_reap(pid) {
                Ok(status) => {
                    if let Some((pid, event)) = child_event(status) {
                        self.session.apply_child_event(pid, event);
                    }
                }
                // Someone else already collected it.
                Err(Errno::ECHILD) => {}
                Err(e) => warn!(%pid, error = %e, "waitpid failed"),
            }
        }
    }

    pub fn continue_job(&self, pid: Pid) -> nix::Result<()> {
        debug!(%pid, "continuing job");
        self.control.signal_job(pid, Signal::SIGCONT)
    }
}

fn is_stop_signal(signal: Signal) -> bool {
    matches!(
        signal,
        Signal::SIGSTOP | Signal::SIGTSTP | Signal::SIGTTIN | Signal::SIGTTOU
    )
}

/// Maps a wait status onto a job transition. `None` means nothing changed.
pub fn child_event(status: WaitStatus) -> Option<(Pid, ChildEvent)> {
    match status {
        WaitStatus::Exited(pid, _) => Some((pid, ChildEvent::Exited)),
        WaitStatus::Signaled(pid, signal, _) if is_stop_signal(signal) => {
            Some((pid, ChildEvent::Stopped))
        }
        WaitStatus::Signaled(pid, _, _) => Some((pid, ChildEvent::Exited)),
        WaitStatus::Stopped(pid, _) => Some((pid, ChildEvent::Stopped)),
        WaitStatus::Continued(pid) => Some((pid, ChildEvent::Continued)),
        _ => None,
    }
}
