//! In-memory stand-ins for the OS process primitives.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::process::{Launcher, ProcessControl};

/// Program name the fake launcher refuses to start.
pub const MISSING_PROGRAM: &str = "no-such-program";

type SignalHook = Arc<dyn Fn(Pid, Signal) + Send + Sync>;

#[derive(Default)]
struct State {
    on_signal: Option<SignalHook>,
    next_pid: i32,
    spawned: Vec<Vec<String>>,
    signals: Vec<(Pid, Signal)>,
    reaped: Vec<Pid>,
    pending: HashMap<Pid, VecDeque<nix::Result<WaitStatus>>>,
}

/// Hands out pids from 1000 upward and replays scripted wait results.
#[derive(Clone, Default)]
pub struct FakeProcesses {
    state: Arc<Mutex<State>>,
}

impl FakeProcesses {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Pid the next successful spawn will return.
    pub fn next_pid(&self) -> Pid {
        Pid::from_raw(1000 + self.state().next_pid)
    }

    /// Queues a wait result for the pid inside `status`.
    pub fn push_status(&self, status: WaitStatus) {
        let pid = status.pid().expect("status must carry a pid");
        self.state()
            .pending
            .entry(pid)
            .or_default()
            .push_back(Ok(status));
    }

    pub fn push_error(&self, pid: Pid, errno: Errno) {
        self.state()
            .pending
            .entry(pid)
            .or_default()
            .push_back(Err(errno));
    }

    /// Runs `hook` after each delivered signal, outside the fake's lock.
    pub fn on_signal(&self, hook: impl Fn(Pid, Signal) + Send + Sync + 'static) {
        self.state().on_signal = Some(Arc::new(hook));
    }

    pub fn spawned(&self) -> Vec<Vec<String>> {
        self.state().spawned.clone()
    }

    pub fn signals(&self) -> Vec<(Pid, Signal)> {
        self.state().signals.clone()
    }

    /// Pids whose scripted results have been consumed.
    pub fn reaped(&self) -> Vec<Pid> {
        self.state().reaped.clone()
    }
}

impl Launcher for FakeProcesses {
    fn spawn(&self, args: &[String]) -> io::Result<Pid> {
        if args.first().map(String::as_str) == Some(MISSING_PROGRAM) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "No such file or directory",
            ));
        }
        let mut state = self.state();
        let pid = Pid::from_raw(1000 + state.next_pid);
        state.next_pid += 1;
        state.spawned.push(args.to_vec());
        Ok(pid)
    }
}

impl ProcessControl for FakeProcesses {
    fn signal_job(&self, pid: Pid, signal: Signal) -> nix::Result<()> {
        let hook = {
            let mut state = self.state();
            state.signals.push((pid, signal));
            state.on_signal.clone()
        };
        if let Some(hook) = hook {
            hook(pid, signal);
        }
        Ok(())
    }

    fn try_reap(&self, pid: Pid) -> nix::Result<WaitStatus> {
        let mut state = self.state();
        match state.pending.get_mut(&pid).and_then(VecDeque::pop_front) {
            Some(result) => {
                state.reaped.push(pid);
                result
            }
            None => Ok(WaitStatus::StillAlive),
        }
    }
}
