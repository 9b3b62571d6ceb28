//! OS process primitives the shell depends on, kept behind traits so the job
//! control logic can run against fakes.

use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command;

use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// Starts external programs.
pub trait Launcher {
    /// Starts `args[0]` with the remaining arguments and returns its pid.
    fn spawn(&self, args: &[String]) -> io::Result<Pid>;
}

/// Signal delivery and child reaping.
pub trait ProcessControl: Send + Sync {
    /// Sends `signal` to the job led by `pid`.
    fn signal_job(&self, pid: Pid, signal: Signal) -> nix::Result<()>;

    /// Non-blocking reap of one child, reporting stops and continues too.
    fn try_reap(&self, pid: Pid) -> nix::Result<WaitStatus>;
}

/// The real thing. With job control each child leads its own process group
/// and signals go to the whole group.
#[derive(Debug, Clone, Copy)]
pub struct OsProcesses {
    job_control: bool,
}

impl OsProcesses {
    pub fn new(job_control: bool) -> Self {
        OsProcesses { job_control }
    }
}

impl Launcher for OsProcesses {
    fn spawn(&self, args: &[String]) -> io::Result<Pid> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        let mut cmd = Command::new(program);
        cmd.args(rest);

        if self.job_control {
            cmd.process_group(0);
            // The shell ignores SIGTTOU and an ignored disposition survives exec.
            unsafe {
                cmd.pre_exec(|| {
                    signal::signal(Signal::SIGTTOU, SigHandler::SigDfl)?;
                    Ok(())
                });
            }
        }

        let child = cmd.spawn()?;
        Ok(Pid::from_raw(child.id() as i32))
    }
}

impl ProcessControl for OsProcesses {
    fn signal_job(&self, pid: Pid, signal: Signal) -> nix::Result<()> {
        if self.job_control {
            signal::killpg(pid, signal)
        } else {
            signal::kill(pid, signal)
        }
    }

    fn try_reap(&self, pid: Pid) -> nix::Result<WaitStatus> {
        waitpid(
            pid,
            Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED),
        )
    }
}
