//! State shared between the command loop and the signal bridge.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use nix::unistd::Pid;
use tracing::debug;

use crate::error::{Result, ShellError};
use crate::jobs::{Job, JobId, JobStatus, JobTable};

/// A state change reported by the OS for one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildEvent {
    Exited,
    Stopped,
    Continued,
}

/// Which job, if any, currently owns the foreground.
///
/// Only the command loop sets it. Both sides may clear it; clearing a slot
/// the pid does not hold does nothing, and a real clear wakes the waiter.
#[derive(Debug, Default)]
pub struct Foreground {
    owner: Mutex<Option<Pid>>,
    released: Condvar,
}

impl Foreground {
    pub fn set(&self, pid: Pid) {
        if let Ok(mut owner) = self.owner.lock() {
            *owner = Some(pid);
            debug!(%pid, "foreground taken");
        }
    }

    pub fn current(&self) -> Option<Pid> {
        self.owner.lock().ok().and_then(|owner| *owner)
    }

    /// Empties the slot only if `pid` holds it.
    pub fn clear_if(&self, pid: Pid) -> bool {
        let cleared = match self.owner.lock() {
            Ok(mut owner) if *owner == Some(pid) => {
                *owner = None;
                true
            }
            _ => false,
        };
        if cleared {
            debug!(%pid, "foreground released");
            self.released.notify_all();
        }
        cleared
    }

    /// Blocks until `pid` no longer owns the foreground.
    pub fn wait_released(&self, pid: Pid) -> Result<()> {
        let owner = self
            .owner
            .lock()
            .map_err(|e| ShellError::Wait(e.to_string()))?;
        let _owner = self
            .released
            .wait_while(owner, |owner| *owner == Some(pid))
            .map_err(|e| ShellError::Wait(e.to_string()))?;
        Ok(())
    }
}

/// One shell session: the job table plus foreground ownership.
///
/// Shared as `Arc<Session>` between the command loop and the signal bridge.
#[derive(Debug, Default)]
pub struct Session {
    jobs: Mutex<JobTable>,
    foreground: Foreground,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // Table operations are plain Vec edits, so a poisoned lock still guards
    // a consistent table.
    fn table(&self) -> MutexGuard<'_, JobTable> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn foreground(&self) -> &Foreground {
        &self.foreground
    }

    pub fn append(&self, pid: Pid, status: JobStatus, command: String) -> JobId {
        let id = self.table().append(pid, status, command);
        debug!(%pid, job = %id, "job recorded");
        id
    }

    pub fn find_by_pid(&self, pid: Pid) -> Option<Job> {
        self.table().find_by_pid(pid).cloned()
    }

    pub fn find_by_jid(&self, id: JobId) -> Option<Job> {
        self.table().find_by_jid(id).cloned()
    }

    pub fn last(&self) -> Option<Job> {
        self.table().last().cloned()
    }

    pub fn last_active(&self) -> Option<Job> {
        self.table().last_active().cloned()
    }

    pub fn update_status(&self, pid: Pid, status: JobStatus) {
        self.table().update_status(pid, status);
    }

    pub fn remove(&self, pid: Pid) {
        self.table().remove(pid);
    }

    pub fn remove_all_exited(&self) {
        self.table().remove_all_exited();
    }

    pub fn live_pids(&self) -> Vec<Pid> {
        self.table().live_pids()
    }

    pub fn list(&self) -> Vec<Job> {
        self.table().list()
    }

    /// Applies one OS notification to the job with `pid`.
    ///
    /// Untracked pids are ignored. A foreground job that exits or stops gives
    /// up the foreground.
    pub fn apply_child_event(&self, pid: Pid, event: ChildEvent) {
        let status = match event {
            ChildEvent::Exited => JobStatus::Exited,
            ChildEvent::Stopped => JobStatus::Stopped,
            ChildEvent::Continued => JobStatus::Running,
        };
        self.update_status(pid, status);
        debug!(%pid, ?event, "child state changed");

        if matches!(event, ChildEvent::Exited | ChildEvent::Stopped) {
            self.foreground.clear_if(pid);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn pid(raw: i32) -> Pid {
        Pid::from_raw(raw)
    }

    #[test]
    fn clearing_empty_foreground_is_noop() {
        let fg = Foreground::default();
        assert!(!fg.clear_if(pid(5)));
        assert!(!fg.clear_if(pid(5)));
        assert_eq!(fg.current(), None);
    }

    #[test]
    fn clear_if_only_matches_owner() {
        let fg = Foreground::default();
        fg.set(pid(5));
        assert!(!fg.clear_if(pid(6)));
        assert_eq!(fg.current(), Some(pid(5)));
        assert!(fg.clear_if(pid(5)));
        assert!(!fg.clear_if(pid(5)));
    }

    #[test]
    fn wait_returns_at_once_when_not_owner() {
        let fg = Foreground::default();
        fg.set(pid(1));
        fg.wait_released(pid(2)).unwrap();
    }

    #[test]
    fn exit_event_marks_job_and_releases_foreground() {
        let session = Session::new();
        session.append(pid(100), JobStatus::Running, "sleep 5".into());
        session.foreground().set(pid(100));

        session.apply_child_event(pid(100), ChildEvent::Exited);

        assert_eq!(session.find_by_pid(pid(100)).unwrap().status, JobStatus::Exited);
        assert_eq!(session.foreground().current(), None);
    }

    #[test]
    fn stop_then_continue() {
        let session = Session::new();
        session.append(pid(7), JobStatus::Running, "vim".into());

        session.apply_child_event(pid(7), ChildEvent::Stopped);
        assert_eq!(session.find_by_pid(pid(7)).unwrap().status, JobStatus::Stopped);
        session.apply_child_event(pid(7), ChildEvent::Stopped);
        assert_eq!(session.find_by_pid(pid(7)).unwrap().status, JobStatus::Stopped);

        session.apply_child_event(pid(7), ChildEvent::Continued);
        assert_eq!(session.find_by_pid(pid(7)).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn background_event_leaves_foreground_alone() {
        let session = Session::new();
        session.append(pid(1), JobStatus::Running, "fg".into());
        session.append(pid(2), JobStatus::Running, "bg".into());
        session.foreground().set(pid(1));

        session.apply_child_event(pid(2), ChildEvent::Exited);
        assert_eq!(session.foreground().current(), Some(pid(1)));
    }

    #[test]
    fn event_for_untracked_pid_is_absorbed() {
        let session = Session::new();
        session.apply_child_event(pid(42), ChildEvent::Exited);
        assert!(session.list().is_empty());
    }

    #[test]
    fn blocked_wait_released_by_other_thread() {
        let session = Arc::new(Session::new());
        session.append(pid(100), JobStatus::Running, "sleep 5".into());
        session.foreground().set(pid(100));

        let notifier = {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                session.apply_child_event(pid(100), ChildEvent::Exited);
            })
        };

        session.foreground().wait_released(pid(100)).unwrap();
        notifier.join().unwrap();

        assert_eq!(session.find_by_pid(pid(100)).unwrap().status, JobStatus::Exited);
        assert_eq!(session.foreground().current(), None);
    }
}
