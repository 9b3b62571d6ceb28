//! Job table: the ordered record of every child process the shell tracks.

use std::fmt;

use nix::unistd::Pid;

/// Shell-assigned job number, printed as `[N]` and addressed as `%N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
    Exited,
}

impl JobStatus {
    pub fn is_exited(self) -> bool {
        self == JobStatus::Exited
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Stopped => write!(f, "Stopped"),
            JobStatus::Exited => write!(f, "Exited"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub pid: Pid,
    pub status: JobStatus,
    /// The line as the user typed it.
    pub command: String,
}

impl fmt::Display for Job {
    /// Listing form used by `jobs`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]: {}\t{}\t\t{}",
            self.id, self.pid, self.status, self.command
        )
    }
}

/// Append-ordered collection of jobs, oldest first.
///
/// Ids come from a counter that only moves forward, so an id is never handed
/// out twice even after the job that held it is removed.
#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: u32,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        JobTable {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    /// Records a new job. A finished job still holding `pid` is dropped
    /// first, since the OS has handed that pid to someone else.
    pub fn append(&mut self, pid: Pid, status: JobStatus, command: String) -> JobId {
        self.jobs.retain(|j| !(j.pid == pid && j.status.is_exited()));

        let id = JobId(self.next_id);
        self.next_id += 1;

        self.jobs.push(Job {
            id,
            pid,
            status,
            command,
        });
        id
    }

    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        self.jobs.iter().find(|j| j.pid == pid)
    }

    pub fn find_by_jid(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Most recently appended job still present.
    pub fn last(&self) -> Option<&Job> {
        self.jobs.last()
    }

    /// Most recently appended job that has not exited.
    pub fn last_active(&self) -> Option<&Job> {
        self.jobs.iter().rev().find(|j| !j.status.is_exited())
    }

    /// Sets the status of every job with `pid`. Unknown pids are ignored and
    /// an `Exited` job stays `Exited`.
    pub fn update_status(&mut self, pid: Pid, status: JobStatus) {
        for job in self.jobs.iter_mut().filter(|j| j.pid == pid) {
            if !job.status.is_exited() {
                job.status = status;
            }
        }
    }

    pub fn remove(&mut self, pid: Pid) {
        self.jobs.retain(|j| j.pid != pid);
    }

    pub fn remove_all_exited(&mut self) {
        self.jobs.retain(|j| !j.status.is_exited());
    }

    /// Pids of jobs that can still change state.
    pub fn live_pids(&self) -> Vec<Pid> {
        self.jobs
            .iter()
            .filter(|j| !j.status.is_exited())
            .map(|j| j.pid)
            .collect()
    }

    pub fn list(&self) -> Vec<Job> {
        self.jobs.clone()
    }
}
