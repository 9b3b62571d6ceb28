use std::env;
use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::command::{Command, CommandLine, JobTarget};
use crate::config::Config;
use crate::error::{Result, ShellError};
use crate::jobs::{Job, JobStatus};
use crate::process::{Launcher, OsProcesses};
use crate::prompt::Prompt;
use crate::session::{ChildEvent, Session};
use crate::signal_handler::SignalHandler;
use crate::terminal::Terminal;

pub struct Shell<W: Write = io::Stdout> {
    name: String,
    prompt: Prompt,
    session: Arc<Session>,
    signals: SignalHandler,
    launcher: Box<dyn Launcher>,
    terminal: Terminal,
    out: W,
    running: bool,
}

impl Shell<io::Stdout> {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let session = Arc::new(Session::new());
        let processes = OsProcesses::new(config.job_control);

        let signals = SignalHandler::new(Arc::clone(&session), Arc::new(processes));
        signals
            .setup_handler()
            .context("failed to install signal handlers")?;

        Ok(Self::with_parts(
            config,
            session,
            signals,
            Box::new(processes),
            Terminal::new(config.job_control),
            io::stdout(),
        ))
    }
}

impl<W: Write> Shell<W> {
    pub fn with_parts(
        config: &Config,
        session: Arc<Session>,
        signals: SignalHandler,
        launcher: Box<dyn Launcher>,
        terminal: Terminal,
        out: W,
    ) -> Self {
        Self {
            name: config.name.clone(),
            prompt: Prompt::new(config),
            session,
            signals,
            launcher,
            terminal,
            out,
            running: true,
        }
    }

    /// Reads and executes lines until `exit` or end of input. Only a fatal
    /// error ends the loop early.
    pub fn run(&mut self, input: impl BufRead) -> Result<()> {
        let mut lines = input.lines();

        while self.running {
            let prompt = self.prompt.get_string();
            let _ = write!(self.out, "{}", prompt);
            let _ = self.out.flush();

            match lines.next() {
                Some(Ok(line)) => self.execute_line(&line)?,
                Some(Err(e)) => {
                    warn!(error = %e, "failed to read input");
                    self.emit(format!("{}: {}", self.name, e));
                    break;
                }
                None => {
                    self.emit("exit");
                    break;
                }
            }
        }
        Ok(())
    }

    pub fn execute_line(&mut self, line: &str) -> Result<()> {
        let parsed = CommandLine::parse(line);
        let Some(cmd) = Command::from_line(&parsed) else {
            return Ok(());
        };

        let outcome = match cmd {
            Command::Fg(target) => self.foreground_job(target),
            Command::Bg(target) => self.background_job(target),
            Command::Jobs => {
                self.list_jobs();
                Ok(())
            }
            Command::Cd(args) => self.change_dir(&args),
            Command::Pwd => env::current_dir()
                .map(|path| self.emit(path.display()))
                .map_err(ShellError::from),
            Command::Ls(path) => self.list_dir(path.as_deref()),
            Command::Help => {
                self.print_help();
                Ok(())
            }
            Command::Exit => {
                self.emit("exit");
                self.running = false;
                Ok(())
            }
            Command::External {
                arguments,
                background,
            } => self.run_external(&arguments, background, line.trim()),
        };

        match outcome {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.report(&parsed.arguments[0], &e);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    fn emit(&mut self, line: impl fmt::Display) {
        let _ = writeln!(self.out, "{}", line);
    }

    fn report(&mut self, command: &str, error: &ShellError) {
        self.emit(format!("{}: {} : {}", self.name, command, error));
    }

    fn run_external(&mut self, arguments: &[String], background: bool, line: &str) -> Result<()> {
        let pid = self.launcher.spawn(arguments).map_err(ShellError::Spawn)?;

        // Ownership comes first: once the job is recorded the bridge may
        // reap it, and its exit must find the foreground already taken.
        if !background {
            self.take_foreground(pid);
        }
        let id = self
            .session
            .append(pid, JobStatus::Running, line.to_string());
        debug!(%pid, job = %id, background, "spawned {}", arguments[0]);

        if background {
            self.emit(format!("[{}] {}", id, pid));
            self.signals.reap_children();
            return Ok(());
        }

        self.wait_foreground(pid)
    }

    fn take_foreground(&mut self, pid: Pid) {
        self.session.foreground().set(pid);
        self.terminal.give_to(pid);
    }

    fn release_foreground(&mut self, pid: Pid) {
        self.session.foreground().clear_if(pid);
        self.terminal.reclaim();
    }

    /// Blocks until `pid` exits, stops, or loses the foreground to a
    /// forwarded signal.
    fn wait_foreground(&mut self, pid: Pid) -> Result<()> {
        // The child may have changed state before it was tracked.
        self.signals.reap_children();

        let waited = self.session.foreground().wait_released(pid);
        self.release_foreground(pid);
        waited?;

        if let Some(job) = self.session.find_by_pid(pid) {
            debug!(%pid, status = %job.status, "foreground wait finished");
            if job.status == JobStatus::Stopped {
                self.emit(format!("\n[{}]+ Stopped\t{}", job.id, job.command));
            }
        }
        Ok(())
    }

    fn resolve(&self, target: JobTarget) -> Result<Job> {
        let job = match target {
            JobTarget::Last => self.session.last_active().or_else(|| self.session.last()),
            JobTarget::Job(id) => self.session.find_by_jid(id),
            JobTarget::Process(pid) => self.session.find_by_pid(pid),
            JobTarget::Invalid => None,
        };
        job.ok_or(ShellError::NoSuchJob)
    }

    /// A finished job cannot be resumed; it is dropped from the table instead.
    fn refuse_if_finished(&self, job: &Job) -> Result<()> {
        if job.status.is_exited() {
            self.session.remove(job.pid);
            return Err(ShellError::JobFinished);
        }
        Ok(())
    }

    /// Marks the job running before SIGCONT goes out, so a stop reported
    /// right after the resume is not overwritten.
    fn continue_job(&self, job: &Job) -> Result<()> {
        self.session.apply_child_event(job.pid, ChildEvent::Continued);
        if let Err(e) = self.signals.continue_job(job.pid) {
            self.session.update_status(job.pid, job.status);
            return Err(ShellError::Continue(e));
        }
        Ok(())
    }

    fn foreground_job(&mut self, target: JobTarget) -> Result<()> {
        let job = self.resolve(target)?;
        self.refuse_if_finished(&job)?;

        self.emit(&job.command);
        self.take_foreground(job.pid);
        if let Err(e) = self.continue_job(&job) {
            self.release_foreground(job.pid);
            return Err(e);
        }
        self.wait_foreground(job.pid)
    }

    fn background_job(&mut self, target: JobTarget) -> Result<()> {
        let job = self.resolve(target)?;
        self.refuse_if_finished(&job)?;

        self.continue_job(&job)?;
        self.emit(format!("[{}] {} &", job.id, job.command));
        Ok(())
    }

    /// Prints every job, then forgets the ones that have exited.
    fn list_jobs(&mut self) {
        for job in self.session.list() {
            self.emit(&job);
        }
        self.session.remove_all_exited();
    }

    fn change_dir(&mut self, args: &[String]) -> Result<()> {
        let path = match args {
            [] => PathBuf::from(env::var("HOME").map_err(|_| ShellError::NoHome)?),
            [path] => PathBuf::from(path),
            _ => return Err(ShellError::TooManyArguments),
        };

        env::set_current_dir(&path).map_err(|source| ShellError::ChangeDir { path, source })
    }

    fn list_dir(&mut self, path: Option<&str>) -> Result<()> {
        let target = path.unwrap_or(".");
        let mut items: Vec<(String, bool)> = fs::read_dir(target)?
            .flatten()
            .map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                (name, entry.path().is_dir())
            })
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));

        let mut row = String::new();
        for (i, (name, is_dir)) in items.iter().enumerate() {
            let cell = format!("{:<20}", name);
            if *is_dir {
                row.push_str(&cell.blue().to_string());
            } else {
                row.push_str(&cell);
            }

            if (i + 1) % 4 == 0 {
                self.emit(&row);
                row.clear();
            }
        }
        if !row.is_empty() {
            self.emit(&row);
        }
        Ok(())
    }

    fn print_help(&mut self) {
        self.emit("Available commands:");
        self.emit("  jobs            - List jobs");
        self.emit("  fg [%job|pid]   - Resume a job in the foreground");
        self.emit("  bg [%job|pid]   - Resume a job in the background");
        self.emit("  cd [path]       - Change directory");
        self.emit("  pwd             - Print working directory");
        self.emit("  ls [path]       - List directory contents");
        self.emit("  help            - Show this help");
        self.emit("  exit            - Exit shell");
        self.emit("\nAdd '&' at the end of a command to run it in background");
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.out
    }
}
