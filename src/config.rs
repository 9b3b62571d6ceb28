use std::env;
use std::io::{self, IsTerminal};

pub const SHELL_NAME: &str = "mabshell";

#[derive(Debug, Clone)]
pub struct Config {
    /// Name used as the prefix of diagnostics.
    pub name: String,
    /// Literal prompt from `MABSHELL_PROMPT`.
    pub prompt: Option<String>,
    /// Own process groups and terminal handoff for jobs.
    pub job_control: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: SHELL_NAME.to_string(),
            prompt: None,
            job_control: false,
        }
    }
}

impl Config {
    pub fn from_env(args: &[String]) -> Self {
        let wants_job_control = !args.iter().any(|a| a == "--no-job-control");

        Config {
            prompt: env::var("MABSHELL_PROMPT").ok(),
            job_control: wants_job_control && io::stdin().is_terminal(),
            ..Config::default()
        }
    }
}
