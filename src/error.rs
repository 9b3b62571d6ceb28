use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    Spawn(#[source] io::Error),

    #[error("{}: {source}", .path.display())]
    ChangeDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("too many arguments")]
    TooManyArguments,

    #[error("HOME not set")]
    NoHome,

    #[error("job does not exist")]
    NoSuchJob,

    #[error("job already finished")]
    JobFinished,

    #[error("failed to continue job: {0}")]
    Continue(#[source] nix::Error),

    /// The foreground wait itself broke down; the shell cannot go on.
    #[error("failed waiting for foreground job: {0}")]
    Wait(String),
}

impl ShellError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Wait(_))
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;
