use nix::unistd::Pid;

use crate::jobs::JobId;

/// One line of input split into words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// The line ended with `&`.
    pub background: bool,
    pub arguments: Vec<String>,
}

impl CommandLine {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();

        let background = input.ends_with('&');
        let input = if background {
            input[..input.len() - 1].trim()
        } else {
            input
        };

        CommandLine {
            background,
            arguments: input.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// What `fg` and `bg` operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTarget {
    /// No argument: the most recently started job.
    Last,
    /// `%N`
    Job(JobId),
    /// A bare process id.
    Process(Pid),
    /// Something that cannot name a job.
    Invalid,
}

impl JobTarget {
    pub fn parse(arg: Option<&str>) -> Self {
        let Some(arg) = arg else {
            return JobTarget::Last;
        };

        if let Some(id) = arg.strip_prefix('%') {
            return match id.parse::<u32>() {
                Ok(id) if id > 0 => JobTarget::Job(JobId(id)),
                _ => JobTarget::Invalid,
            };
        }

        match arg.parse::<i32>() {
            Ok(pid) if pid > 0 => JobTarget::Process(Pid::from_raw(pid)),
            _ => JobTarget::Invalid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fg(JobTarget),
    Bg(JobTarget),
    Jobs,
    Cd(Vec<String>),
    Pwd,
    Ls(Option<String>),
    Help,
    Exit,
    External {
        arguments: Vec<String>,
        background: bool,
    },
}

impl Command {
    /// `None` for a blank line.
    pub fn from_line(line: &CommandLine) -> Option<Self> {
        let (cmd, args) = line.arguments.split_first()?;
        let first = args.first().map(String::as_str);

        let command = match cmd.as_str() {
            "fg" => Command::Fg(JobTarget::parse(first)),
            "bg" => Command::Bg(JobTarget::parse(first)),
            "jobs" => Command::Jobs,
            "cd" => Command::Cd(args.to_vec()),
            "pwd" => Command::Pwd,
            "ls" => Command::Ls(args.first().cloned()),
            "help" => Command::Help,
            "exit" => Command::Exit,
            _ => Command::External {
                arguments: line.arguments.clone(),
                background: line.background,
            },
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_on_runs_of_spaces() {
        let line = CommandLine::parse("  sleep    5  ");
        assert!(!line.background);
        assert_eq!(line.arguments, words(&["sleep", "5"]));
    }

    #[test]
    fn trailing_ampersand_means_background() {
        let attached = CommandLine::parse("sleep 5&");
        assert!(attached.background);
        assert_eq!(attached.arguments, words(&["sleep", "5"]));

        let spaced = CommandLine::parse("sleep 5 &   ");
        assert!(spaced.background);
        assert_eq!(spaced.arguments, words(&["sleep", "5"]));
    }

    #[test]
    fn blank_input_has_no_arguments() {
        assert!(CommandLine::parse("").arguments.is_empty());
        assert!(CommandLine::parse("   ").arguments.is_empty());
        assert!(CommandLine::parse(" & ").arguments.is_empty());
        assert_eq!(Command::from_line(&CommandLine::parse("   ")), None);
    }

    #[test]
    fn job_targets() {
        assert_eq!(JobTarget::parse(None), JobTarget::Last);
        assert_eq!(JobTarget::parse(Some("%2")), JobTarget::Job(JobId(2)));
        assert_eq!(
            JobTarget::parse(Some("4242")),
            JobTarget::Process(Pid::from_raw(4242))
        );
        assert_eq!(JobTarget::parse(Some("%")), JobTarget::Invalid);
        assert_eq!(JobTarget::parse(Some("%0")), JobTarget::Invalid);
        assert_eq!(JobTarget::parse(Some("-3")), JobTarget::Invalid);
        assert_eq!(JobTarget::parse(Some("vim")), JobTarget::Invalid);
    }

    #[test]
    fn builtins_are_recognised() {
        let parse = |s: &str| Command::from_line(&CommandLine::parse(s)).unwrap();

        assert_eq!(parse("fg %1"), Command::Fg(JobTarget::Job(JobId(1))));
        assert_eq!(parse("bg"), Command::Bg(JobTarget::Last));
        assert_eq!(parse("jobs"), Command::Jobs);
        assert_eq!(parse("cd a b"), Command::Cd(words(&["a", "b"])));
        assert_eq!(parse("exit"), Command::Exit);
        assert_eq!(
            parse("sleep 10 &"),
            Command::External {
                arguments: words(&["sleep", "10"]),
                background: true,
            }
        );
    }
}
