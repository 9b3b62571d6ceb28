use std::env;

use colored::Colorize;

use crate::config::Config;

pub struct Prompt {
    name: String,
    fixed: Option<String>,
}

impl Prompt {
    pub fn new(config: &Config) -> Self {
        Self {
            name: config.name.clone(),
            fixed: config.prompt.clone(),
        }
    }

    pub fn get_string(&self) -> String {
        if let Some(fixed) = &self.fixed {
            return fixed.clone();
        }

        let cwd = env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| String::from("?"));

        format!(
            "{}:{} {}> ",
            whoami::username().green().bold(),
            cwd.blue(),
            self.name
        )
    }
}
