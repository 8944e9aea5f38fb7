use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::MonitorError;

/// Description of one captured execution: the program to run, its
/// arguments, environment overrides, working directory, and optional
/// stdin payload.
///
/// Environment entries are overlaid on the monitor's own environment when
/// the child is spawned; an override wins on key collision and the parent
/// environment is never mutated.
#[derive(Debug, Clone)]
pub struct CapturedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub stdin: Option<String>,
}

impl CapturedCommand {
    /// Split a shell command string into a builder, honoring quoting.
    pub fn parse(command_line: &str) -> Result<CapturedCommandBuilder, MonitorError> {
        let mut words = shell_words::split(command_line)?.into_iter();
        let program = words.next().ok_or(MonitorError::EmptyCommand)?;
        Ok(CapturedCommandBuilder::new(&program).args(words))
    }

    /// Program and arguments joined for log messages.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

pub struct CapturedCommandBuilder {
    command: CapturedCommand,
}

impl CapturedCommandBuilder {
    pub fn new(program: &str) -> Self {
        Self {
            command: CapturedCommand {
                program: program.to_string(),
                args: Vec::new(),
                env: HashMap::new(),
                working_dir: None,
                stdin: None,
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.command.args.push(arg.to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.command
            .args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.command.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            self.command
                .env
                .insert(key.as_ref().to_string(), value.as_ref().to_string());
        }
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.command.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn stdin(mut self, input: String) -> Self {
        self.command.stdin = Some(input);
        self
    }

    pub fn build(self) -> CapturedCommand {
        self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_all_fields() {
        let command = CapturedCommandBuilder::new("test")
            .arg("arg1")
            .args(["arg2", "arg3"])
            .env("KEY1", "value1")
            .envs([("KEY2", "value2"), ("KEY3", "value3")])
            .current_dir(Path::new("/tmp"))
            .stdin("input data".to_string())
            .build();

        assert_eq!(command.program, "test");
        assert_eq!(command.args, vec!["arg1", "arg2", "arg3"]);
        assert_eq!(command.env.get("KEY1"), Some(&"value1".to_string()));
        assert_eq!(command.env.get("KEY2"), Some(&"value2".to_string()));
        assert_eq!(command.env.get("KEY3"), Some(&"value3".to_string()));
        assert_eq!(command.working_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(command.stdin, Some("input data".to_string()));
    }

    #[test]
    fn parse_splits_quoted_words() {
        let command = CapturedCommand::parse("sh -c 'echo hello world'")
            .unwrap()
            .build();
        assert_eq!(command.program, "sh");
        assert_eq!(command.args, vec!["-c", "echo hello world"]);
    }

    #[test]
    fn parse_rejects_empty_command() {
        assert!(matches!(
            CapturedCommand::parse("   "),
            Err(MonitorError::EmptyCommand)
        ));
    }

    #[test]
    fn display_joins_program_and_args() {
        let command = CapturedCommandBuilder::new("printf").arg("ok\\n").build();
        assert_eq!(command.display(), "printf ok\\n");
        let bare = CapturedCommandBuilder::new("true").build();
        assert_eq!(bare.display(), "true");
    }
}
