//! Dispatch, error reporting and command suggestions for the shell.

use std::io;

use strsim::levenshtein;
use worksbill_config::ConfigError;
use worksbill_core::CoreError;

use crate::cli::io as cli_io;
use crate::cli::shell_context::ShellContext;
use crate::errors::{CliError, WorksbillError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("No active project. Use `project add` or `project use` first.")]
    ProjectNotSelected,
    #[error("No active actor. Use `actor use <name>` first.")]
    ActorNotSelected,
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("exit requested")]
    ExitRequested,
}

impl From<WorksbillError> for CommandError {
    fn from(err: WorksbillError) -> Self {
        match err {
            WorksbillError::Core(err) => CommandError::Core(err),
            WorksbillError::Config(err) => CommandError::Config(err),
            other => CommandError::Message(other.to_string()),
        }
    }
}

impl ShellContext {
    pub fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    /// Parses and runs one line the same way the interactive loop does.
    pub fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = match crate::cli::shell::parse_command_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                cli_io::print_warning(&err);
                return Ok(LoopControl::Continue);
            }
        };
        let Some((raw, rest)) = tokens.split_first() else {
            return Ok(LoopControl::Continue);
        };

        let command = raw.to_lowercase();
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        self.last_command = Some(line.trim().to_string());

        match self.dispatch(&command, raw, &args) {
            Ok(LoopControl::Exit) => {
                self.running = false;
                Ok(LoopControl::Exit)
            }
            other => other,
        }
    }

    pub fn suggest_command(&self, input: &str) {
        cli_io::print_warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let needle = input.to_lowercase();
        let best = self
            .registry
            .names()
            .map(|name| (levenshtein(name, &needle), name))
            .min_by_key(|(distance, _)| *distance);

        if let Some((distance, name)) = best {
            if distance <= 3 {
                cli_io::print_info(format!("Suggestion: `{}`?", name));
            }
        }
    }

    pub fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                cli_io::print_error(message);
                cli_io::print_hint("Use `help <command>` for usage details.");
            }
            CommandError::ProjectNotSelected => {
                cli_io::print_error(CommandError::ProjectNotSelected);
                cli_io::print_hint("Try `project add NH-44 \"Bypass widening\"`.");
            }
            CommandError::ActorNotSelected => {
                cli_io::print_error(CommandError::ActorNotSelected);
                cli_io::print_hint("Register people with `actor add <name> <role>`.");
            }
            CommandError::Core(CoreError::Conflict(message)) => {
                cli_io::print_error(format!("Conflict: {message}"));
                cli_io::print_hint("The record changed underneath you; show it again and retry.");
            }
            other => cli_io::print_error(other),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worksbill_errors_unwrap_to_their_source() {
        let err = CommandError::from(WorksbillError::Core(CoreError::Unauthorized(
            "submitter cannot verify".into(),
        )));
        assert!(matches!(err, CommandError::Core(CoreError::Unauthorized(_))));

        let err = CommandError::from(WorksbillError::InvalidInput("bad".into()));
        assert_eq!(err.to_string(), "Invalid input: bad");
    }
}
