use std::{
    borrow::Cow,
    fmt,
    io::{self, BufRead},
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::{ValidationContext, ValidationResult, Validator},
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use shell_words::split;

use crate::cli::core::LoopControl;
use crate::cli::io as cli_io;
use crate::cli::registry::CommandRegistry;
use crate::cli::shell_context::{CliMode, ShellContext};
use crate::errors::CliError;

/// Environment variable that switches the shell to line-by-line stdin mode.
pub const SCRIPT_ENV: &str = "WORKSBILL_CLI_SCRIPT";

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
    let helper = CommandHelper::new(&context.registry);
    editor.set_helper(Some(helper));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    cli_io::print_info(crate::utils::build_info::current().summary());
    cli_io::print_info("Type `help` for commands.");

    while context.running {
        let prompt = context.prompt();
        match editor.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();

                match context.process_line(trimmed) {
                    Ok(LoopControl::Continue) => {}
                    Ok(LoopControl::Exit) => break,
                    Err(err) => context.report_error(err)?,
                }
            }
            Err(ReadlineError::Interrupted) => {
                cli_io::print_info("Interrupted. Type `exit` to leave the shell.");
            }
            Err(ReadlineError::Eof) => {
                cli_io::print_info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if !context.running {
            break;
        }
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match context.process_line(trimmed) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err)?,
        }
    }
    Ok(())
}

/// Completes command names and, after a command, its subcommands.
struct CommandHelper {
    commands: Vec<(&'static str, Vec<&'static str>)>,
}

impl CommandHelper {
    fn new(registry: &CommandRegistry) -> Self {
        let commands = registry
            .list()
            .into_iter()
            .map(|entry| (entry.name, entry.subcommands()))
            .collect();
        Self { commands }
    }

    fn candidates(&self, words: &[&str], needle: &str) -> Vec<&'static str> {
        match words {
            [] => self.commands.iter().map(|(name, _)| *name).collect(),
            [command] => self
                .commands
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(command))
                .map(|(_, subcommands)| subcommands.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
        .into_iter()
        .filter(|candidate| candidate.starts_with(needle))
        .collect()
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let words: Vec<&str> = prefix[..start].split_whitespace().collect();
        let needle = prefix[start..].to_ascii_lowercase();
        let pairs = self
            .candidates(&words, &needle)
            .into_iter()
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }
}

impl Validator for CommandHelper {
    fn validate(&self, _ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct ParseError {
    message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_handles_quotes() {
        let tokens = parse_command_line("project add NH-44 \"Bypass widening\"").expect("parse");
        assert_eq!(tokens, vec!["project", "add", "NH-44", "Bypass widening"]);
    }

    #[test]
    fn completion_offers_commands_then_subcommands() {
        let mut registry = CommandRegistry::new();
        crate::cli::commands::register_all(&mut registry);
        let helper = CommandHelper::new(&registry);

        let mut commands = helper.candidates(&[], "ex");
        commands.sort_unstable();
        assert_eq!(commands, vec!["exec", "exit"]);
        assert_eq!(helper.candidates(&["bill"], "p"), vec!["pay"]);
        assert!(helper.candidates(&["bill", "pay"], "").is_empty());
    }

    #[test]
    fn unbalanced_quotes_are_reported() {
        assert!(parse_command_line("exec reject 1a2b \"missing").is_err());
    }
}
