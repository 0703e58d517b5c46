use std::collections::HashMap;

use crate::cli::core::CommandResult;
use crate::cli::shell_context::ShellContext;

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

pub struct CommandEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub handler: CommandHandler,
}

impl CommandEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            handler,
        }
    }

    /// Each alternative of a `a | b | c` usage line.
    pub fn usage_forms(&self) -> impl Iterator<Item = &'static str> {
        self.usage.split(" | ").map(str::trim)
    }

    /// Literal words following the command name in its usage forms, e.g. `add` in `boq add <code>`.
    pub fn subcommands(&self) -> Vec<&'static str> {
        let mut words: Vec<&'static str> = Vec::new();
        for form in self.usage_forms() {
            let mut tokens = form.split_whitespace().skip(1);
            let Some(word) = tokens.next() else { continue };
            let alternatives = word
                .strip_prefix('<')
                .and_then(|inner| inner.strip_suffix('>'))
                .filter(|inner| inner.contains('|'));
            let found: Vec<&'static str> = match alternatives {
                Some(inner) => inner.split('|').collect(),
                None if word.chars().all(|ch| ch.is_ascii_lowercase()) => vec![word],
                None => Vec::new(),
            };
            for word in found {
                if !words.contains(&word) {
                    words.push(word);
                }
            }
        }
        words
    }
}

/// Name-indexed command table that remembers registration order for help output.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandEntry>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: CommandEntry) {
        let name = entry.name;
        if self.commands.insert(name, entry).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    pub fn list(&self) -> Vec<&CommandEntry> {
        self.order
            .iter()
            .filter_map(|name| self.commands.get(name))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }

    pub fn handler(&self, name: &str) -> Option<CommandHandler> {
        self.commands.get(name).map(|entry| entry.handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
        Ok(())
    }

    #[test]
    fn subcommands_come_from_usage_forms() {
        let entry = CommandEntry::new(
            "exec",
            "",
            "exec add <boq-code> <quantity> | exec <submit|verify> <id> | exec list [status]",
            noop,
        );
        assert_eq!(entry.subcommands(), vec!["add", "submit", "verify", "list"]);

        let entry = CommandEntry::new("etp", "", "etp <gross> [gst%]", noop);
        assert!(entry.subcommands().is_empty());
    }
}
