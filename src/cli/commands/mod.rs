pub mod actor;
pub mod bill;
pub mod book;
pub mod boq;
pub mod config;
pub mod execution;
pub mod fund;
pub mod milestone;
pub mod project;
pub mod report;
pub mod request;
pub mod system;

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::cli::core::CommandError;
use crate::cli::registry::{CommandEntry, CommandRegistry};

const ROOT_COMMAND_ORDER: &[&str] = &[
    "book",
    "project",
    "actor",
    "fund",
    "boq",
    "milestone",
    "exec",
    "bill",
    "request",
    "etp",
    "progress",
    "variance",
    "history",
    "notifications",
    "config",
    "help",
    "version",
    "exit",
];

pub(crate) fn all_entries() -> Vec<CommandEntry> {
    let mut commands = Vec::new();
    commands.extend(book::definitions());
    commands.extend(project::definitions());
    commands.extend(actor::definitions());
    commands.extend(fund::definitions());
    commands.extend(boq::definitions());
    commands.extend(milestone::definitions());
    commands.extend(execution::definitions());
    commands.extend(bill::definitions());
    commands.extend(request::definitions());
    commands.extend(report::definitions());
    commands.extend(config::definitions());
    commands.extend(system::definitions());
    commands
}

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    let mut entries = all_entries();
    entries.sort_by_key(|entry| {
        ROOT_COMMAND_ORDER
            .iter()
            .position(|name| entry.name.eq_ignore_ascii_case(name))
            .unwrap_or(ROOT_COMMAND_ORDER.len())
    });
    for entry in entries {
        registry.register(entry);
    }
}

pub(crate) fn usage(text: &str) -> CommandError {
    CommandError::InvalidArguments(format!("usage: {text}"))
}

pub(crate) fn unknown_subcommand(command: &str, other: &str, available: &str) -> CommandError {
    CommandError::InvalidArguments(format!(
        "unknown {command} subcommand `{other}`. Available: {available}"
    ))
}

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, CommandError> {
    Decimal::from_str(raw.trim().replace(',', "").as_str()).map_err(|_| {
        CommandError::InvalidArguments(format!("{field} must be a number, got `{raw}`"))
    })
}

/// Optional positional decimal; absent or `-` falls back to `default`.
pub(crate) fn decimal_or(
    field: &str,
    raw: Option<&&str>,
    default: Decimal,
) -> Result<Decimal, CommandError> {
    match raw {
        None => Ok(default),
        Some(value) if *value == "-" => Ok(default),
        Some(value) => parse_decimal(field, value),
    }
}

pub(crate) fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("{field} must be a YYYY-MM-DD date, got `{raw}`"))
    })
}

/// Joins trailing free-text arguments.
pub(crate) fn rest_text(args: &[&str]) -> String {
    args.join(" ").trim().to_string()
}
