use worksbill_config::Config;

use crate::cli::core::CommandResult;
use crate::cli::io;
use crate::cli::output::{self, section, Alignment, OutputPreferences, Table};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{CliMode, ShellContext};

use super::{rest_text, unknown_subcommand, usage};

/// Keys whose values are baked into the engine settings at construction.
const POLICY_KEYS: [&str; 3] = [
    "gst_withheld",
    "payment_requires_approval",
    "open_overrun_requests",
];

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "Inspect and change preferences and billing policy",
        "config show | config get <key> | config set <key> <value> | config backup [note] | config backups | config restore <name>",
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((subcommand, rest)) = args.split_first() else {
        return handle_show(context);
    };
    match subcommand.to_ascii_lowercase().as_str() {
        "show" => handle_show(context),
        "get" => handle_get(context, rest),
        "set" => handle_set(context, rest),
        "backup" => handle_backup(context, rest),
        "backups" => handle_backups(context),
        "restore" => handle_restore(context, rest),
        other => Err(unknown_subcommand(
            "config",
            other,
            "show, get, set, backup, backups, restore",
        )),
    }
}

fn handle_show(context: &mut ShellContext) -> CommandResult {
    section("Configuration");
    let mut table = Table::new(vec![("Key", Alignment::Left), ("Value", Alignment::Left)]);
    for key in Config::KEYS {
        table.push(vec![key.to_string(), display_value(context, key)?]);
    }
    table.print();
    Ok(())
}

fn handle_get(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [key] = args else {
        return Err(usage("config get <key>"));
    };
    let key = key.to_ascii_lowercase();
    io::print_info(format!("{} = {}", key, display_value(context, &key)?));
    Ok(())
}

fn handle_set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [key, value @ ..] = args else {
        return Err(usage("config set <key> <value>"));
    };
    let key = key.to_ascii_lowercase();
    context.config.set(&key, &rest_text(value))?;
    context.persist_config()?;

    if POLICY_KEYS.contains(&key.as_str()) {
        context.rebuild_engine()?;
    }
    match key.as_str() {
        "ui_color_enabled" => apply_output_preferences(context),
        "default_book_root" | "backup_retention" => {
            io::print_hint("Storage settings take effect the next time the shell starts.")
        }
        _ => {}
    }
    io::print_success(format!("{} = {}", key, display_value(context, &key)?));
    Ok(())
}

fn handle_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let note = rest_text(args);
    let name = context
        .config_manager
        .backup(&context.config, (!note.is_empty()).then_some(note.as_str()))?;
    io::print_success(format!("Configuration backed up as {}.", name));
    Ok(())
}

fn handle_backups(context: &mut ShellContext) -> CommandResult {
    let backups = context.config_manager.list_backups()?;
    if backups.is_empty() {
        io::print_info("No configuration backups.");
        return Ok(());
    }
    for name in backups {
        io::print_info(format!("  {}", name));
    }
    Ok(())
}

fn handle_restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(usage("config restore <name>"));
    };
    context.config = context.config_manager.restore(name)?;
    apply_output_preferences(context);
    context.rebuild_engine()?;
    io::print_success(format!("Configuration restored from {}.", name));
    Ok(())
}

/// Book root falls back to the shell's data directory rather than the documents folder.
fn display_value(context: &ShellContext, key: &str) -> Result<String, crate::cli::core::CommandError> {
    if key == "default_book_root" && context.config.default_book_root.is_none() {
        let sample = context.storage.book_path("book");
        if let Some(dir) = sample.parent() {
            return Ok(dir.display().to_string());
        }
    }
    Ok(context.config.get(key)?)
}

fn apply_output_preferences(context: &ShellContext) {
    let current = output::preferences();
    output::set_preferences(OutputPreferences {
        color_enabled: context.config.ui_color_enabled && context.mode == CliMode::Interactive,
        quiet_mode: current.quiet_mode,
    });
}
