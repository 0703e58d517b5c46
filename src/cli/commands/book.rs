use std::path::Path;

use worksbill_core::storage::ProjectStorage;
use worksbill_storage_json::canonical_name;

use crate::cli::core::{CommandError, CommandResult};
use crate::cli::io;
use crate::cli::output::{Alignment, Table};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

use super::{rest_text, unknown_subcommand, usage};

const SUBCOMMANDS: &str = "new, save, load, list, backup, backups, restore, export, import";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "book",
        "Create, save, load and back up project books",
        "book new <name> | book save [name] | book load <name> | book list | book backup [note] | book backups | book restore <backup> | book export <path> | book import <path>",
        cmd_book,
    )]
}

fn cmd_book(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((subcommand, rest)) = args.split_first() else {
        return Err(usage("book <new|save|load|list|backup|backups|restore|export|import>"));
    };
    match subcommand.to_ascii_lowercase().as_str() {
        "new" => handle_new(context, rest),
        "save" => handle_save(context, rest),
        "load" => handle_load(context, rest),
        "list" => handle_list(context),
        "backup" => handle_backup(context, rest),
        "backups" => handle_backups(context),
        "restore" => handle_restore(context, rest),
        "export" => handle_export(context, rest),
        "import" => handle_import(context, rest),
        other => Err(unknown_subcommand("book", other, SUBCOMMANDS)),
    }
}

fn handle_new(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = rest_text(args);
    if name.is_empty() {
        return Err(usage("book new <name>"));
    }
    context.reset_engine(&name);
    io::print_success(format!(
        "New book `{}` started. Use `book save` to store it.",
        name
    ));
    Ok(())
}

fn handle_save(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = match args {
        [] => context
            .book_name
            .clone()
            .unwrap_or_else(|| canonical_name(&context.engine.name())),
        [name] => canonical_name(name),
        _ => return Err(usage("book save [name]")),
    };
    let book = context.engine.to_book()?;
    context.storage.save_book(&name, &book)?;
    context.book_name = Some(name.clone());
    context.remember_book(&name)?;
    io::print_success(format!(
        "Book saved to {}.",
        context.storage.book_path(&name).display()
    ));
    Ok(())
}

fn handle_load(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(usage("book load <name>"));
    };
    let name = canonical_name(name);
    context.storage_load(&name)?;
    io::print_success(format!(
        "Book `{}` loaded ({} projects).",
        context.engine.name(),
        context.engine.projects()?.len()
    ));
    Ok(())
}

fn handle_list(context: &mut ShellContext) -> CommandResult {
    let books = context.storage.list_book_metadata()?;
    if books.is_empty() {
        io::print_info("No stored books.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        ("", Alignment::Left),
        ("Name", Alignment::Left),
        ("Title", Alignment::Left),
        ("Projects", Alignment::Right),
        ("Executions", Alignment::Right),
        ("Bills", Alignment::Right),
        ("Updated", Alignment::Left),
    ]);
    for book in books {
        let marker = if context.book_name.as_deref() == Some(book.slug.as_str()) {
            "*"
        } else {
            ""
        };
        table.push(vec![
            marker.to_string(),
            book.slug,
            book.name,
            book.project_count.to_string(),
            book.execution_count.to_string(),
            book.bill_count.to_string(),
            book.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table.print();
    Ok(())
}

fn handle_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = context.require_named_book()?;
    let note = rest_text(args);
    let book = context.engine.to_book()?;
    let info = context
        .storage
        .backup_book(&name, &book, (!note.is_empty()).then_some(note.as_str()))?;
    io::print_success(format!("Backup {} created.", info.id));
    Ok(())
}

fn handle_backups(context: &mut ShellContext) -> CommandResult {
    let name = context.require_named_book()?;
    let backups = context.storage.list_backup_metadata(&name)?;
    if backups.is_empty() {
        io::print_info(format!("No backups for `{}`.", name));
        return Ok(());
    }
    let mut table = Table::new(vec![
        ("Backup", Alignment::Left),
        ("Created", Alignment::Left),
        ("Size", Alignment::Right),
    ]);
    for backup in backups {
        table.push(vec![
            backup.name,
            backup
                .created_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".into()),
            format!("{} B", backup.size_bytes),
        ]);
    }
    table.print();
    Ok(())
}

fn handle_restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [token] = args else {
        return Err(usage("book restore <backup>"));
    };
    let name = context.require_named_book()?;
    let backups = context.storage.list_backups(&name)?;
    let mut matches = backups
        .iter()
        .filter(|backup| backup.id == *token || backup.id.starts_with(token));
    let backup = match (matches.next(), matches.next()) {
        (Some(backup), None) => backup.clone(),
        (Some(_), Some(_)) => {
            return Err(CommandError::InvalidArguments(format!(
                "`{token}` matches several backups; use the full name"
            )))
        }
        (None, _) => {
            return Err(CommandError::InvalidArguments(format!(
                "no backup of `{name}` matches `{token}`"
            )))
        }
    };
    let book = context.storage.restore_backup(&backup)?;
    context.replace_engine(book)?;
    io::print_success(format!("Restored `{}` from {}.", name, backup.id));
    Ok(())
}

fn handle_export(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [path] = args else {
        return Err(usage("book export <path>"));
    };
    let book = context.engine.to_book()?;
    context.storage.save_book_to_path(&book, Path::new(path))?;
    io::print_success(format!("Book exported to {}.", path));
    Ok(())
}

fn handle_import(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [path] = args else {
        return Err(usage("book import <path>"));
    };
    let book = context.storage.load_book_from_path(Path::new(path))?;
    context.replace_engine(book)?;
    context.book_name = None;
    io::print_success(format!(
        "Imported `{}` from {}. Use `book save <name>` to store it.",
        context.engine.name(),
        path
    ));
    Ok(())
}
