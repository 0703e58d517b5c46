use worksbill_domain::Role;

use crate::cli::core::{CommandError, CommandResult};
use crate::cli::io;
use crate::cli::output::{Alignment, Table};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

use super::{unknown_subcommand, usage};

const ROLES: &str = "submitter, verifier, approver, accounts";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "actor",
        "Register people and choose who is acting",
        "actor add <name> <role> | actor list | actor use <name>",
        cmd_actor,
    )]
}

fn cmd_actor(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((subcommand, rest)) = args.split_first() else {
        return Err(usage("actor <add|list|use>"));
    };
    match subcommand.to_ascii_lowercase().as_str() {
        "add" => handle_add(context, rest),
        "list" => handle_list(context),
        "use" => handle_use(context, rest),
        other => Err(unknown_subcommand("actor", other, "add, list, use")),
    }
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [name, role] = args else {
        return Err(usage("actor add <name> <role>"));
    };
    let role = Role::parse(role).ok_or_else(|| {
        CommandError::InvalidArguments(format!("unknown role `{role}`. Roles: {ROLES}"))
    })?;
    let actor = context.engine.add_actor(*name, role)?;
    if context.current_actor.is_none() {
        context.current_actor = Some(actor.id);
    }
    io::print_success(format!("Actor {} added as {}.", actor.name, actor.role));
    Ok(())
}

fn handle_list(context: &mut ShellContext) -> CommandResult {
    let actors = context.engine.actors()?;
    if actors.is_empty() {
        io::print_info("No actors yet.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        ("", Alignment::Left),
        ("Name", Alignment::Left),
        ("Role", Alignment::Left),
    ]);
    for actor in actors {
        let marker = if context.current_actor == Some(actor.id) {
            "*"
        } else {
            ""
        };
        table.push(vec![marker.to_string(), actor.name, actor.role.to_string()]);
    }
    table.print();
    Ok(())
}

fn handle_use(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(usage("actor use <name>"));
    };
    let actor = context.find_actor(name)?;
    context.current_actor = Some(actor.id);
    io::print_success(format!("Acting as {} ({}).", actor.name, actor.role));
    Ok(())
}
