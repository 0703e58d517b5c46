use crate::cli::core::CommandResult;
use crate::cli::format;
use crate::cli::io;
use crate::cli::output::{section, Alignment, Table};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

use super::{unknown_subcommand, usage};

const USAGE: &str = "project <add|list|use|show>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "project",
        "Register projects and pick the active one",
        "project add <code> <name> | project list | project use <code> | project show",
        cmd_project,
    )]
}

fn cmd_project(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((subcommand, rest)) = args.split_first() else {
        return Err(usage(USAGE));
    };
    match subcommand.to_ascii_lowercase().as_str() {
        "add" => handle_add(context, rest),
        "list" => handle_list(context),
        "use" => handle_use(context, rest),
        "show" => handle_show(context),
        other => Err(unknown_subcommand("project", other, "add, list, use, show")),
    }
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [code, name @ ..] = args else {
        return Err(usage("project add <code> <name>"));
    };
    if name.is_empty() {
        return Err(usage("project add <code> <name>"));
    }
    let project = context.engine.add_project(*code, name.join(" "))?;
    if context.current_project.is_none() {
        context.current_project = Some(project.id);
    }
    io::print_success(format!("Project {} ({}) added.", project.code, project.name));
    Ok(())
}

fn handle_list(context: &mut ShellContext) -> CommandResult {
    let projects = context.engine.projects()?;
    if projects.is_empty() {
        io::print_info("No projects yet.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        ("", Alignment::Left),
        ("Code", Alignment::Left),
        ("Name", Alignment::Left),
        ("Progress", Alignment::Right),
    ]);
    for project in projects {
        let marker = if context.current_project == Some(project.id) {
            "*"
        } else {
            ""
        };
        let progress = context.engine.project_progress(project.id)?;
        table.push(vec![
            marker.to_string(),
            project.code,
            project.name,
            format::percent(progress.percentage),
        ]);
    }
    table.print();
    Ok(())
}

fn handle_use(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [code] = args else {
        return Err(usage("project use <code>"));
    };
    let project = context.find_project(code)?;
    context.current_project = Some(project.id);
    io::print_success(format!("Active project: {} ({})", project.code, project.name));
    Ok(())
}

fn handle_show(context: &mut ShellContext) -> CommandResult {
    let project = context.project()?;
    let progress = context.engine.project_progress(project.id)?;
    let bills = context.engine.bills(project.id)?;
    let rows = context.engine.boq_items(project.id)?;
    let sanctioned = rows
        .iter()
        .map(|(item, _)| item.sanctioned_value())
        .sum();

    section(format!("{} {}", project.code, project.name));
    io::print_info(format!("  BOQ items      : {}", rows.len()));
    io::print_info(format!("  Sanctioned     : {}", context.money(sanctioned)));
    io::print_info(format!("  Progress       : {}", format::percent(progress.percentage)));
    io::print_info(format!("  Overrun items  : {}", progress.overrun_items().count()));
    io::print_info(format!("  RA bills       : {}", bills.len()));
    Ok(())
}
