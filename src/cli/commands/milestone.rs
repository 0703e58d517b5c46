use worksbill_domain::Milestone;

use crate::cli::core::CommandResult;
use crate::cli::io;
use crate::cli::output::{Alignment, Table};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

use super::{parse_date, unknown_subcommand, usage};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "milestone",
        "Plan schedule milestones for the active project",
        "milestone add <name> <start> <end> [boq-code] | milestone list",
        cmd_milestone,
    )]
}

fn cmd_milestone(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((subcommand, rest)) = args.split_first() else {
        return Err(usage("milestone <add|list>"));
    };
    match subcommand.to_ascii_lowercase().as_str() {
        "add" => handle_add(context, rest),
        "list" => handle_list(context),
        other => Err(unknown_subcommand("milestone", other, "add, list")),
    }
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (name, start, end, item_code) = match args {
        [name, start, end] => (name, start, end, None),
        [name, start, end, code] => (name, start, end, Some(code)),
        _ => return Err(usage("milestone add <name> <start> <end> [boq-code]")),
    };
    let project = context.project()?;
    let start = parse_date("start", start)?;
    let end = parse_date("end", end)?;
    let mut milestone = Milestone::new(project.id, *name, start, end);
    if let Some(code) = item_code {
        milestone = milestone.linked_to(context.find_boq_item(code)?.id);
    }
    let milestone = context.engine.add_milestone(milestone)?;
    io::print_success(format!(
        "Milestone {} planned {} to {} ({} days).",
        milestone.name,
        milestone.planned_start,
        milestone.planned_end,
        milestone.planned_days()
    ));
    Ok(())
}

fn handle_list(context: &mut ShellContext) -> CommandResult {
    let project = context.project()?;
    let milestones = context.engine.milestones(project.id)?;
    if milestones.is_empty() {
        io::print_info("No milestones planned.");
        return Ok(());
    }
    let today = context.today();
    let mut table = Table::new(vec![
        ("Name", Alignment::Left),
        ("Start", Alignment::Left),
        ("End", Alignment::Left),
        ("Elapsed", Alignment::Right),
    ]);
    for milestone in milestones {
        table.push(vec![
            milestone.name.clone(),
            milestone.planned_start.to_string(),
            milestone.planned_end.to_string(),
            format!(
                "{}/{} d",
                milestone.elapsed_days(today),
                milestone.planned_days()
            ),
        ]);
    }
    table.print();
    Ok(())
}
