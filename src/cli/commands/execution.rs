use std::collections::HashMap;

use uuid::Uuid;
use worksbill_domain::{Execution, ExecutionDraft, ExecutionStatus};

use crate::cli::core::{CommandError, CommandResult};
use crate::cli::format::{self, short_id};
use crate::cli::io;
use crate::cli::output::{section, status, Alignment, Table};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

use super::{parse_date, parse_decimal, rest_text, unknown_subcommand, usage};

const SUBCOMMANDS: &str = "add, update, submit, verify, reject, revise, delete, list, show";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "exec",
        "Record measured work and move it through verification",
        "exec add <boq-code> <quantity> <date> [from] [to] [remarks] | exec update <id> <quantity> [remarks] | exec <submit|verify|delete|show> <id> | exec reject <id> <reason> | exec revise <id> <note> | exec list [status]",
        cmd_exec,
    )]
}

fn cmd_exec(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((subcommand, rest)) = args.split_first() else {
        return Err(usage("exec <add|update|submit|verify|reject|revise|delete|list|show>"));
    };
    match subcommand.to_ascii_lowercase().as_str() {
        "add" => handle_add(context, rest),
        "update" => handle_update(context, rest),
        "submit" => handle_submit(context, rest),
        "verify" => handle_verify(context, rest),
        "reject" => handle_reject(context, rest),
        "revise" => handle_revise(context, rest),
        "delete" => handle_delete(context, rest),
        "list" => handle_list(context, rest),
        "show" => handle_show(context, rest),
        other => Err(unknown_subcommand("exec", other, SUBCOMMANDS)),
    }
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [code, quantity, date, optional @ ..] = args else {
        return Err(usage("exec add <boq-code> <quantity> <date> [from] [to] [remarks]"));
    };
    let actor = context.actor()?;
    let item = context.find_boq_item(code)?;
    let execution_date = parse_date("date", date)?;
    let (period_from, period_to, remarks) = match optional {
        [] => (execution_date, execution_date, String::new()),
        [from] => (parse_date("from", from)?, execution_date, String::new()),
        [from, to, remarks @ ..] => (
            parse_date("from", from)?,
            parse_date("to", to)?,
            rest_text(remarks),
        ),
    };
    let draft = ExecutionDraft {
        boq_item_id: item.id,
        executed_quantity: parse_decimal("quantity", quantity)?,
        execution_date,
        period_from,
        period_to,
        remarks,
    };
    let execution = context.engine.create_execution(&actor, draft)?;
    io::print_success(format!(
        "Execution {} recorded: {} {} on {} (DRAFT).",
        short_id(execution.id),
        format::quantity(execution.executed_quantity),
        item.unit,
        item.code
    ));
    Ok(())
}

fn handle_update(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [token, quantity, remarks @ ..] = args else {
        return Err(usage("exec update <id> <quantity> [remarks]"));
    };
    let actor = context.actor()?;
    let current = context.find_execution(token)?;
    let mut draft = current.as_draft();
    draft.executed_quantity = parse_decimal("quantity", quantity)?;
    if !remarks.is_empty() {
        draft.remarks = rest_text(remarks);
    }
    let execution = context.engine.update_execution(current.id, &actor, draft)?;
    io::print_success(format!(
        "Execution {} updated to {} ({}).",
        short_id(execution.id),
        format::quantity(execution.executed_quantity),
        execution.status
    ));
    Ok(())
}

fn handle_submit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (actor, current) = actor_and_execution(context, args, "exec submit <id>")?;
    let execution = context.engine.submit_execution(current.id, &actor)?;
    io::print_success(format!("Execution {} submitted.", short_id(execution.id)));
    Ok(())
}

fn handle_verify(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (actor, current) = actor_and_execution(context, args, "exec verify <id>")?;
    let execution = context.engine.verify_execution(current.id, &actor)?;
    let item = context.engine.boq_item(execution.boq_item_id)?;
    io::print_success(format!(
        "Execution {} verified: {} {} added to {}.",
        short_id(execution.id),
        format::quantity(execution.executed_quantity),
        item.unit,
        item.code
    ));
    if let Some(effect) = execution.ledger_effect {
        io::print_info(format!(
            "Running total for {}: {} of {} {}",
            item.code,
            format::quantity(effect.new_total),
            format::quantity(item.sanctioned_quantity),
            item.unit
        ));
        if effect.overrun {
            io::print_warning(format!(
                "OVERRUN: {} exceeds its sanctioned quantity by {} {}.",
                item.code,
                format::quantity(effect.new_total - item.sanctioned_quantity),
                item.unit
            ));
        }
    }
    Ok(())
}

fn handle_reject(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [token, reason @ ..] = args else {
        return Err(usage("exec reject <id> <reason>"));
    };
    let actor = context.actor()?;
    let current = context.find_execution(token)?;
    let execution = context
        .engine
        .reject_execution(current.id, &actor, rest_text(reason))?;
    io::print_success(format!("Execution {} rejected.", short_id(execution.id)));
    Ok(())
}

fn handle_revise(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [token, note @ ..] = args else {
        return Err(usage("exec revise <id> <note>"));
    };
    let actor = context.actor()?;
    let current = context.find_execution(token)?;
    let execution = context
        .engine
        .request_revision(current.id, &actor, rest_text(note))?;
    io::print_success(format!(
        "Revision {} requested on execution {}.",
        execution.revisions.len(),
        short_id(execution.id)
    ));
    Ok(())
}

fn handle_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (actor, current) = actor_and_execution(context, args, "exec delete <id>")?;
    context.engine.delete_execution(current.id, &actor)?;
    io::print_success(format!("Execution {} deleted.", short_id(current.id)));
    Ok(())
}

fn handle_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let wanted = match args {
        [] => None,
        [label] => Some(parse_status(label)?),
        _ => return Err(usage("exec list [status]")),
    };
    let project_id = context.project_id()?;
    let items: HashMap<Uuid, (String, String)> = context
        .engine
        .boq_items(project_id)?
        .into_iter()
        .map(|(item, _)| (item.id, (item.code, item.unit)))
        .collect();
    let executions: Vec<Execution> = context
        .engine
        .executions()?
        .into_iter()
        .filter(|execution| items.contains_key(&execution.boq_item_id))
        .filter(|execution| wanted.map_or(true, |status| execution.status == status))
        .collect();
    if executions.is_empty() {
        io::print_info("No executions to show.");
        return Ok(());
    }

    let mut table = Table::new(vec![
        ("Id", Alignment::Left),
        ("Item", Alignment::Left),
        ("Quantity", Alignment::Right),
        ("Date", Alignment::Left),
        ("Status", Alignment::Left),
    ]);
    for execution in executions {
        let (code, unit) = items
            .get(&execution.boq_item_id)
            .cloned()
            .unwrap_or_default();
        table.push(vec![
            short_id(execution.id),
            code,
            format!("{} {}", format::quantity(execution.executed_quantity), unit),
            execution.execution_date.to_string(),
            status(execution.status),
        ]);
    }
    table.print();
    Ok(())
}

fn handle_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [token] = args else {
        return Err(usage("exec show <id>"));
    };
    let execution = context.find_execution(token)?;
    let item = context.engine.boq_item(execution.boq_item_id)?;
    let actors = context.engine.actors()?;
    let name_of = |id: Uuid| {
        actors
            .iter()
            .find(|actor| actor.id == id)
            .map(|actor| actor.name.clone())
            .unwrap_or_else(|| short_id(id))
    };

    section(format!("Execution {}", short_id(execution.id)));
    io::print_info(format!("  Item       : {} {}", item.code, item.description));
    io::print_info(format!(
        "  Quantity   : {} {}",
        format::quantity(execution.executed_quantity),
        item.unit
    ));
    io::print_info(format!(
        "  Value      : {}",
        context.money(execution.value_at(item.rate))
    ));
    io::print_info(format!("  Executed   : {}", execution.execution_date));
    io::print_info(format!(
        "  Period     : {} to {}",
        execution.period_from, execution.period_to
    ));
    io::print_info(format!("  Status     : {}", status(execution.status)));
    io::print_info(format!("  Recorded by: {}", name_of(execution.submitted_by)));
    if let Some(verifier) = execution.verifier_id {
        io::print_info(format!("  Decided by : {}", name_of(verifier)));
    }
    if let Some(reason) = &execution.rejection_reason {
        io::print_info(format!("  Rejected   : {}", reason));
    }
    if !execution.remarks.is_empty() {
        io::print_info(format!("  Remarks    : {}", execution.remarks));
    }
    for revision in &execution.revisions {
        io::print_info(format!(
            "  Revision {} by {} on {}: {} (was {} {})",
            revision.revision,
            name_of(revision.requested_by),
            revision.requested_at.format("%Y-%m-%d"),
            revision.note,
            format::quantity(revision.executed_quantity),
            item.unit
        ));
    }
    Ok(())
}

fn actor_and_execution(
    context: &ShellContext,
    args: &[&str],
    usage_text: &str,
) -> Result<(worksbill_domain::Actor, Execution), CommandError> {
    let [token] = args else {
        return Err(usage(usage_text));
    };
    let actor = context.actor()?;
    let execution = context.find_execution(token)?;
    Ok((actor, execution))
}

fn parse_status(label: &str) -> Result<ExecutionStatus, CommandError> {
    match label.to_ascii_lowercase().as_str() {
        "draft" => Ok(ExecutionStatus::Draft),
        "submitted" => Ok(ExecutionStatus::Submitted),
        "verified" => Ok(ExecutionStatus::Verified),
        "rejected" => Ok(ExecutionStatus::Rejected),
        "revised" => Ok(ExecutionStatus::Revised),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown execution status `{other}`"
        ))),
    }
}
