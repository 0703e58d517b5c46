use worksbill_domain::{ApprovalRequest, ApprovalStatus, ApprovalSubject};

use crate::cli::core::{CommandError, CommandResult};
use crate::cli::format::short_id;
use crate::cli::io;
use crate::cli::output::{status, Alignment, Table};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

use super::{rest_text, unknown_subcommand, usage};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "request",
        "Open and decide approval requests",
        "request open <bill|overrun|budget|other> <ref> [notes] | request <approve|reject> <id> [notes] | request list [pending]",
        cmd_request,
    )]
}

fn cmd_request(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((subcommand, rest)) = args.split_first() else {
        return Err(usage("request <open|approve|reject|list>"));
    };
    match subcommand.to_ascii_lowercase().as_str() {
        "open" => handle_open(context, rest),
        "approve" => handle_decide(context, rest, true),
        "reject" => handle_decide(context, rest, false),
        "list" => handle_list(context, rest),
        other => Err(unknown_subcommand(
            "request",
            other,
            "open, approve, reject, list",
        )),
    }
}

fn handle_open(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [kind, reference, notes @ ..] = args else {
        return Err(usage(
            "request open <bill|overrun|budget|other> <ref> [notes]",
        ));
    };
    let actor = context.actor()?;
    let subject = match kind.to_ascii_lowercase().as_str() {
        "bill" => ApprovalSubject::Bill(context.find_bill(reference)?.id),
        "overrun" => ApprovalSubject::QuantityOverrun(context.find_boq_item(reference)?.id),
        "budget" => ApprovalSubject::BudgetChange(context.find_fund_head(reference)?.id),
        "other" => ApprovalSubject::Other(reference.to_string()),
        other => {
            return Err(CommandError::InvalidArguments(format!(
                "unknown request subject `{other}`. Available: bill, overrun, budget, other"
            )))
        }
    };
    let request = context
        .engine
        .open_request(subject, rest_text(notes), &actor)?;
    io::print_success(format!(
        "Request {} opened for {}.",
        short_id(request.id),
        describe_subject(context, &request.subject)
    ));
    Ok(())
}

fn handle_decide(context: &mut ShellContext, args: &[&str], approve: bool) -> CommandResult {
    let [token, notes @ ..] = args else {
        return Err(usage("request <approve|reject> <id> [notes]"));
    };
    let actor = context.actor()?;
    let current = context.find_request(token)?;
    let request = if approve {
        context
            .engine
            .approve_request(current.id, &actor, rest_text(notes))?
    } else {
        context
            .engine
            .reject_request(current.id, &actor, rest_text(notes))?
    };
    io::print_success(format!(
        "Request {} {}.",
        short_id(request.id),
        request.status
    ));
    Ok(())
}

fn handle_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let pending_only = match args {
        [] => false,
        [filter] if filter.eq_ignore_ascii_case("pending") => true,
        _ => return Err(usage("request list [pending]")),
    };
    let requests: Vec<ApprovalRequest> = context
        .engine
        .requests()?
        .into_iter()
        .filter(|request| !pending_only || request.status == ApprovalStatus::Pending)
        .collect();
    if requests.is_empty() {
        io::print_info("No approval requests.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        ("Id", Alignment::Left),
        ("Subject", Alignment::Left),
        ("Notes", Alignment::Left),
        ("Status", Alignment::Left),
    ]);
    for request in requests {
        table.push(vec![
            short_id(request.id),
            describe_subject(context, &request.subject),
            request.notes.clone(),
            status(request.status),
        ]);
    }
    table.print();
    Ok(())
}

/// Human label for a request subject, using codes and bill numbers where they resolve.
fn describe_subject(context: &ShellContext, subject: &ApprovalSubject) -> String {
    match subject {
        ApprovalSubject::Bill(id) => context
            .engine
            .bill(*id)
            .map(|bill| format!("bill {}", bill.bill_number))
            .unwrap_or_else(|_| subject.to_string()),
        ApprovalSubject::QuantityOverrun(id) => context
            .engine
            .boq_item(*id)
            .map(|item| format!("overrun on {}", item.code))
            .unwrap_or_else(|_| subject.to_string()),
        ApprovalSubject::BudgetChange(id) => context
            .engine
            .fund_heads()
            .ok()
            .and_then(|funds| funds.into_iter().find(|fund| fund.id == *id))
            .map(|fund| format!("budget change on {}", fund.code))
            .unwrap_or_else(|| subject.to_string()),
        ApprovalSubject::Other(reference) => reference.clone(),
    }
}
