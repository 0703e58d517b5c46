use rust_decimal::Decimal;
use worksbill_domain::{BillDraft, BillSummary, EtpInput, GstTreatment, RaBill};

use crate::cli::core::{CommandError, CommandResult};
use crate::cli::format::short_id;
use crate::cli::io;
use crate::cli::output::{section, status, Alignment, Table};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

use super::{decimal_or, parse_decimal, unknown_subcommand, usage};

const AMOUNTS: &str = "<gross|auto> [gst%] [retention%] [other] [advances] [fund-code]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "bill",
        "Raise running-account bills and move them to payment",
        "bill add <number> <gross|auto> [gst%] [retention%] [other] [advances] [fund-code] | bill update <bill> <gross|auto> ... | bill <verify|pay|show> <bill> | bill list | bill suggest",
        cmd_bill,
    )]
}

fn cmd_bill(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((subcommand, rest)) = args.split_first() else {
        return Err(usage("bill <add|update|verify|pay|show|list|suggest>"));
    };
    match subcommand.to_ascii_lowercase().as_str() {
        "add" => handle_add(context, rest),
        "update" => handle_update(context, rest),
        "verify" => handle_verify(context, rest),
        "pay" => handle_pay(context, rest),
        "show" => handle_show(context, rest),
        "list" => handle_list(context),
        "suggest" => handle_suggest(context),
        other => Err(unknown_subcommand(
            "bill",
            other,
            "add, update, verify, pay, show, list, suggest",
        )),
    }
}

/// Parses `<gross|auto> [gst%] [retention%] [other] [advances] [fund-code]`.
///
/// Missing percentages come from configuration; `-` keeps a default in place.
fn parse_amounts(
    context: &ShellContext,
    project_id: uuid::Uuid,
    args: &[&str],
) -> Result<(EtpInput, Option<uuid::Uuid>), CommandError> {
    let Some((gross, rest)) = args.split_first() else {
        return Err(usage(&format!("bill add <number> {AMOUNTS}")));
    };
    if rest.len() > 5 {
        return Err(usage(&format!("bill add <number> {AMOUNTS}")));
    }
    let gross_amount = if gross.eq_ignore_ascii_case("auto") {
        context.engine.suggest_gross(project_id)?
    } else {
        parse_decimal("gross", gross)?
    };
    let input = EtpInput::new(
        gross_amount,
        decimal_or("gst", rest.first(), context.config.default_gst_percentage)?,
        decimal_or(
            "retention",
            rest.get(1),
            context.config.default_retention_percentage,
        )?,
        decimal_or("other deductions", rest.get(2), Decimal::ZERO)?,
        decimal_or("advances recovery", rest.get(3), Decimal::ZERO)?,
    );
    let fund_head_id = match rest.get(4) {
        Some(code) => Some(context.find_fund_head(code)?.id),
        None => None,
    };
    Ok((input, fund_head_id))
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((number, amounts)) = args.split_first() else {
        return Err(usage(&format!("bill add <number> {AMOUNTS}")));
    };
    let actor = context.actor()?;
    let project = context.project()?;
    let (input, fund_head_id) = parse_amounts(context, project.id, amounts)?;
    let bill = context.engine.create_bill(
        project.id,
        &actor,
        BillDraft {
            bill_number: number.to_string(),
            fund_head_id,
            input,
        },
    )?;
    io::print_success(format!(
        "Bill {} created for {} (DRAFT).",
        bill.bill_number, project.code
    ));
    print_summary(context, &bill.summary);
    Ok(())
}

fn handle_update(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((token, amounts)) = args.split_first() else {
        return Err(usage(&format!("bill update <bill> {AMOUNTS}")));
    };
    let actor = context.actor()?;
    let current = context.find_bill(token)?;
    let (input, fund_head_id) = parse_amounts(context, current.project_id, amounts)?;
    let bill = context.engine.update_bill(
        current.id,
        &actor,
        BillDraft {
            bill_number: current.bill_number.clone(),
            fund_head_id: fund_head_id.or(current.fund_head_id),
            input,
        },
    )?;
    io::print_success(format!("Bill {} updated.", bill.bill_number));
    print_summary(context, &bill.summary);
    Ok(())
}

fn handle_verify(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [token] = args else {
        return Err(usage("bill verify <bill>"));
    };
    let actor = context.actor()?;
    let current = context.find_bill(token)?;
    let bill = context.engine.verify_bill(current.id, &actor)?;
    io::print_success(format!("Bill {} verified.", bill.bill_number));
    Ok(())
}

fn handle_pay(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [token] = args else {
        return Err(usage("bill pay <bill>"));
    };
    let actor = context.actor()?;
    let current = context.find_bill(token)?;
    let bill = context.engine.pay_bill(current.id, &actor)?;
    io::print_success(format!(
        "Bill {} paid: {} released.",
        bill.bill_number,
        context.money(bill.summary.net_payable)
    ));
    Ok(())
}

fn handle_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [token] = args else {
        return Err(usage("bill show <bill>"));
    };
    let bill = context.find_bill(token)?;
    print_bill(context, &bill)
}

fn handle_list(context: &mut ShellContext) -> CommandResult {
    let project = context.project()?;
    let bills = context.engine.bills(project.id)?;
    if bills.is_empty() {
        io::print_info("No bills raised yet.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        ("Bill", Alignment::Left),
        ("Id", Alignment::Left),
        ("Gross", Alignment::Right),
        ("Net payable", Alignment::Right),
        ("Status", Alignment::Left),
    ]);
    for bill in bills {
        table.push(vec![
            bill.bill_number.clone(),
            short_id(bill.id),
            context.money(bill.summary.gross_amount),
            context.money(bill.summary.net_payable),
            status(bill.status),
        ]);
    }
    table.print();
    Ok(())
}

fn handle_suggest(context: &mut ShellContext) -> CommandResult {
    let project = context.project()?;
    let gross = context.engine.suggest_gross(project.id)?;
    io::print_info(format!(
        "Work verified since the last bill on {}: {}",
        project.code,
        context.money(gross)
    ));
    Ok(())
}

fn print_bill(context: &ShellContext, bill: &RaBill) -> CommandResult {
    section(format!("RA bill {}", bill.bill_number));
    io::print_info(format!("  Id         : {}", short_id(bill.id)));
    io::print_info(format!("  Status     : {}", status(bill.status)));
    if let Some(fund_id) = bill.fund_head_id {
        let code = context
            .engine
            .fund_heads()?
            .into_iter()
            .find(|fund| fund.id == fund_id)
            .map(|fund| fund.code)
            .unwrap_or_else(|| short_id(fund_id));
        io::print_info(format!("  Fund head  : {}", code));
    }
    io::print_info(format!("  Raised     : {}", bill.created_at.format("%Y-%m-%d")));
    if let Some(at) = bill.verified_at {
        io::print_info(format!("  Verified   : {}", at.format("%Y-%m-%d")));
    }
    if let Some(at) = bill.paid_at {
        io::print_info(format!("  Paid       : {}", at.format("%Y-%m-%d")));
    }
    print_summary(context, &bill.summary);
    Ok(())
}

/// Deduction breakdown shared by `bill` and `etp`.
pub(crate) fn print_summary(context: &ShellContext, summary: &BillSummary) {
    let gst_note = match summary.gst_treatment {
        GstTreatment::Informational => " (informational)",
        GstTreatment::Withheld => " (withheld)",
    };
    io::print_info(format!("  Gross amount       : {}", context.money(summary.gross_amount)));
    io::print_info(format!("  Retention          : {}", context.money(summary.retention_amount)));
    io::print_info(format!(
        "  GST{:<16}: {}",
        gst_note,
        context.money(summary.gst_amount)
    ));
    io::print_info(format!("  Other deductions   : {}", context.money(summary.other_deductions)));
    io::print_info(format!("  Advances recovered : {}", context.money(summary.advances_recovery)));
    io::print_info(format!("  Total deductions   : {}", context.money(summary.total_deductions)));
    io::print_info(format!("  Net payable        : {}", context.money(summary.net_payable)));
    if summary.over_recovery {
        io::print_warning("Deductions exceed the gross amount; net payable is negative.");
    }
}
