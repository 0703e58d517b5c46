use worksbill_domain::BoqItem;

use crate::cli::core::CommandResult;
use crate::cli::format;
use crate::cli::io;
use crate::cli::output::{section, Alignment, Table};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

use super::{parse_decimal, unknown_subcommand, usage};

const ADD_USAGE: &str = "boq add <code> <unit> <quantity> <rate> <description> [fund-code]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "boq",
        "Maintain the bill of quantities of the active project",
        "boq add <code> <unit> <quantity> <rate> <description> [fund-code] | boq revise <code> <quantity> [rate] | boq list | boq show <code>",
        cmd_boq,
    )]
}

fn cmd_boq(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((subcommand, rest)) = args.split_first() else {
        return Err(usage("boq <add|revise|list|show>"));
    };
    match subcommand.to_ascii_lowercase().as_str() {
        "add" => handle_add(context, rest),
        "revise" => handle_revise(context, rest),
        "list" => handle_list(context),
        "show" => handle_show(context, rest),
        other => Err(unknown_subcommand("boq", other, "add, revise, list, show")),
    }
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (code, unit, quantity, rate, description, fund_code) = match args {
        [code, unit, quantity, rate, description] => {
            (code, unit, quantity, rate, description, None)
        }
        [code, unit, quantity, rate, description, fund] => {
            (code, unit, quantity, rate, description, Some(fund))
        }
        _ => return Err(usage(ADD_USAGE)),
    };
    let project = context.project()?;
    let mut item = BoqItem::new(
        project.id,
        *code,
        *description,
        *unit,
        parse_decimal("quantity", quantity)?,
        parse_decimal("rate", rate)?,
    );
    if let Some(fund_code) = fund_code {
        item = item.with_fund_head(context.find_fund_head(fund_code)?.id);
    }
    let item = context.engine.add_boq_item(item)?;
    io::print_success(format!(
        "BOQ item {} added: {} {} at {} ({}).",
        item.code,
        format::quantity(item.sanctioned_quantity),
        item.unit,
        context.money(item.rate),
        context.money(item.sanctioned_value())
    ));
    Ok(())
}

fn handle_revise(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (code, quantity, rate) = match args {
        [code, quantity] => (code, quantity, None),
        [code, quantity, rate] => (code, quantity, Some(rate)),
        _ => return Err(usage("boq revise <code> <quantity> [rate]")),
    };
    let mut item = context.find_boq_item(code)?;
    item.sanctioned_quantity = parse_decimal("quantity", quantity)?;
    if let Some(rate) = rate {
        item.rate = parse_decimal("rate", rate)?;
    }
    let item = context.engine.revise_boq_item(item)?;
    let verified = context.engine.verified_quantity(item.id)?;
    io::print_success(format!(
        "BOQ item {} now sanctions {} {} at {}.",
        item.code,
        format::quantity(item.sanctioned_quantity),
        item.unit,
        context.money(item.rate)
    ));
    if item.is_overrun(verified) {
        io::print_warning(format!(
            "Verified quantity {} already exceeds the revised sanction.",
            format::quantity(verified)
        ));
    }
    Ok(())
}

fn handle_list(context: &mut ShellContext) -> CommandResult {
    let project = context.project()?;
    let rows = context.engine.boq_items(project.id)?;
    if rows.is_empty() {
        io::print_info("No BOQ items yet.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        ("Code", Alignment::Left),
        ("Description", Alignment::Left),
        ("Unit", Alignment::Left),
        ("Sanctioned", Alignment::Right),
        ("Verified", Alignment::Right),
        ("Rate", Alignment::Right),
        ("", Alignment::Left),
    ]);
    for (item, verified) in rows {
        let flag = if item.is_overrun(verified) {
            "OVERRUN"
        } else {
            ""
        };
        table.push(vec![
            item.code.clone(),
            item.description.clone(),
            item.unit.clone(),
            format::quantity(item.sanctioned_quantity),
            format::quantity(verified),
            context.money(item.rate),
            flag.to_string(),
        ]);
    }
    table.print();
    Ok(())
}

fn handle_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [code] = args else {
        return Err(usage("boq show <code>"));
    };
    let item = context.find_boq_item(code)?;
    let verified = context.engine.verified_quantity(item.id)?;
    section(format!("BOQ {} {}", item.code, item.description));
    io::print_info(format!(
        "  Sanctioned : {} {}",
        format::quantity(item.sanctioned_quantity),
        item.unit
    ));
    io::print_info(format!("  Rate       : {}", context.money(item.rate)));
    io::print_info(format!("  Value      : {}", context.money(item.sanctioned_value())));
    io::print_info(format!(
        "  Verified   : {} {}",
        format::quantity(verified),
        item.unit
    ));
    if let Some(fund_id) = item.fund_head_id {
        if let Some(fund) = context
            .engine
            .fund_heads()?
            .into_iter()
            .find(|fund| fund.id == fund_id)
        {
            io::print_info(format!("  Fund head  : {}", fund.code));
        }
    }
    if item.is_overrun(verified) {
        io::print_warning(format!(
            "Overrun by {} {}.",
            format::quantity(verified - item.sanctioned_quantity),
            item.unit
        ));
    }
    Ok(())
}
