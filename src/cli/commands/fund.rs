use worksbill_domain::BudgetLineItem;

use crate::cli::core::CommandResult;
use crate::cli::io;
use crate::cli::output::{Alignment, Table};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

use super::{parse_decimal, unknown_subcommand, usage};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "fund",
        "Manage fund heads and project allocations",
        "fund add <code> <name> | fund list | fund allocate <code> <fiscal-year> <amount> | fund headroom <code>",
        cmd_fund,
    )]
}

fn cmd_fund(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((subcommand, rest)) = args.split_first() else {
        return Err(usage("fund <add|list|allocate|headroom>"));
    };
    match subcommand.to_ascii_lowercase().as_str() {
        "add" => handle_add(context, rest),
        "list" => handle_list(context),
        "allocate" => handle_allocate(context, rest),
        "headroom" => handle_headroom(context, rest),
        other => Err(unknown_subcommand(
            "fund",
            other,
            "add, list, allocate, headroom",
        )),
    }
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [code, name @ ..] = args else {
        return Err(usage("fund add <code> <name>"));
    };
    if name.is_empty() {
        return Err(usage("fund add <code> <name>"));
    }
    let fund = context.engine.add_fund_head(*code, name.join(" "))?;
    io::print_success(format!("Fund head {} ({}) added.", fund.code, fund.name));
    Ok(())
}

fn handle_list(context: &mut ShellContext) -> CommandResult {
    let funds = context.engine.fund_heads()?;
    if funds.is_empty() {
        io::print_info("No fund heads yet.");
        return Ok(());
    }
    let lines = match context.current_project {
        Some(project_id) => context.engine.budget_lines(project_id)?,
        None => Vec::new(),
    };
    let mut table = Table::new(vec![
        ("Code", Alignment::Left),
        ("Name", Alignment::Left),
        ("Allocated", Alignment::Right),
    ]);
    for fund in funds {
        let allocated = lines
            .iter()
            .filter(|line| line.fund_head_id == fund.id)
            .map(|line| line.allocated_amount)
            .sum();
        table.push(vec![fund.code, fund.name, context.money(allocated)]);
    }
    table.print();
    Ok(())
}

fn handle_allocate(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [code, fiscal_year, amount] = args else {
        return Err(usage("fund allocate <code> <fiscal-year> <amount>"));
    };
    let project = context.project()?;
    let fund = context.find_fund_head(code)?;
    let amount = parse_decimal("amount", amount)?;
    let line = context.engine.allocate(BudgetLineItem::new(
        fund.id,
        project.id,
        *fiscal_year,
        amount,
    ))?;
    io::print_success(format!(
        "Allocated {} from {} to {} for FY {}.",
        context.money(line.allocated_amount),
        fund.code,
        project.code,
        line.fiscal_year
    ));
    Ok(())
}

fn handle_headroom(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [code] = args else {
        return Err(usage("fund headroom <code>"));
    };
    let project = context.project()?;
    let fund = context.find_fund_head(code)?;
    let headroom = context.engine.allocation_headroom(fund.id, project.id)?;
    io::print_info(format!(
        "Headroom on {} for {}: {}",
        fund.code,
        project.code,
        context.money(headroom)
    ));
    Ok(())
}
