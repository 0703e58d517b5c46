use rust_decimal::Decimal;
use worksbill_domain::EtpInput;

use crate::cli::core::CommandResult;
use crate::cli::format::{self, short_id};
use crate::cli::io;
use crate::cli::output::{section, Alignment, Table};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

use super::{decimal_or, parse_date, parse_decimal, usage};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "etp",
            "Calculate deductions and net payable without raising a bill",
            "etp <gross> [gst%] [retention%] [other] [advances]",
            cmd_etp,
        ),
        CommandEntry::new(
            "progress",
            "Show value-weighted physical progress of the active project",
            "progress",
            cmd_progress,
        ),
        CommandEntry::new(
            "variance",
            "Compare actual progress with the milestone plan",
            "variance [as-of YYYY-MM-DD]",
            cmd_variance,
        ),
        CommandEntry::new(
            "history",
            "List progress snapshots recorded on each verification",
            "history",
            cmd_history,
        ),
        CommandEntry::new(
            "notifications",
            "Show notifications raised in this session",
            "notifications [clear]",
            cmd_notifications,
        ),
    ]
}

fn cmd_etp(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((gross, rest)) = args.split_first() else {
        return Err(usage("etp <gross> [gst%] [retention%] [other] [advances]"));
    };
    if rest.len() > 4 {
        return Err(usage("etp <gross> [gst%] [retention%] [other] [advances]"));
    }
    let input = EtpInput::new(
        parse_decimal("gross", gross)?,
        decimal_or("gst", rest.first(), context.config.default_gst_percentage)?,
        decimal_or(
            "retention",
            rest.get(1),
            context.config.default_retention_percentage,
        )?,
        decimal_or("other deductions", rest.get(2), Decimal::ZERO)?,
        decimal_or("advances recovery", rest.get(3), Decimal::ZERO)?,
    );
    let summary = context.engine.calculate_etp(&input)?;
    section("Bill calculation");
    super::bill::print_summary(context, &summary);
    Ok(())
}

fn cmd_progress(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let project = context.project()?;
    let report = context.engine.project_progress(project.id)?;
    section(format!(
        "Progress {}: {}",
        project.code,
        format::percent(report.percentage)
    ));
    if report.items.is_empty() {
        io::print_info("No BOQ items yet.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        ("Code", Alignment::Left),
        ("Verified", Alignment::Right),
        ("Sanctioned", Alignment::Right),
        ("Value done", Alignment::Right),
        ("Item %", Alignment::Right),
        ("", Alignment::Left),
    ]);
    for item in &report.items {
        table.push(vec![
            item.code.clone(),
            format::quantity(item.verified_quantity),
            format::quantity(item.sanctioned_quantity),
            context.money(item.verified_value),
            format::percent(item.percentage),
            (if item.overrun { "OVERRUN" } else { "" }).to_string(),
        ]);
    }
    table.print();
    Ok(())
}

fn cmd_variance(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let as_of = match args {
        [] => context.today(),
        [date] => parse_date("as-of", date)?,
        _ => return Err(usage("variance [as-of YYYY-MM-DD]")),
    };
    let project = context.project()?;
    let variance = context.engine.schedule_variance(project.id, as_of)?;
    section(format!("Schedule variance {} as of {}", project.code, as_of));
    io::print_info(format!("  Actual   : {}", format::percent(variance.actual)));
    io::print_info(format!("  Expected : {}", format::percent(variance.expected)));
    let line = format!("  Variance : {}", format::percent(variance.variance));
    if variance.variance < Decimal::ZERO {
        io::print_warning(format!("{} (behind schedule)", line.trim_start()));
    } else {
        io::print_info(line);
    }
    Ok(())
}

fn cmd_history(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let project = context.project()?;
    let snapshots = context.engine.history(project.id)?;
    if snapshots.is_empty() {
        io::print_info("No verifications recorded yet.");
        return Ok(());
    }
    let items = context.engine.boq_items(project.id)?;
    let mut table = Table::new(vec![
        ("#", Alignment::Right),
        ("Recorded", Alignment::Left),
        ("Item", Alignment::Left),
        ("Execution", Alignment::Left),
        ("Progress", Alignment::Right),
    ]);
    for snapshot in snapshots {
        let code = items
            .iter()
            .find(|(item, _)| item.id == snapshot.boq_item_id)
            .map(|(item, _)| item.code.clone())
            .unwrap_or_else(|| short_id(snapshot.boq_item_id));
        table.push(vec![
            snapshot.sequence.to_string(),
            snapshot.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
            code,
            short_id(snapshot.execution_id),
            format::percent(snapshot.percentage),
        ]);
    }
    table.print();
    Ok(())
}

fn cmd_notifications(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let clear = match args {
        [] => false,
        [flag] if flag.eq_ignore_ascii_case("clear") => true,
        _ => return Err(usage("notifications [clear]")),
    };
    let entries = if clear {
        context.notifier.drain()
    } else {
        context.notifier.entries()
    };
    if entries.is_empty() {
        io::print_info("No notifications.");
        return Ok(());
    }
    for entry in &entries {
        io::print_info(format!(
            "[{}] {}: {}",
            entry.at.format("%H:%M:%S"),
            entry.kind,
            entry.message
        ));
    }
    if clear {
        io::print_success(format!("Cleared {} notifications.", entries.len()));
    }
    Ok(())
}
