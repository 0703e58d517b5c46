use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::{CommandEntry, CommandRegistry};

const GROUPS: &[(&str, &[&str])] = &[
    ("Books and setup", &["book", "project", "actor", "fund", "boq", "milestone"]),
    ("Measurement and billing", &["exec", "bill", "request"]),
    ("Reports", &["etp", "progress", "variance", "history", "notifications"]),
    ("Shell", &["config", "help", "version", "exit"]),
];

pub fn print_overview(registry: &CommandRegistry) {
    output_section("Available commands");
    let entries = registry.list();
    for (title, names) in GROUPS {
        let members: Vec<&&CommandEntry> = entries
            .iter()
            .filter(|entry| names.contains(&entry.name))
            .collect();
        if members.is_empty() {
            continue;
        }
        io::print_info(format!("{title}:"));
        for entry in members {
            io::print_info(format!("  {:<14} {}", entry.name, entry.description));
        }
    }
    let ungrouped: Vec<&&CommandEntry> = entries
        .iter()
        .filter(|entry| !GROUPS.iter().any(|(_, names)| names.contains(&entry.name)))
        .collect();
    if !ungrouped.is_empty() {
        io::print_info("Other:");
        for entry in ungrouped {
            io::print_info(format!("  {:<14} {}", entry.name, entry.description));
        }
    }
    io::print_info("Use `help <command>` for usage; ids may be shortened to a unique prefix.");
}

pub fn print_command(entry: &CommandEntry) {
    output_section(format!("Help: {}", entry.name));
    io::print_info(format!("  {}", entry.description));
    io::print_info("  Usage:");
    for form in entry.usage_forms() {
        io::print_info(format!("    {form}"));
    }
}
