use colored::Colorize;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use worksbill_domain::{StatusTone, StatusVocabulary};

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Section,
}

#[derive(Clone, Copy, Debug)]
pub struct OutputPreferences {
    pub color_enabled: bool,
    /// Suppresses INFO lines; warnings and errors still print.
    pub quiet_mode: bool,
}

impl Default for OutputPreferences {
    fn default() -> Self {
        Self {
            color_enabled: true,
            quiet_mode: false,
        }
    }
}

static PREFERENCES: OnceLock<RwLock<OutputPreferences>> = OnceLock::new();

pub fn set_preferences(prefs: OutputPreferences) {
    let lock = PREFERENCES.get_or_init(|| RwLock::new(OutputPreferences::default()));
    if let Ok(mut guard) = lock.write() {
        *guard = prefs;
    }
    colored::control::set_override(prefs.color_enabled);
}

pub fn preferences() -> OutputPreferences {
    PREFERENCES
        .get_or_init(|| RwLock::new(OutputPreferences::default()))
        .read()
        .map(|guard| *guard)
        .unwrap_or_default()
}

fn label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Info => "INFO",
        MessageKind::Success => "OK",
        MessageKind::Warning => "WARNING",
        MessageKind::Error => "ERROR",
        MessageKind::Section => "",
    }
}

fn apply_style(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    let formatted = match kind {
        MessageKind::Section => format!("=== {} ===", text.trim()),
        _ => format!("{}: {}", label(kind), text),
    };

    match kind {
        MessageKind::Success => formatted.bright_green().to_string(),
        MessageKind::Warning => formatted.bright_yellow().to_string(),
        MessageKind::Error => formatted.bright_red().to_string(),
        MessageKind::Section => formatted.bold().to_string(),
        MessageKind::Info => formatted,
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let prefs = preferences();
    if prefs.quiet_mode && kind == MessageKind::Info {
        return;
    }
    let formatted = apply_style(kind, message);
    match kind {
        MessageKind::Section => println!("\n{}", formatted),
        _ => println!("{}", formatted),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// Status label coloured by its tone.
pub fn status<S: StatusVocabulary>(status: S) -> String {
    let text = status.label();
    match status.tone() {
        StatusTone::Neutral => text.normal().to_string(),
        StatusTone::Pending => text.bright_blue().to_string(),
        StatusTone::Positive => text.bright_green().to_string(),
        StatusTone::Negative => text.bright_red().to_string(),
        StatusTone::Attention => text.bright_yellow().to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}

/// Plain-text table with per-column alignment.
pub struct Table {
    headers: Vec<(&'static str, Alignment)>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<(&'static str, Alignment)>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(idx, (header, _))| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| visible_width(cell))
                    .fold(header.chars().count(), usize::max)
            })
            .collect()
    }

    fn render_row<'a>(&self, cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
        cells
            .zip(self.headers.iter())
            .zip(widths)
            .map(|((cell, (_, alignment)), width)| {
                let pad = width.saturating_sub(visible_width(cell));
                match alignment {
                    Alignment::Left => format!("{cell}{}", " ".repeat(pad)),
                    Alignment::Right => format!("{}{cell}", " ".repeat(pad)),
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(self.render_row(self.headers.iter().map(|(h, _)| *h), &widths));
        lines.push(
            widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("  "),
        );
        for row in &self.rows {
            let cells = (0..self.headers.len()).map(|idx| row.get(idx).map_or("", String::as_str));
            lines.push(self.render_row(cells, &widths));
        }
        lines.join("\n")
    }

    pub fn print(&self) {
        println!("{}", self.render());
    }
}

/// Display width ignoring ANSI colour sequences.
fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for ch in text.chars() {
        match (in_escape, ch) {
            (false, '\u{1b}') => in_escape = true,
            (true, 'm') => in_escape = false,
            (true, _) => {}
            (false, _) => width += 1,
        }
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_aligns_columns() {
        let mut table = Table::new(vec![("Code", Alignment::Left), ("Qty", Alignment::Right)]);
        table.push(vec!["2.1".into(), "1010".into()]);
        table.push(vec!["14.3".into(), "5".into()]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Code   Qty");
        assert_eq!(lines[1], "----  ----");
        assert_eq!(lines[2], "2.1   1010");
        assert_eq!(lines[3], "14.3     5");
    }

    #[test]
    fn escape_sequences_do_not_count_towards_width() {
        assert_eq!(visible_width("\u{1b}[92mPAID\u{1b}[0m"), 4);
    }
}
