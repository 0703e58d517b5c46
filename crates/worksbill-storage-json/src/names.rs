//! File names for stored books and their backups.
//!
//! A backup is called `<slug>_<yyyymmdd>_<hhmmss>[_<n>][_<note>].json`, where
//! `<n>` separates backups taken within the same second.

use std::{fmt, path::Path};

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

pub(crate) const EXTENSION: &str = "json";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Lowercase file-safe slug for a book name; every other character becomes `-`.
///
/// Names with nothing usable in them map to `book`.
pub fn canonical_name(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    if slug.chars().all(|ch| ch == '-') {
        "book".to_string()
    } else {
        slug
    }
}

/// Label used in a backup file name: alphanumeric words joined by `-`.
pub(crate) fn note_label(note: &str) -> Option<String> {
    let words: Vec<String> = note
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    (!words.is_empty()).then(|| words.join("-"))
}

/// Parsed form of a backup file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BackupName {
    pub book: String,
    pub taken_at: NaiveDateTime,
    pub sequence: u32,
    pub note: Option<String>,
}

impl BackupName {
    pub fn new(book: &str, taken_at: DateTime<Utc>, note: Option<&str>) -> Self {
        Self {
            book: canonical_name(book),
            // The name only carries whole seconds.
            taken_at: taken_at
                .naive_utc()
                .with_nanosecond(0)
                .unwrap_or_else(|| taken_at.naive_utc()),
            sequence: 0,
            note: note.and_then(note_label),
        }
    }

    /// First name in the sequence for this second that is free in `dir`.
    pub fn vacant_in(mut self, dir: &Path) -> Self {
        while dir.join(self.to_string()).exists() {
            self.sequence += 1;
        }
        self
    }

    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(&format!(".{EXTENSION}"))?;
        let mut parts = stem.splitn(4, '_');
        let book = parts.next()?.to_string();
        let date = parts.next()?;
        let time = parts.next()?;
        let taken_at =
            NaiveDateTime::parse_from_str(&format!("{date}_{time}"), STAMP_FORMAT).ok()?;

        let (sequence, note) = match parts.next() {
            None => (0, None),
            Some(rest) => match rest.split_once('_') {
                Some((seq, note)) if is_sequence(seq) => (seq.parse().ok()?, Some(note)),
                None if is_sequence(rest) => (rest.parse().ok()?, None),
                _ => (0, Some(rest)),
            },
        };
        Some(Self {
            book,
            taken_at,
            sequence,
            note: note.map(str::to_string),
        })
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.taken_at, Utc)
    }

    /// Sort key; larger is newer.
    pub fn age_key(&self) -> (NaiveDateTime, u32) {
        (self.taken_at, self.sequence)
    }
}

impl fmt::Display for BackupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.book, self.taken_at.format(STAMP_FORMAT))?;
        if self.sequence > 0 {
            write!(f, "_{}", self.sequence)?;
        }
        if let Some(note) = &self.note {
            write!(f, "_{note}")?;
        }
        write!(f, ".{EXTENSION}")
    }
}

fn is_sequence(part: &str) -> bool {
    !part.is_empty() && part.len() <= 4 && part.chars().all(|ch| ch.is_ascii_digit())
}
