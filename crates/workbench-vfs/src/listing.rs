//! Long-format directory listing parser.
//!
//! Parses `ls -la` output as produced inside a container:
//!
//! ```text
//! total 4
//! -rw-r--r-- 1 user user 1024 Jan 01 12:00 file.txt
//! drwxr-xr-x 2 user user 4096 Jan 01 12:00 folder
//! ```
//!
//! The parser is a two-state machine: an optional `total` summary line,
//! then zero or more data lines. The first eight columns are
//! whitespace-separated (permissions, links, owner, group, size, month,
//! day, time-or-year); everything after them is the name, kept verbatim.
//!
//! Tolerance policy: a data line with fewer than [`MIN_FIELDS`] columns
//! is dropped and parsing continues. `.` and `..` are never emitted.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::warn;

use crate::path;
use crate::types::{DirectoryEntry, EntryType, Permissions, sort_entries};

/// Columns a data line needs before it is accepted.
pub const MIN_FIELDS: usize = 9;

/// How one line of input was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Summary,
    SelfOrParent,
    Malformed,
    Entry(RawEntry<'a>),
}

/// The columns of an accepted data line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawEntry<'a> {
    permissions: &'a str,
    size: &'a str,
    month: &'a str,
    day: &'a str,
    time_or_year: &'a str,
    name: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing consumed yet; a summary line is allowed here.
    Start,
    /// Past the first line; only data lines follow.
    Body,
}

/// Parser for long-format listings.
#[derive(Debug, Clone)]
pub struct ListingParser {
    /// Reference time used to infer the year of recent entries.
    now: DateTime<Utc>,
}

impl Default for ListingParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingParser {
    pub fn new() -> Self {
        Self { now: Utc::now() }
    }

    /// Parser with a fixed clock, for deterministic timestamps.
    pub fn with_now(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Parse `output` listed at `base`, returning sorted entries.
    ///
    /// When `ls` is pointed at a single file it echoes the path it was given
    /// as the name; such an entry keeps that path and takes its basename.
    pub fn parse(&self, output: &str, base: &str) -> Vec<DirectoryEntry> {
        let mut state = State::Start;
        let mut entries = Vec::new();

        for (line_no, line) in output.lines().enumerate() {
            let class = classify(line, state);
            if !matches!(class, Line::Blank) {
                state = State::Body;
            }
            match class {
                Line::Blank | Line::Summary | Line::SelfOrParent => {}
                Line::Malformed => {
                    warn!(line_no = line_no + 1, line, "dropping malformed listing line");
                }
                Line::Entry(raw) => entries.push(self.entry(raw, base)),
            }
        }

        sort_entries(&mut entries);
        entries
    }

    fn entry(&self, raw: RawEntry<'_>, base: &str) -> DirectoryEntry {
        let entry_type = if raw.permissions.starts_with('d') {
            EntryType::Folder
        } else {
            EntryType::File
        };

        let mut name = raw.name;
        if raw.permissions.starts_with('l') {
            if let Some((link, _target)) = name.split_once(" -> ") {
                name = link;
            }
        }

        let (name, full_path) = if name.contains('/') {
            let full = path::resolve_lexical(name);
            (path::basename(&full).to_string(), full)
        } else {
            (name.to_string(), path::join(base, name))
        };

        let mut entry = match entry_type {
            EntryType::Folder => DirectoryEntry::folder(name, full_path),
            EntryType::File => {
                DirectoryEntry::file(name, full_path, raw.size.parse().unwrap_or(0))
            }
        };
        if let Some(perms) = Permissions::from_symbolic(raw.permissions) {
            entry = entry.with_permissions(perms);
        }
        if let Some(modified) = self.timestamp(raw.month, raw.day, raw.time_or_year) {
            entry = entry.with_modified(modified);
        }
        entry
    }

    /// `Jan 01 12:00` means this year (or last, if that would be in the
    /// future); `Jan 01 2023` means midnight of that day.
    fn timestamp(&self, month: &str, day: &str, time_or_year: &str) -> Option<DateTime<Utc>> {
        let month = month_number(month)?;
        let day: u32 = day.parse().ok()?;

        if let Some((hh, mm)) = time_or_year.split_once(':') {
            let time = NaiveTime::from_hms_opt(hh.parse().ok()?, mm.parse().ok()?, 0)?;
            let this_year = NaiveDate::from_ymd_opt(self.now.year(), month, day)?.and_time(time);
            let stamp = Utc.from_utc_datetime(&this_year);
            if stamp > self.now + chrono::Duration::days(1) {
                let last_year =
                    NaiveDate::from_ymd_opt(self.now.year() - 1, month, day)?.and_time(time);
                return Some(Utc.from_utc_datetime(&last_year));
            }
            Some(stamp)
        } else {
            let year: i32 = time_or_year.parse().ok()?;
            let date = NaiveDate::from_ymd_opt(year, month, day)?.and_time(NaiveTime::MIN);
            Some(Utc.from_utc_datetime(&date))
        }
    }
}

fn classify(line: &str, state: State) -> Line<'_> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Line::Blank;
    }
    if state == State::Start && line.trim_start().starts_with("total ") {
        return Line::Summary;
    }

    let fields = fields_with_offsets(line);
    if fields.len() < MIN_FIELDS {
        return Line::Malformed;
    }

    let name = &line[fields[MIN_FIELDS - 1].0..];
    if name == "." || name == ".." {
        return Line::SelfOrParent;
    }

    Line::Entry(RawEntry {
        permissions: fields[0].1,
        size: fields[4].1,
        month: fields[5].1,
        day: fields[6].1,
        time_or_year: fields[7].1,
        name,
    })
}

/// Whitespace-separated fields with their byte offsets into `line`.
fn fields_with_offsets(line: &str) -> Vec<(usize, &str)> {
    let mut fields = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                fields.push((s, &line[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        fields.push((s, &line[s..]));
    }
    fields
}

fn month_number(month: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = month.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower)
        .map(|i| i as u32 + 1)
}
