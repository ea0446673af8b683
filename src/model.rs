use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// Title prefix marking a row as a logged email rather than actual work.
pub const EMAIL_PREFIX: &str = "Email:";

/// How far back the default report window reaches.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// A single task, loaded from one row of the task spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// None when the spreadsheet cell could not be parsed.
    pub due_date: Option<NaiveDateTime>,
    pub assignee: Option<String>,
    pub participants: Option<String>,
}

impl TaskRecord {
    pub fn new(id: i64, title: &str, due_date: Option<NaiveDateTime>) -> Self {
        TaskRecord {
            id,
            title: title.to_string(),
            description: None,
            due_date,
            assignee: None,
            participants: None,
        }
    }

    /// Whether the row logs an email exchange instead of describing a task.
    pub fn is_email_entry(&self) -> bool {
        self.title.starts_with(EMAIL_PREFIX)
    }
}

/// The window of due dates a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Calendar dates, both ends included.
    Range { start: NaiveDate, end: NaiveDate },
    /// One calendar month.
    Month { month: u32, year: i32 },
}

impl Period {
    /// The `lookback` days up to and including `today`.
    pub fn trailing(today: NaiveDate, lookback: Duration) -> Period {
        Period::between(None, None, today, lookback)
    }

    /// A range whose missing bounds fall back to the trailing window:
    /// `today - lookback` for the start, `today` for the end.
    pub fn between(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
        lookback: Duration,
    ) -> Period {
        let start = start.unwrap_or_else(|| {
            today.checked_sub_signed(lookback).unwrap_or(NaiveDate::MIN)
        });
        Period::Range {
            start,
            end: end.unwrap_or(today),
        }
    }

    pub fn contains(&self, due_date: &NaiveDateTime) -> bool {
        match *self {
            Period::Range { start, end } => {
                let day = due_date.date();
                start <= day && day <= end
            }
            Period::Month { month, year } => due_date.month() == month && due_date.year() == year,
        }
    }
}

/// What a report selects and how it renders each task.
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    pub period: Period,
    /// Matched against both the assignee and the participants.
    pub name: Option<String>,
    pub include_description: bool,
    pub exclude_email_entries: bool,
}

impl Criteria {
    /// Criteria for `period` with the report defaults: descriptions shown,
    /// email entries hidden, no name filter.
    pub fn new(period: Period) -> Self {
        Criteria {
            period,
            name: None,
            include_description: true,
            exclude_email_entries: true,
        }
    }

    /// The default report: the last `DEFAULT_LOOKBACK_DAYS` days up to `today`.
    pub fn recent(today: NaiveDate) -> Self {
        Criteria::new(Period::trailing(today, Duration::days(DEFAULT_LOOKBACK_DAYS)))
    }

    /// True when no name filter is active, or when the name appears
    /// (ignoring case) in the assignee or in the participants.
    pub fn matches_name(&self, task: &TaskRecord) -> bool {
        let needle = match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_lowercase(),
            _ => return true,
        };
        contains_ignore_case(task.assignee.as_deref(), &needle)
            || contains_ignore_case(task.participants.as_deref(), &needle)
    }
}

// `needle` is expected to be lowercased already.
fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    match haystack {
        Some(text) => text.to_lowercase().contains(needle),
        None => false,
    }
}
