use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use log::{debug, info, warn};
use thiserror::Error;

use crate::model::TaskRecord;

/// Day-first timestamps, as the spreadsheet exports them.
pub const DUE_DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Extensions read as workbooks; anything else is read as delimited text.
const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

const ID_COLUMN: &str = "ID";
const TITLE_COLUMN: &str = "Tarea";
const DESCRIPTION_COLUMN: &str = "Descripción";
const DUE_DATE_COLUMN: &str = "Fecha límite";
const ASSIGNEE_COLUMNS: [&str; 2] = ["Responsable", "Persona responsable"];
const PARTICIPANTS_COLUMN: &str = "Participantes";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to open tasks file: {0}")]
    Io(#[source] std::io::Error),

    #[error("Failed to read tasks spreadsheet: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read tasks workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Tasks workbook has no worksheets")]
    NoWorksheet,

    #[error("Tasks spreadsheet has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("Line {line}: '{value}' is not a valid task id")]
    InvalidId { line: u64, value: String },

    #[error("Line {line}: task id {id} appears more than once")]
    DuplicateId { line: u64, id: i64 },

    #[error(
        "No 'Fecha límite' value could be read (line {line}: '{value}'); \
         expected DD/MM/YYYY HH:MM:SS"
    )]
    DueDateFormat { line: u64, value: String },
}

/// Where each field lives in a row. Optional columns may be missing from
/// the sheet altogether, in which case the field is null for every task.
#[derive(Debug)]
struct Columns {
    id: usize,
    title: usize,
    due_date: usize,
    description: Option<usize>,
    assignee: Option<usize>,
    participants: Option<usize>,
}

impl Columns {
    fn from_headers<S: AsRef<str>>(headers: &[S]) -> Result<Columns, LoadError> {
        let required = |name: &'static str| {
            find_column(headers, &[name]).ok_or(LoadError::MissingColumn(name))
        };

        Ok(Columns {
            id: required(ID_COLUMN)?,
            title: required(TITLE_COLUMN)?,
            due_date: required(DUE_DATE_COLUMN)?,
            description: find_column(headers, &[DESCRIPTION_COLUMN]),
            assignee: find_column(headers, &ASSIGNEE_COLUMNS),
            participants: find_column(headers, &[PARTICIPANTS_COLUMN]),
        })
    }
}

/// Headers are compared ignoring case and surrounding whitespace, and the
/// first header matching any of `names` wins.
fn find_column<S: AsRef<str>>(headers: &[S], names: &[&str]) -> Option<usize> {
    let wanted: Vec<String> = names.iter().map(|name| name.to_lowercase()).collect();
    headers.iter().position(|header| {
        let header = header
            .as_ref()
            .trim_start_matches('\u{feff}')
            .trim()
            .to_lowercase();
        wanted.contains(&header)
    })
}

fn cell<S: AsRef<str>>(row: &[S], index: usize) -> &str {
    row.get(index).map(AsRef::as_ref).unwrap_or("")
}

fn optional_cell<S: AsRef<str>>(row: &[S], index: Option<usize>) -> Option<String> {
    index
        .map(|index| cell(row, index))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Turns rows, whatever file they came from, into tasks.
struct TaskBuilder {
    columns: Columns,
    seen: HashSet<i64>,
    tasks: Vec<TaskRecord>,
    first_bad_date: Option<(u64, String)>,
}

impl TaskBuilder {
    fn new(columns: Columns) -> Self {
        debug!("Column layout: {:?}", columns);
        TaskBuilder {
            columns,
            seen: HashSet::new(),
            tasks: Vec::new(),
            first_bad_date: None,
        }
    }

    fn push_row<S: AsRef<str>>(&mut self, line: u64, row: &[S]) -> Result<(), LoadError> {
        let raw_id = cell(row, self.columns.id).trim();
        let id = raw_id.parse::<i64>().map_err(|_| LoadError::InvalidId {
            line,
            value: raw_id.to_string(),
        })?;
        if !self.seen.insert(id) {
            return Err(LoadError::DuplicateId { line, id });
        }

        let due_date = self.parse_due_date(cell(row, self.columns.due_date), line);
        self.tasks.push(TaskRecord {
            id,
            title: cell(row, self.columns.title).to_string(),
            description: optional_cell(row, self.columns.description),
            due_date,
            assignee: optional_cell(row, self.columns.assignee),
            participants: optional_cell(row, self.columns.participants),
        });
        Ok(())
    }

    /// An unusable date only costs the task its place in date filtering, so
    /// it is logged rather than reported.
    fn parse_due_date(&mut self, value: &str, line: u64) -> Option<NaiveDateTime> {
        let value = value.trim();
        if value.is_empty() {
            debug!("Line {}: no due date", line);
            return None;
        }
        match NaiveDateTime::parse_from_str(value, DUE_DATE_FORMAT) {
            Ok(due_date) => Some(due_date),
            Err(err) => {
                warn!("Line {}: ignoring due date '{}' ({})", line, value, err);
                if self.first_bad_date.is_none() {
                    self.first_bad_date = Some((line, value.to_string()));
                }
                None
            }
        }
    }

    /// Fails when due dates were written but not a single one could be
    /// read: the whole column is in some other format.
    fn finish(self) -> Result<Vec<TaskRecord>, LoadError> {
        let any_dated = self.tasks.iter().any(|task| task.due_date.is_some());
        match self.first_bad_date {
            Some((line, value)) if !any_dated => Err(LoadError::DueDateFormat { line, value }),
            _ => Ok(self.tasks),
        }
    }
}

/// Load every task from delimited text with a header row.
pub fn load_from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Vec<TaskRecord>, LoadError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let headers: Vec<&str> = headers.iter().collect();
    let mut builder = TaskBuilder::new(Columns::from_headers(&headers)?);

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let row: Vec<&str> = record.iter().collect();
        builder.push_row(line, &row)?;
    }

    builder.finish()
}

/// Text of a workbook cell. Date cells are written in `DUE_DATE_FORMAT` so
/// they read back like the text export.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(datetime) => datetime.format(DUE_DATE_FORMAT).to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

/// Load every task from the first worksheet of an Excel or OpenDocument
/// workbook. The first row holds the headers.
pub fn load_from_workbook<R>(reader: R) -> Result<Vec<TaskRecord>, LoadError>
where
    R: Read + Seek + Clone,
{
    let mut workbook = open_workbook_auto_from_rs(reader)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(LoadError::NoWorksheet)??;

    // Lines are counted from the top of the sheet, as a spreadsheet shows them.
    let header_line = range.start().map_or(1, |(row, _)| u64::from(row) + 1);
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(cell_text).collect(),
        None => Vec::new(),
    };
    let mut builder = TaskBuilder::new(Columns::from_headers(&headers)?);

    for (offset, row) in rows.enumerate() {
        let row: Vec<String> = row.iter().map(cell_text).collect();
        if row.iter().all(|value| value.is_empty()) {
            continue;
        }
        builder.push_row(header_line + 1 + offset as u64, &row)?;
    }

    builder.finish()
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| WORKBOOK_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Load the task spreadsheet stored at `path`: a workbook when the extension
/// says so, delimited text otherwise. `delimiter` only applies to text.
pub fn load_tasks(path: &Path, delimiter: u8) -> Result<Vec<TaskRecord>, LoadError> {
    let tasks = if is_workbook(path) {
        let bytes = std::fs::read(path).map_err(LoadError::Io)?;
        load_from_workbook(Cursor::new(bytes))?
    } else {
        let file = File::open(path).map_err(LoadError::Io)?;
        load_from_reader(file, delimiter)?
    };
    info!("Loaded {} tasks from {}", tasks.len(), path.display());
    Ok(tasks)
}
