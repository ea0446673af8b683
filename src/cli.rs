use chrono::NaiveDate;
use humantime::parse_duration;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use structopt::StructOpt;

/// Filters shared by every report command.
#[derive(Debug, StructOpt)]
pub struct FilterOptions {
    /// Only tasks whose assignee or participants contain this name (ignoring case).
    #[structopt(short, long)]
    pub name: Option<String>,

    /// Leave task descriptions out of the report.
    #[structopt(long)]
    pub no_description: bool,

    /// Keep tasks whose title starts with "Email:".
    #[structopt(long)]
    pub include_email: bool,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Report tasks due between two dates, both included.
    Range {
        /// First day (YYYY-MM-DD). Defaults to today minus the lookback.
        #[structopt(long, parse(try_from_str = parse_date))]
        from: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD). Defaults to today.
        #[structopt(long, parse(try_from_str = parse_date))]
        to: Option<NaiveDate>,

        /// How far back the default first day is (parse_duration, whole days)
        #[structopt(long, default_value = "30days", parse(try_from_str = parse_duration))]
        lookback: Duration,

        #[structopt(flatten)]
        filter: FilterOptions,
    },
    /// Report tasks due in one calendar month.
    Month {
        /// Month number, 1 to 12.
        #[structopt(parse(try_from_str = parse_month))]
        month: u32,

        year: i32,

        #[structopt(flatten)]
        filter: FilterOptions,
    },
}

impl Command {
    pub fn filter_options(&self) -> &FilterOptions {
        match self {
            Command::Range { filter, .. } => filter,
            Command::Month { filter, .. } => filter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Table,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "table" => Ok(OutputFormat::Table),
            other => Err(format!("unknown format '{}'", other)),
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "tareas",
    about = "Filtered reports from a team task spreadsheet."
)]
pub struct CommandLineArgs {
    #[structopt(subcommand)]
    pub action: Command,

    /// Use a different tasks file: an .xlsx, .xls or .ods workbook, or CSV.
    #[structopt(parse(from_os_str), short = "f", long)]
    pub tasks_file: Option<PathBuf>,

    /// Write the report to this file instead of standard output.
    #[structopt(parse(from_os_str), short, long)]
    pub output: Option<PathBuf>,

    /// Field separator when the tasks file is delimited text.
    #[structopt(short, long, default_value = ",", parse(try_from_str = parse_delimiter))]
    pub delimiter: u8,

    /// Report layout.
    #[structopt(long, default_value = "text", possible_values = &["text", "table"])]
    pub format: OutputFormat,

    /// Log more (-v info, -vv debug, -vvv trace).
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: u8,
}

fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
}

fn parse_month(s: &str) -> Result<u32, String> {
    match s.parse::<u32>() {
        Ok(month) if (1..=12).contains(&month) => Ok(month),
        _ => Err(format!("'{}' is not a month between 1 and 12", s)),
    }
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "tab" | "\\t" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(format!("'{}' is not a single ASCII character", s)),
    }
}
