use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, NaiveDate};
use directories::ProjectDirs;
use log::{debug, info};
use prettytable::Table;
use textwrap::fill;

use crate::cli::{Command, CommandLineArgs, OutputFormat};
use crate::filter;
use crate::loader;
use crate::model::{Criteria, Period, TaskRecord};

/// Column width for descriptions in the table layout.
const DESCRIPTION_WIDTH: usize = 50;

/// The tasks file used when none is given: `tasks.csv` in the platform
/// data directory.
pub fn find_default_tasks_file() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("com", "gozque", "tareas")?;
    let mut path = PathBuf::from(dirs.data_dir());
    path.push("tasks.csv");
    Some(path)
}

/// Turn a report command into filter criteria. Missing range bounds fall
/// back to the lookback window ending `today`.
pub fn criteria(command: &Command, today: NaiveDate) -> Result<Criteria> {
    let period = match *command {
        Command::Range {
            from, to, lookback, ..
        } => {
            let lookback = Duration::from_std(lookback).context("Lookback is too long.")?;
            Period::between(from, to, today, Duration::days(lookback.num_days()))
        }
        Command::Month { month, year, .. } => Period::Month { month, year },
    };

    let options = command.filter_options();
    Ok(Criteria {
        period,
        name: options.name.clone(),
        include_description: !options.no_description,
        exclude_email_entries: !options.include_email,
    })
}

/// Lay the selected tasks out as a table, descriptions wrapped.
pub fn render_table(tasks: &[&TaskRecord], include_description: bool) -> String {
    let mut table = Table::new();

    if include_description {
        table.add_row(row!["id", "task", "due", "assignee", "description"]);
    } else {
        table.add_row(row!["id", "task", "due", "assignee"]);
    }

    for task in tasks {
        let due = task
            .due_date
            .map(|due| due.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_default();
        let assignee = task.assignee.as_deref().unwrap_or("-");

        if include_description {
            let description = task
                .description
                .as_deref()
                .map(|text| fill(text, DESCRIPTION_WIDTH))
                .unwrap_or_default();
            table.add_row(row![task.id, task.title, due, assignee, description]);
        } else {
            table.add_row(row![task.id, task.title, due, assignee]);
        }
    }

    table.to_string()
}

/// Lay out already selected tasks in the requested format.
pub fn build_report(
    selected: &[&TaskRecord],
    include_description: bool,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => filter::render(selected, include_description),
        OutputFormat::Table => render_table(selected, include_description),
    }
}

/// Write the report to a terminal or pipe. Nothing is written for an empty
/// report, and a text report gets its closing newline here.
pub fn write_report<W: Write>(mut out: W, report: &str) -> io::Result<()> {
    if report.is_empty() {
        return Ok(());
    }
    if report.ends_with('\n') {
        write!(out, "{}", report)?;
    } else {
        writeln!(out, "{}", report)?;
    }
    out.flush()
}

/// Load the tasks file, filter it and write the report.
pub fn run(args: CommandLineArgs, today: NaiveDate) -> Result<()> {
    let CommandLineArgs {
        action,
        tasks_file,
        output,
        delimiter,
        format,
        ..
    } = args;

    let tasks_file = tasks_file
        .or_else(find_default_tasks_file)
        .ok_or(anyhow!("Failed to find tasks file."))?;

    let criteria = criteria(&action, today)?;
    debug!("Report criteria: {:?}", criteria);

    let dataset = loader::load_tasks(&tasks_file, delimiter)
        .with_context(|| format!("Failed to load tasks from {}.", tasks_file.display()))?;

    let selected = filter::select(&dataset, &criteria);
    info!("{} of {} tasks match", selected.len(), dataset.len());
    let report = build_report(&selected, criteria.include_description, format);

    match output {
        Some(path) => std::fs::write(&path, &report)
            .with_context(|| format!("Failed to write report to {}.", path.display()))?,
        None => write_report(io::stdout().lock(), &report)
            .context("Failed to write report to standard output.")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::FilterOptions;
    use chrono::NaiveDateTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn due(y: i32, m: u32, d: u32) -> Option<NaiveDateTime> {
        date(y, m, d).and_hms_opt(9, 0, 0)
    }

    fn no_filters() -> FilterOptions {
        FilterOptions {
            name: None,
            no_description: false,
            include_email: false,
        }
    }

    #[test]
    fn range_without_bounds_uses_lookback() {
        let command = Command::Range {
            from: None,
            to: None,
            lookback: std::time::Duration::from_secs(30 * 24 * 60 * 60 + 3600),
            filter: no_filters(),
        };
        let criteria = criteria(&command, date(2024, 6, 12)).unwrap();
        assert_eq!(criteria, Criteria::recent(date(2024, 6, 12)));
    }

    #[test]
    fn month_with_flags() {
        let command = Command::Month {
            month: 3,
            year: 2024,
            filter: FilterOptions {
                name: Some("luis".to_string()),
                no_description: true,
                include_email: true,
            },
        };
        let criteria = criteria(&command, date(2024, 6, 12)).unwrap();
        assert_eq!(criteria.period, Period::Month { month: 3, year: 2024 });
        assert_eq!(criteria.name.as_deref(), Some("luis"));
        assert!(!criteria.include_description);
        assert!(!criteria.exclude_email_entries);
    }

    #[test]
    fn table_lists_selected_tasks() {
        let mut task = TaskRecord::new(1, "Fix bug", due(2024, 3, 5));
        task.assignee = Some("Luis Alvarado".to_string());
        task.description = Some("Crash on save".to_string());
        let other = TaskRecord::new(2, "Deploy", due(2024, 3, 6));

        let table = render_table(&[&task, &other], true);
        assert!(table.contains("description"));
        assert!(table.contains("Fix bug"));
        assert!(table.contains("05/03/2024 09:00"));
        assert!(table.contains("Luis Alvarado"));
        assert!(table.contains("Crash on save"));
        assert!(table.contains("Deploy"));

        let table = render_table(&[&task], false);
        assert!(!table.contains("description"));
        assert!(!table.contains("Crash on save"));
    }

    #[test]
    fn text_and_table_agree_on_selection() {
        let dataset = vec![
            TaskRecord::new(1, "Fix bug", due(2024, 3, 5)),
            TaskRecord::new(2, "Email: reminder", due(2024, 3, 6)),
            TaskRecord::new(3, "Deploy", due(2024, 4, 1)),
        ];
        let criteria = Criteria::new(Period::Month { month: 3, year: 2024 });
        let selected = filter::select(&dataset, &criteria);

        assert_eq!(
            build_report(&selected, true, OutputFormat::Text),
            filter::filter(&dataset, &criteria)
        );
        assert_eq!(build_report(&selected, true, OutputFormat::Text), "#1 - Fix bug");
        let table = build_report(&selected, true, OutputFormat::Table);
        assert!(table.contains("Fix bug"));
        assert!(!table.contains("Email: reminder"));
        assert!(!table.contains("Deploy"));
    }

    /// Stands in for a pipe whose reader has gone away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_report_adds_final_newline() {
        let mut out = Vec::new();
        write_report(&mut out, "#1 - Fix bug").unwrap();
        assert_eq!(out, b"#1 - Fix bug\n");

        let mut out = Vec::new();
        write_report(&mut out, "+---+\n").unwrap();
        assert_eq!(out, b"+---+\n");

        let mut out = Vec::new();
        write_report(&mut out, "").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn write_report_returns_closed_pipe_error() {
        let err = write_report(ClosedPipe, "#1 - Fix bug").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(write_report(ClosedPipe, "").is_ok());
    }
}
