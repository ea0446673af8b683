use crate::model::{Criteria, TaskRecord};

/// Return the tasks matching `criteria`, ordered by due date. Tasks with the
/// same due date keep their order in `dataset`.
pub fn select<'a>(dataset: &'a [TaskRecord], criteria: &Criteria) -> Vec<&'a TaskRecord> {
    let mut selected: Vec<&TaskRecord> = dataset
        .iter()
        .filter(|task| match &task.due_date {
            Some(due_date) => criteria.period.contains(due_date),
            None => false,
        })
        .filter(|task| criteria.matches_name(task))
        .filter(|task| !(criteria.exclude_email_entries && task.is_email_entry()))
        .collect();

    // sort_by_key is stable
    selected.sort_by_key(|task| task.due_date);
    selected
}

/// Render one task as a report line: `#<id> - <title>`, followed by
/// `: <description>` when asked for and present.
pub fn render_line(task: &TaskRecord, include_description: bool) -> String {
    match &task.description {
        Some(description) if include_description => {
            format!("#{} - {}: {}", task.id, task.title, description)
        }
        _ => format!("#{} - {}", task.id, task.title),
    }
}

/// Join already selected tasks into report lines, no trailing newline.
pub fn render(tasks: &[&TaskRecord], include_description: bool) -> String {
    tasks
        .iter()
        .map(|task| render_line(task, include_description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the text report: one line per matching task, no trailing newline.
/// An empty selection gives an empty string.
pub fn filter(dataset: &[TaskRecord], criteria: &Criteria) -> String {
    render(&select(dataset, criteria), criteria.include_description)
}
