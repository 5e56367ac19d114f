use colored::Colorize;
use serde::Serialize;

use crate::error::Result;
use crate::model::{Status, Task};

/// One element of the `ls --json` array. Field names and order are part of
/// the CLI contract.
#[derive(Debug, Serialize)]
pub struct TaskRecord<'a> {
    pub id: u64,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: Status,
    pub category: Option<&'a str>,
}

impl<'a> From<&'a Task> for TaskRecord<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: task.id,
            title: &task.title,
            description: task.description.as_deref(),
            status: task.status,
            category: task.category.as_deref(),
        }
    }
}

pub fn tasks_json<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Result<String> {
    let records: Vec<TaskRecord<'_>> = tasks.into_iter().map(TaskRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() > max_len {
        let truncated: String = title.chars().take(max_len - 1).collect();
        format!("{}…", truncated)
    } else {
        title.to_string()
    }
}

pub fn print_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>, json: bool) -> Result<()> {
    if json {
        println!("{}", tasks_json(tasks)?);
        return Ok(());
    }

    println!("{:<4} {:<10} {:<12} TITLE", "ID", "STATUS", "CATEGORY");
    for task in tasks {
        let category = truncate_title(task.category.as_deref().unwrap_or("-"), 10);
        let status = format!("{:<10}", task.status);
        let status = match task.status {
            Status::Pending => status.yellow(),
            Status::Completed => status.green(),
        };
        println!("{:<4} {} {:<12} {}", task.id, status, category, task.title);
    }
    Ok(())
}

pub fn print_task(task: &Task) {
    println!("[{}] {} ({})", task.id, task.title, task.status);
    if let Some(ref category) = task.category {
        println!("  category: {}", category);
    }
    if let Some(ref desc) = task.description {
        println!("  {}", desc);
    }
}
