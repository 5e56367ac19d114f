use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskNerdError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Completed,
}

impl Status {
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = TaskNerdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(TaskNerdError::Validation(format!(
                "unknown status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the task moves to completed; edits leave it alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }
}

/// Field-wise update. `None` leaves a field untouched; an empty description
/// or category clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<Status>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.status.is_none()
    }
}

/// Trim and reject blank titles.
pub fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskNerdError::Validation("title must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

/// Trim optional text and map blank values to `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Split a `#category` token out of free text.
///
/// A token is `#` followed by ASCII alphanumerics, `-` or `_`, where the `#`
/// starts the text or follows whitespace. When several tokens are present the
/// last one becomes the category and the earlier ones stay in the title. If
/// removing the token would leave nothing behind, the text is kept as the
/// title and no category is returned.
pub fn extract_category(text: &str) -> (String, Option<String>) {
    let words: Vec<&str> = text.split_whitespace().collect();

    let Some(idx) = words.iter().rposition(|word| category_token(word).is_some()) else {
        return (text.trim().to_string(), None);
    };

    let category = category_token(words[idx]).map(str::to_string);
    let title = words
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != idx)
        .map(|(_, word)| *word)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        return (text.trim().to_string(), None);
    }

    (title, category)
}

fn category_token(word: &str) -> Option<&str> {
    let token = word.strip_prefix('#')?;
    let valid = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(token)
}

pub fn toggle_status(task: &Task, now: DateTime<Utc>) -> Task {
    let mut next = task.clone();
    change_status(&mut next, task.status.toggled(), now);
    next.updated_at = now;
    next
}

fn change_status(task: &mut Task, status: Status, now: DateTime<Utc>) {
    if task.status == status {
        return;
    }
    task.status = status;
    task.completed_at = (status == Status::Completed).then_some(now);
}

pub fn apply_patch(task: &Task, patch: &TaskPatch, now: DateTime<Utc>) -> Result<Task> {
    let mut next = task.clone();

    if let Some(title) = &patch.title {
        next.title = validate_title(title)?;
    }
    if let Some(description) = &patch.description {
        next.description = non_blank(Some(description));
    }
    if let Some(category) = &patch.category {
        next.category = non_blank(Some(category));
    }
    if let Some(status) = patch.status {
        change_status(&mut next, status, now);
    }

    next.updated_at = now;
    Ok(next)
}
