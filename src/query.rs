//! Filtering, ranking and grouping of the in-memory task set.
//!
//! The engine is pure: it borrows the tasks in store order and returns a
//! grouped view. Identical inputs always produce identical views.

use std::collections::BTreeMap;

use crate::model::Task;

/// What the user is currently looking for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub hide_completed: bool,
}

impl Query {
    pub fn new(text: impl Into<String>, hide_completed: bool) -> Self {
        Self {
            text: text.into(),
            hide_completed,
        }
    }

    /// Lowercased needle, or `None` when the text is blank.
    fn needle(&self) -> Option<String> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
    }
}

/// How a task matched the query, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRank {
    /// No query text; every task is included.
    All,
    TitleSubstring,
    /// Query characters appear in order in the title. `gaps` counts skipped
    /// title characters between the first and last match.
    TitleFuzzy { gaps: usize },
    Description,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Matched<'a> {
    pub task: &'a Task,
    pub rank: MatchRank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group<'a> {
    /// `None` is the uncategorized bucket.
    pub category: Option<&'a str>,
    pub tasks: Vec<Matched<'a>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskView<'a> {
    pub groups: Vec<Group<'a>>,
}

impl<'a> TaskView<'a> {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.tasks.len()).sum()
    }

    /// Tasks in display order.
    pub fn tasks(&self) -> impl Iterator<Item = &Matched<'a>> {
        self.groups.iter().flat_map(|g| g.tasks.iter())
    }

    pub fn task_ids(&self) -> Vec<u64> {
        self.tasks().map(|m| m.task.id).collect()
    }
}

/// Filter and group `tasks`, which must be in store order.
///
/// Uncategorized tasks come first, then categories in byte-wise ascending
/// order. Inside a group tasks keep their store order.
pub fn filter_tasks<'a>(tasks: &'a [Task], query: &Query) -> TaskView<'a> {
    let needle = query.needle();

    let mut uncategorized = Vec::new();
    let mut named: BTreeMap<&'a str, Vec<Matched<'a>>> = BTreeMap::new();

    for task in tasks {
        if query.hide_completed && task.is_completed() {
            continue;
        }
        let rank = match &needle {
            None => MatchRank::All,
            Some(needle) => match match_task(task, needle) {
                Some(rank) => rank,
                None => continue,
            },
        };

        let matched = Matched { task, rank };
        match task.category.as_deref() {
            None => uncategorized.push(matched),
            Some(category) => named.entry(category).or_default().push(matched),
        }
    }

    let mut groups = Vec::with_capacity(named.len() + 1);
    if !uncategorized.is_empty() {
        groups.push(Group {
            category: None,
            tasks: uncategorized,
        });
    }
    groups.extend(named.into_iter().map(|(category, tasks)| Group {
        category: Some(category),
        tasks,
    }));

    TaskView { groups }
}

/// Match a lowercased needle against one task.
pub fn match_task(task: &Task, needle: &str) -> Option<MatchRank> {
    let title = task.title.to_lowercase();
    if title.contains(needle) {
        return Some(MatchRank::TitleSubstring);
    }
    if let Some(gaps) = fuzzy_match(needle, &title) {
        return Some(MatchRank::TitleFuzzy { gaps });
    }
    task.description
        .as_deref()
        .filter(|d| d.to_lowercase().contains(needle))
        .map(|_| MatchRank::Description)
}

/// Leftmost greedy subsequence match. Returns the number of `text`
/// characters skipped between the first and last matched character.
pub fn fuzzy_match(pattern: &str, text: &str) -> Option<usize> {
    let mut wanted = pattern.chars().peekable();
    wanted.peek()?;

    let mut first = None;
    let mut matched = 0usize;

    for (idx, ch) in text.chars().enumerate() {
        let Some(&next) = wanted.peek() else {
            break;
        };
        if ch == next {
            first.get_or_insert(idx);
            matched += 1;
            wanted.next();
            if wanted.peek().is_none() {
                let span = idx - first.unwrap_or(idx) + 1;
                return Some(span - matched);
            }
        }
    }

    None
}
