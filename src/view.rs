//! Turns a grouped `TaskView` into rows the TUI can draw.

use chrono::format::StrftimeItems;
use ratatui::style::Color;

use crate::config::{Config, PreviewMode};
use crate::model::{Status, Task};
use crate::query::{MatchRank, TaskView};

#[derive(Debug, Clone, PartialEq)]
pub enum Row<'a> {
    Header(&'a str),
    Task(TaskRow<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow<'a> {
    pub task: &'a Task,
    pub indented: bool,
    pub rank: MatchRank,
    /// First line of the description, when the preview mode shows it.
    pub preview: Option<&'a str>,
    /// `completed_at` of a completed task, already formatted.
    pub completed_on: Option<String>,
}

impl PreviewMode {
    pub fn shows(self, status: Status) -> bool {
        match self {
            Self::All => true,
            Self::Incomplete => status == Status::Pending,
            Self::Off => false,
        }
    }
}

pub fn status_marker(status: Status) -> &'static str {
    match status {
        Status::Pending => "[ ]",
        Status::Completed => "[x]",
    }
}

pub fn build_rows<'a>(view: &TaskView<'a>, config: &Config) -> Vec<Row<'a>> {
    let mut rows = Vec::with_capacity(view.len() + view.groups.len());

    for group in &view.groups {
        if let Some(category) = group.category {
            rows.push(Row::Header(category));
        }
        for matched in &group.tasks {
            let task = matched.task;
            let preview = task
                .description
                .as_deref()
                .filter(|_| config.preview.shows(task.status))
                .and_then(|d| d.lines().find(|line| !line.trim().is_empty()));
            let completed_on = task
                .completed_at
                .filter(|_| task.is_completed())
                .map(|at| {
                    at.format_with_items(StrftimeItems::new(&config.completed_date_format))
                        .to_string()
                });

            rows.push(Row::Task(TaskRow {
                task,
                indented: group.category.is_some(),
                rank: matched.rank,
                preview,
                completed_on,
            }));
        }
    }

    rows
}

/// Colors the TUI draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub dark: bool,
    pub primary: Color,
    pub accent: Color,
    pub foreground: Color,
    pub muted: Color,
    pub warning: Color,
    pub error: Color,
    pub success: Color,
}

impl Palette {
    pub fn catppuccin_mocha() -> Self {
        Self {
            dark: true,
            primary: Color::Rgb(0x89, 0xb4, 0xfa),
            accent: Color::Rgb(0xcb, 0xa6, 0xf7),
            foreground: Color::Rgb(0xcd, 0xd6, 0xf4),
            muted: Color::Rgb(0x6c, 0x70, 0x86),
            warning: Color::Rgb(0xf9, 0xe2, 0xaf),
            error: Color::Rgb(0xf3, 0x8b, 0xa8),
            success: Color::Rgb(0xa6, 0xe3, 0xa1),
        }
    }

    pub fn dark() -> Self {
        Self {
            dark: true,
            primary: Color::Cyan,
            accent: Color::Magenta,
            foreground: Color::White,
            muted: Color::DarkGray,
            warning: Color::Yellow,
            error: Color::Red,
            success: Color::Green,
        }
    }

    pub fn light() -> Self {
        Self {
            dark: false,
            primary: Color::Blue,
            accent: Color::Magenta,
            foreground: Color::Black,
            muted: Color::Gray,
            warning: Color::Rgb(0xb5, 0x89, 0x00),
            error: Color::Red,
            success: Color::Green,
        }
    }

    /// Resolve the configured theme. Unknown names and unusable custom
    /// themes fall back to the default palette.
    pub fn from_config(config: &Config) -> Self {
        if let Some(custom) = config.active_custom_theme() {
            let base = if custom.dark { Self::dark() } else { Self::light() };
            return Self {
                dark: custom.dark,
                primary: custom.primary.unwrap_or(base.primary),
                accent: custom.accent.or(custom.secondary).unwrap_or(base.accent),
                foreground: custom.foreground.unwrap_or(base.foreground),
                muted: custom.surface.unwrap_or(base.muted),
                warning: custom.warning.unwrap_or(base.warning),
                error: custom.error.unwrap_or(base.error),
                success: custom.success.unwrap_or(base.success),
            };
        }

        match config.theme.as_str() {
            "dark" => Self::dark(),
            "light" => Self::light(),
            "catppuccin-mocha" => Self::catppuccin_mocha(),
            other => {
                log::warn!("unknown theme {other:?}; using catppuccin-mocha");
                Self::catppuccin_mocha()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Query, filter_tasks};
    use chrono::{TimeZone, Utc};

    fn task(id: u64, title: &str, category: Option<&str>, status: Status) -> Task {
        let ts = Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).single().unwrap();
        Task {
            id,
            title: title.into(),
            description: Some("\nfirst line\nsecond line".into()),
            status,
            category: category.map(str::to_string),
            created_at: ts,
            updated_at: ts,
            completed_at: (status == Status::Completed).then_some(ts),
        }
    }

    #[test]
    fn preview_visibility_follows_mode_and_status() {
        assert!(PreviewMode::All.shows(Status::Completed));
        assert!(PreviewMode::Incomplete.shows(Status::Pending));
        assert!(!PreviewMode::Incomplete.shows(Status::Completed));
        assert!(!PreviewMode::Off.shows(Status::Pending));
    }

    #[test]
    fn rows_have_headers_only_for_named_categories() {
        let tasks = vec![
            task(1, "loose", None, Status::Pending),
            task(2, "grouped", Some("work"), Status::Completed),
        ];
        let view = filter_tasks(&tasks, &Query::default());
        let rows = build_rows(&view, &Config::default());

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], Row::Header("work"));

        let Row::Task(loose) = &rows[0] else {
            panic!("expected task row");
        };
        assert!(!loose.indented);
        assert_eq!(loose.preview, Some("first line"));
        assert_eq!(loose.completed_on, None);

        let Row::Task(grouped) = &rows[2] else {
            panic!("expected task row");
        };
        assert!(grouped.indented);
        assert_eq!(grouped.preview, None);
        assert_eq!(grouped.completed_on.as_deref(), Some("03/04/26"));
    }

    #[test]
    fn completion_date_ignores_later_edits() {
        let mut done = task(1, "ship it", None, Status::Completed);
        done.updated_at = Utc.with_ymd_and_hms(2026, 5, 20, 8, 0, 0).single().unwrap();
        let tasks = vec![done];

        let view = filter_tasks(&tasks, &Query::default());
        let rows = build_rows(&view, &Config::default());
        let Row::Task(row) = &rows[0] else {
            panic!("expected task row");
        };
        assert_eq!(row.completed_on.as_deref(), Some("03/04/26"));
    }

    #[test]
    fn custom_palette_fills_missing_colors_from_base() {
        let config = Config::parse(
            r##"
            theme = "custom"
            [custom_theme]
            primary = "#010203"
            "##,
        )
        .unwrap();

        let palette = Palette::from_config(&config);
        assert_eq!(palette.primary, Color::Rgb(1, 2, 3));
        assert_eq!(palette.error, Palette::dark().error);
    }

    #[test]
    fn unknown_theme_uses_default_palette() {
        let config = Config {
            theme: "solarized-neon".into(),
            ..Config::default()
        };
        assert_eq!(Palette::from_config(&config), Palette::catppuccin_mocha());
    }
}
