use std::fs::OpenOptions;
use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use task_nerd::config::Config;
use task_nerd::model::Status;

#[derive(Parser)]
#[command(
    name = "task-nerd",
    version,
    about = "Local-first task manager with a terminal UI"
)]
struct Cli {
    /// Path to the tasks database
    #[arg(long, global = true, default_value = "tasks.db")]
    db: PathBuf,
    /// Run without a subcommand to open the interactive UI
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty tasks database
    Init,
    /// List tasks in display order
    Ls {
        /// Print a JSON array instead of a table
        #[arg(long)]
        json: bool,
        /// Only show tasks with this status
        #[arg(long, value_enum)]
        status: Option<Status>,
    },
    /// Add a task; a #word in the title sets its category
    Add {
        /// Task title
        title: String,
        /// Task description
        #[arg(long, short)]
        description: Option<String>,
    },
    /// Edit task fields
    #[command(group(
        ArgGroup::new("changes")
            .required(true)
            .multiple(true)
            .args(["name", "description", "category"])
    ))]
    Edit {
        /// Task ID to edit
        #[arg(long)]
        id: u64,
        /// New title
        #[arg(long)]
        name: Option<String>,
        /// New description (empty clears it)
        #[arg(long)]
        description: Option<String>,
        /// New category (empty clears it)
        #[arg(long)]
        category: Option<String>,
    },
    /// Mark a task complete or incomplete
    #[command(group(
        ArgGroup::new("state")
            .required(true)
            .args(["complete", "incomplete"])
    ))]
    Mark {
        /// Task ID to mark
        #[arg(long)]
        id: u64,
        /// Mark as completed
        #[arg(long)]
        complete: bool,
        /// Mark as pending again
        #[arg(long)]
        incomplete: bool,
    },
    /// Delete a task
    Rm {
        /// Task ID to delete
        #[arg(long)]
        id: u64,
    },
}

/// CLI runs log to stderr. The TUI owns the terminal, so it only logs when
/// `RUST_LOG` is set, and then to a file in the cache directory.
fn init_logging(tui: bool) {
    if !tui {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .init();
        return;
    }

    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let Some(dir) = dirs::cache_dir().map(|d| d.join("task-nerd")) else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    if let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("task-nerd.log"))
    {
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    }
}

fn run(cli: Cli) -> task_nerd::error::Result<()> {
    use task_nerd::commands;

    let db = cli.db.as_path();
    match cli.command {
        None => commands::tui::run(db, Config::load()),
        Some(Commands::Init) => commands::init::run(db),
        Some(Commands::Ls { json, status }) => commands::list::run(db, status, json),
        Some(Commands::Add { title, description }) => commands::add::run(db, title, description),
        Some(Commands::Edit {
            id,
            name,
            description,
            category,
        }) => commands::edit::run(db, id, name, description, category),
        Some(Commands::Mark { id, complete, .. }) => {
            let status = if complete {
                Status::Completed
            } else {
                Status::Pending
            };
            commands::mark::run(db, id, status)
        }
        Some(Commands::Rm { id }) => commands::delete::run(db, id),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.command.is_none());

    if let Err(e) = run(cli) {
        log::debug!("exiting with {}", e.code());
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
