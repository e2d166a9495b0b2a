use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use jiff::Zoned;
use jiff::civil::{Date, DateTime};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::{
    analytics::get_analytics,
    hooks::{Hooks, Level},
    models::task::{Priority, Status, Subtask, Task, TaskColor},
    query::{DateFilter, Filters, apply_filters},
    storage::{Storage, json::JsonFileStorage},
    store::{
        AddTaskParameters, ImportError, Removal, TaskStore, UpdateTaskParameters, export_filename,
    },
    sync::{SyncClient, load_sync_settings, save_sync_settings},
};

mod analytics;
mod hooks;
mod models;
mod query;
mod storage;
mod store;
mod sync;
mod ui;

#[derive(Parser)]
#[command(
    name = "nova",
    about = "A personal task tracker for your terminal, with optional remote sync"
)]
struct Cli {
    /// Answer yes to every confirmation prompt
    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks, grouped by status
    List {
        /// Date filter: all, today, week, overdue, recurring, or cat:<name>
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// Keep only tasks with this priority
        #[arg(short, long, value_enum)]
        priority: Option<Priority>,

        /// Case-insensitive search over title, description, tags and category
        #[arg(short, long)]
        search: Option<String>,

        /// Show descriptions, tags and subtasks
        #[arg(long)]
        long: bool,
    },

    /// Add a new task
    Add {
        /// Task title
        title: String,

        /// Description
        #[arg(short, long)]
        desc: Option<String>,

        /// Category label
        #[arg(short, long)]
        category: Option<String>,

        /// Priority
        #[arg(short, long, value_enum)]
        priority: Option<Priority>,

        /// Deadline (e.g., "2026-03-01" or "2026-03-01T17:30")
        #[arg(long)]
        deadline: Option<String>,

        /// Add tags (can be used multiple times)
        #[arg(short, long, action = clap::ArgAction::Append)]
        tag: Vec<String>,

        /// Card color
        #[arg(long, value_enum)]
        color: Option<TaskColor>,

        /// Add subtasks (can be used multiple times)
        #[arg(long, action = clap::ArgAction::Append)]
        subtask: Vec<String>,
    },

    /// Edit fields of an existing task
    Edit {
        /// Task id (or unique prefix)
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        desc: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long, value_enum)]
        priority: Option<Priority>,

        #[arg(long, value_enum)]
        status: Option<Status>,

        /// New deadline, or "none" to clear it
        #[arg(long)]
        deadline: Option<String>,

        /// Replace the tag list (can be used multiple times)
        #[arg(short, long, action = clap::ArgAction::Append)]
        tag: Vec<String>,

        #[arg(long, value_enum)]
        color: Option<TaskColor>,
    },

    /// Show one task in full
    Show {
        /// Task id (or unique prefix)
        id: String,
    },

    /// Mark a task as completed
    Done {
        /// Task id (or unique prefix)
        id: String,
    },

    /// Move a task to In-Process
    Start {
        /// Task id (or unique prefix)
        id: String,
    },

    /// Move a task back to Pending
    Reopen {
        /// Task id (or unique prefix)
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task id (or unique prefix)
        id: String,
    },

    /// Delete every task
    Clear,

    /// Manage subtasks
    #[command(subcommand)]
    Subtask(SubtaskCommands),

    /// Export the collection to a JSON file
    Export {
        /// Destination path (defaults to a timestamped file)
        path: Option<PathBuf>,
    },

    /// Append tasks from an exported JSON file
    Import {
        /// Source file
        path: PathBuf,
    },

    /// Show counts, completion rate and the 7-day productivity histogram
    Stats,

    /// Best-effort sync with a remote endpoint
    #[command(subcommand)]
    Sync(SyncCommands),
}

#[derive(Debug, Subcommand)]
enum SubtaskCommands {
    /// Append a subtask
    Add { id: String, title: String },
    /// Toggle a subtask by its position (1-based)
    Toggle { id: String, index: usize },
}

#[derive(Debug, Subcommand)]
enum SyncCommands {
    /// Push the local collection to the remote endpoint
    Push,
    /// Fetch the remote collection (records are shown, not merged)
    Pull,
    /// Push on a fixed interval until interrupted
    Watch {
        /// Seconds between pushes
        #[arg(long, default_value_t = 300)]
        interval: u64,
    },
    /// Configure the remote endpoint
    Config {
        /// Endpoint URL
        #[arg(long)]
        url: Option<String>,

        /// Bearer token sent with every request
        #[arg(long)]
        api_key: Option<String>,

        /// Enable the remote sync
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Disable the remote sync
        #[arg(long)]
        disable: bool,
    },
    /// Show the current sync configuration
    Show,
}

fn main() {
    // Tracing is opt-in via RUST_LOG; user-facing output stays on stdout/stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();

    let data_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("novatasks");

    std::fs::create_dir_all(&data_dir).unwrap_or_else(|e| {
        eprintln!("Error: Failed to create data directory: {}", e);
        std::process::exit(1);
    });

    let tasks_path = data_dir.join("tasks.json");
    let sync_path = data_dir.join("sync.json");

    let assume_yes = cli.yes;
    let hooks = Hooks {
        notify: Some(Box::new(ui::notify)),
        confirm: Some(Box::new(move |message| {
            assume_yes || ui::prompt_confirm(message)
        })),
        ..Hooks::default()
    };

    let mut store = TaskStore::new(JsonFileStorage::new(tasks_path), hooks);
    store.load();

    let today = Zoned::now().date();

    match cli.command {
        Some(Commands::List {
            filter,
            priority,
            search,
            long,
        }) => {
            let date = match filter.parse::<DateFilter>() {
                Ok(date) => date,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let filters = Filters {
                date,
                priority,
                search: search.unwrap_or_default(),
            };

            let visible = apply_filters(store.tasks(), &filters, today);
            render_board(&visible, today, long);
        }
        Some(Commands::Add {
            title,
            desc,
            category,
            priority,
            deadline,
            tag,
            color,
            subtask,
        }) => {
            let deadline = deadline.map(|raw| parse_deadline_or_exit(&raw));

            let params = AddTaskParameters {
                title: Some(title),
                desc,
                category,
                priority,
                deadline,
                tags: tag,
                color,
                subtasks: subtask
                    .into_iter()
                    .map(|title| Subtask {
                        title,
                        completed: false,
                    })
                    .collect(),
                ..AddTaskParameters::default()
            };

            match store.add_task(params) {
                Ok(task) => {
                    println!("✓ Task added: {}", task.title);
                    println!("  {}", ui::short_id(&task.id).dimmed());
                }
                Err(e) => {
                    eprintln!("Error: Failed to save task: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Edit {
            id,
            title,
            desc,
            category,
            priority,
            status,
            deadline,
            tag,
            color,
        }) => {
            let id = resolve_task_id(&store, &id);

            let deadline = deadline.map(|raw| {
                if raw == "none" {
                    None
                } else {
                    Some(parse_deadline_or_exit(&raw))
                }
            });

            let params = UpdateTaskParameters {
                title,
                desc,
                category,
                priority,
                status,
                deadline,
                tags: (!tag.is_empty()).then_some(tag),
                color,
                ..UpdateTaskParameters::default()
            };

            apply_update(&mut store, &id, params, "Task updated");
        }
        Some(Commands::Show { id }) => {
            let id = resolve_task_id(&store, &id);
            // resolve_task_id only returns ids present in the store
            let task = store.get_task(&id).expect("resolved id should exist");
            println!();
            ui::render_task_detail(task, today);
            println!();
        }
        Some(Commands::Done { id }) => {
            let id = resolve_task_id(&store, &id);
            apply_update(
                &mut store,
                &id,
                UpdateTaskParameters {
                    status: Some(Status::Completed),
                    ..UpdateTaskParameters::default()
                },
                "Task completed",
            );
        }
        Some(Commands::Start { id }) => {
            let id = resolve_task_id(&store, &id);
            apply_update(
                &mut store,
                &id,
                UpdateTaskParameters {
                    status: Some(Status::InProcess),
                    ..UpdateTaskParameters::default()
                },
                "Task started",
            );
        }
        Some(Commands::Reopen { id }) => {
            let id = resolve_task_id(&store, &id);
            apply_update(
                &mut store,
                &id,
                UpdateTaskParameters {
                    status: Some(Status::Pending),
                    ..UpdateTaskParameters::default()
                },
                "Task reopened",
            );
        }
        Some(Commands::Rm { id }) => {
            let id = resolve_task_id(&store, &id);
            match store.remove_task(&id) {
                Ok(Removal::Removed(task)) => {
                    println!("✓ Task deleted: {}", task.title);
                }
                Ok(Removal::Cancelled) => {
                    println!("Cancelled");
                }
                Ok(Removal::NotFound) => {
                    eprintln!("Error: Task '{}' not found", id);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: Failed to delete task: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Clear) => match store.clear_all_tasks() {
            Ok(true) => println!("✓ All tasks cleared"),
            Ok(false) => println!("Cancelled"),
            Err(e) => {
                eprintln!("Error: Failed to clear tasks: {}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Subtask(SubtaskCommands::Add { id, title })) => {
            let id = resolve_task_id(&store, &id);
            let task = store.get_task(&id).expect("resolved id should exist");

            let mut subtasks = task.subtasks.clone();
            subtasks.push(Subtask {
                title,
                completed: false,
            });

            apply_update(
                &mut store,
                &id,
                UpdateTaskParameters {
                    subtasks: Some(subtasks),
                    ..UpdateTaskParameters::default()
                },
                "Subtask added",
            );
        }
        Some(Commands::Subtask(SubtaskCommands::Toggle { id, index })) => {
            let id = resolve_task_id(&store, &id);
            let task = store.get_task(&id).expect("resolved id should exist");

            if index == 0 || index > task.subtasks.len() {
                eprintln!(
                    "Error: Subtask {} not found ({} present)",
                    index,
                    task.subtasks.len()
                );
                std::process::exit(1);
            }

            let mut subtasks = task.subtasks.clone();
            subtasks[index - 1].completed = !subtasks[index - 1].completed;

            apply_update(
                &mut store,
                &id,
                UpdateTaskParameters {
                    subtasks: Some(subtasks),
                    ..UpdateTaskParameters::default()
                },
                "Subtask toggled",
            );
        }
        Some(Commands::Export { path }) => {
            let document = match store.export_tasks() {
                Ok(document) => document,
                Err(e) => {
                    eprintln!("Error: Failed to export tasks: {}", e);
                    std::process::exit(1);
                }
            };

            let path = path.unwrap_or_else(|| PathBuf::from(export_filename(&Zoned::now())));
            if let Err(e) = std::fs::write(&path, document) {
                eprintln!("Error: Failed to write '{}': {}", path.display(), e);
                std::process::exit(1);
            }

            println!(
                "✓ Exported {} tasks to {}",
                store.tasks().len(),
                path.display()
            );
        }
        Some(Commands::Import { path }) => {
            let source = match std::fs::read_to_string(&path) {
                Ok(source) => source,
                Err(e) => {
                    eprintln!("Error: Failed to read '{}': {}", path.display(), e);
                    std::process::exit(1);
                }
            };

            match store.import_tasks(&source) {
                Ok(count) => println!("✓ Imported {} tasks", count),
                Err(ImportError::Cancelled) => println!("Cancelled"),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Stats) => {
            let analytics = get_analytics(store.tasks(), today, &jiff::tz::TimeZone::system());
            ui::render_analytics(&analytics);
        }
        Some(Commands::Sync(SyncCommands::Push)) => {
            let settings = load_sync_settings(&sync_path);
            let client = sync_client_or_exit(&settings.remote_db);
            push_once(&client, store.tasks());
        }
        Some(Commands::Sync(SyncCommands::Pull)) => {
            let settings = load_sync_settings(&sync_path);
            let client = sync_client_or_exit(&settings.remote_db);

            match client.pull() {
                Ok(records) => {
                    ui::notify(
                        &format!(
                            "Pulled {} tasks from remote database (not merged)",
                            records.len()
                        ),
                        Level::Success,
                    );
                }
                Err(e) => {
                    tracing::warn!("remote pull failed: {e}");
                    ui::notify("Failed to pull from remote database", Level::Danger);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Sync(SyncCommands::Watch { interval })) => {
            let settings = load_sync_settings(&sync_path);
            let client = sync_client_or_exit(&settings.remote_db);

            println!("Pushing every {} seconds. Ctrl-C to stop.", interval);
            loop {
                // Pick up edits made by other invocations since the last tick
                store.load();
                push_once(&client, store.tasks());
                std::thread::sleep(std::time::Duration::from_secs(interval));
            }
        }
        Some(Commands::Sync(SyncCommands::Config {
            url,
            api_key,
            enable,
            disable,
        })) => {
            let mut settings = load_sync_settings(&sync_path);

            if let Some(url) = url {
                settings.remote_db.url = Some(url);
                settings.remote_db.enabled = true;
            }
            if let Some(api_key) = api_key {
                settings.remote_db.api_key = Some(api_key);
            }
            if enable {
                settings.remote_db.enabled = true;
            }
            if disable {
                settings.remote_db.enabled = false;
            }

            if settings.remote_db.enabled && settings.remote_db.url.is_none() {
                eprintln!("Error: Please set a URL before enabling sync (--url)");
                std::process::exit(1);
            }

            match save_sync_settings(&sync_path, &settings) {
                Ok(()) => ui::notify("Sync settings saved successfully!", Level::Success),
                Err(e) => {
                    eprintln!("Error: Failed to save sync settings: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Sync(SyncCommands::Show)) => {
            let settings = load_sync_settings(&sync_path);
            let remote = &settings.remote_db;

            println!(
                "  {} {}",
                "Enabled:".bold(),
                if remote.enabled { "yes" } else { "no" }
            );
            println!(
                "  {} {}",
                "URL:".bold(),
                remote.url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  {} {}",
                "API key:".bold(),
                if remote.api_key.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
        }
        None => {
            // Default: the full board
            let visible = apply_filters(store.tasks(), &Filters::default(), today);
            render_board(&visible, today, false);
        }
    }
}

/// Render tasks grouped into the three board columns.
fn render_board(tasks: &[&Task], today: Date, long: bool) {
    if tasks.is_empty() {
        println!("No tasks");
        return;
    }

    ui::render_view_header("Tasks", tasks.len());

    let columns = [
        ("Pending", Status::Pending),
        ("In-Process", Status::InProcess),
        ("Completed", Status::Completed),
    ];

    for (label, status) in columns {
        let mut column: Vec<&&Task> = tasks.iter().filter(|t| t.status == status).collect();
        if column.is_empty() {
            continue;
        }
        column.sort_by_key(|t| t.order);

        ui::render_section_header(label);
        for task in column {
            if long {
                ui::render_task_detail(task, today);
            } else {
                ui::render_task_line(task, today);
            }
        }
    }
    println!();
}

fn apply_update<S: Storage>(
    store: &mut TaskStore<S>,
    id: &str,
    params: UpdateTaskParameters,
    verb: &str,
) {
    match store.update_task(id, params) {
        Ok(Some(task)) => {
            println!("✓ {}: {}", verb, task.title);
        }
        Ok(None) => {
            eprintln!("Error: Task '{}' not found", id);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: Failed to save task: {}", e);
            std::process::exit(1);
        }
    }
}

/// Resolve a full id or unique prefix; print candidates and exit otherwise.
fn resolve_task_id<S: Storage>(store: &TaskStore<S>, input: &str) -> String {
    if let Some(task) = store.get_task(input) {
        return task.id.clone();
    }

    let matches: Vec<&Task> = if input.is_empty() {
        vec![]
    } else {
        store
            .tasks()
            .iter()
            .filter(|t| t.id.starts_with(input))
            .collect()
    };

    match matches.len() {
        1 => matches[0].id.clone(),
        0 => {
            eprintln!("Error: Task '{}' not found", input);
            std::process::exit(1);
        }
        _ => {
            eprintln!("Error: Task id '{}' is ambiguous. Matching tasks:", input);
            for task in matches {
                eprintln!("  - {}  {}", ui::short_id(&task.id), task.title);
            }
            eprintln!("\nPlease use a longer prefix.");
            std::process::exit(1);
        }
    }
}

fn parse_deadline_or_exit(raw: &str) -> DateTime {
    match parse_deadline(raw) {
        Ok(deadline) => deadline,
        Err(_) => {
            eprintln!("Error: Invalid deadline '{}'", raw);
            eprintln!(
                "\nExpected format: YYYY-MM-DD (e.g., 2026-03-01) or YYYY-MM-DDTHH:MM for a specific time"
            );
            std::process::exit(1);
        }
    }
}

/// A bare date means midnight at the start of that day.
fn parse_deadline(raw: &str) -> Result<DateTime, jiff::Error> {
    raw.parse::<DateTime>()
        .or_else(|e| raw.parse::<Date>().map(|d| d.at(0, 0, 0, 0)).map_err(|_| e))
}

fn sync_client_or_exit(settings: &crate::sync::RemoteDbSettings) -> SyncClient {
    match SyncClient::from_settings(settings) {
        Ok(client) => client,
        Err(e) => {
            ui::notify(&e.to_string(), Level::Info);
            eprintln!("\nConfigure it first: nova sync config --url <endpoint>");
            std::process::exit(1);
        }
    }
}

fn push_once(client: &SyncClient, tasks: &[Task]) {
    match client.push(tasks) {
        Ok(()) => {
            ui::notify("Synced with remote database successfully!", Level::Success);
        }
        Err(e) => {
            // Best-effort by design: log, notify, move on
            tracing::warn!("remote push failed: {e}");
            ui::notify("Failed to sync with remote database", Level::Danger);
        }
    }
}
