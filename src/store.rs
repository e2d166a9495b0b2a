use jiff::civil::DateTime;
use jiff::{SignedDuration, Timestamp, Zoned};
use serde_json::Value;
use thiserror::Error;

use crate::{
    hooks::{Hooks, Level},
    models::task::{Priority, Status, Subtask, Task, TaskColor, new_task_id},
    storage::{Storage, StorageError, normalize::normalize_record},
};

/// Sole owner of the task collection and its persistence.
///
/// Every mutator persists the full collection before returning; callers never
/// save separately.
pub struct TaskStore<S: Storage> {
    storage: S,
    tasks: Vec<Task>,
    hooks: Hooks,
}

#[derive(Default)]
pub struct AddTaskParameters {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub deadline: Option<DateTime>,
    pub tags: Vec<String>,
    pub color: Option<TaskColor>,
    pub recurring: Option<Value>,
    pub subtasks: Vec<Subtask>,
}

/// Field patch for an existing task. `None` leaves the field untouched;
/// the nested options clear nullable fields with `Some(None)`.
#[derive(Default)]
pub struct UpdateTaskParameters {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub deadline: Option<Option<DateTime>>,
    pub tags: Option<Vec<String>>,
    pub color: Option<TaskColor>,
    pub recurring: Option<Option<Value>>,
    pub subtasks: Option<Vec<Subtask>>,
}

/// Outcome of a confirmed delete. Cancelled and not-found are not errors.
#[derive(Debug)]
pub enum Removal {
    Removed(Task),
    NotFound,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid file: expected an array of task records")]
    InvalidFormat,

    #[error("Import cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl<S: Storage> TaskStore<S> {
    pub fn new(storage: S, hooks: Hooks) -> Self {
        Self {
            storage,
            tasks: vec![],
            hooks,
        }
    }

    /// Snapshot of the current collection.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Replace in-memory state with the persisted collection. Read and parse
    /// failures degrade to an empty collection instead of propagating.
    pub fn load(&mut self) {
        self.tasks = match self.storage.load() {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!("failed to load task collection, starting empty: {e}");
                vec![]
            }
        };
        self.emit_change();
        self.request_render();
    }

    /// Persist the entire collection. A failure leaves in-memory state intact
    /// and is returned to the caller.
    pub fn save(&mut self) -> Result<(), StorageError> {
        self.storage.save(&self.tasks)?;
        self.emit_change();
        Ok(())
    }

    pub fn add_task(&mut self, parameters: AddTaskParameters) -> Result<Task, StorageError> {
        let now = Timestamp::now();
        let status = parameters.status.unwrap_or_default();

        let task = Task {
            id: new_task_id(),
            title: non_empty_title(parameters.title),
            desc: parameters.desc.unwrap_or_default(),
            category: parameters.category.unwrap_or_default(),
            priority: parameters.priority.unwrap_or_default(),
            status,
            deadline: parameters.deadline,
            tags: parameters.tags,
            created_at: now,
            // a task born Completed still satisfies the completedAt invariant
            completed_at: (status == Status::Completed).then_some(now),
            order: self.tasks.len() as u64,
            color: parameters.color.unwrap_or_default(),
            recurring: parameters.recurring,
            subtasks: parameters.subtasks,
        };

        self.tasks.push(task.clone());
        self.save()?;
        self.request_render();
        self.check_due_soon(&task);

        Ok(task)
    }

    pub fn update_task(
        &mut self,
        id: &str,
        parameters: UpdateTaskParameters,
    ) -> Result<Option<Task>, StorageError> {
        // Unknown id is a silent no-op
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return Ok(None);
        };

        let old_status = self.tasks[index].status;
        {
            let task = &mut self.tasks[index];

            if let Some(title) = parameters.title {
                task.title = non_empty_title(Some(title));
            }
            if let Some(desc) = parameters.desc {
                task.desc = desc;
            }
            if let Some(category) = parameters.category {
                task.category = category;
            }
            if let Some(priority) = parameters.priority {
                task.priority = priority;
            }
            if let Some(deadline) = parameters.deadline {
                task.deadline = deadline;
            }
            if let Some(tags) = parameters.tags {
                task.tags = tags;
            }
            if let Some(color) = parameters.color {
                task.color = color;
            }
            if let Some(recurring) = parameters.recurring {
                task.recurring = recurring;
            }
            // Absent subtasks preserve the existing list rather than clearing it
            if let Some(subtasks) = parameters.subtasks {
                task.subtasks = subtasks;
            }
            if let Some(status) = parameters.status {
                task.status = status;
                if status == Status::Completed && old_status != Status::Completed {
                    task.completed_at = Some(Timestamp::now());
                } else if status != Status::Completed && old_status == Status::Completed {
                    task.completed_at = None;
                }
            }
        }

        let updated = self.tasks[index].clone();
        self.save()?;
        self.request_render();

        Ok(Some(updated))
    }

    pub fn remove_task(&mut self, id: &str) -> Result<Removal, StorageError> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return Ok(Removal::NotFound);
        };

        if !self.confirm("Delete this task?") {
            return Ok(Removal::Cancelled);
        }

        let removed = self.tasks.remove(index);
        self.save()?;
        self.request_render();

        Ok(Removal::Removed(removed))
    }

    /// Empty the collection. Returns false when the user declines.
    pub fn clear_all_tasks(&mut self) -> Result<bool, StorageError> {
        if !self.confirm("Clear all tasks and reset?") {
            return Ok(false);
        }

        self.tasks.clear();
        self.save()?;
        self.request_render();

        Ok(true)
    }

    /// Serialize the full collection to a portable pretty-printed document.
    pub fn export_tasks(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(&self.tasks)
            .map_err(|e| StorageError::SerializeFailed { source: e })
    }

    /// Parse a portable document and append its tasks, never replacing the
    /// collection. Records are normalized; ids that are missing or would
    /// collide with an existing task are regenerated.
    pub fn import_tasks(&mut self, source: &str) -> Result<usize, ImportError> {
        let value: Value = serde_json::from_str(source).map_err(|_| ImportError::InvalidFormat)?;
        let Value::Array(records) = value else {
            return Err(ImportError::InvalidFormat);
        };

        // Validate every record before asking the user anything
        let now = Timestamp::now();
        let mut incoming = Vec::with_capacity(records.len());
        for record in records {
            let normalized = normalize_record(record, now).map_err(|_| ImportError::InvalidFormat)?;
            let task: Task =
                serde_json::from_value(normalized).map_err(|_| ImportError::InvalidFormat)?;
            incoming.push(task);
        }

        if !self.confirm(&format!("Import {} tasks from file?", incoming.len())) {
            return Err(ImportError::Cancelled);
        }

        let count = incoming.len();
        for mut task in incoming {
            if self.tasks.iter().any(|t| t.id == task.id) {
                task.id = new_task_id();
            }
            self.tasks.push(task);
        }

        self.save()?;
        self.request_render();

        Ok(count)
    }

    fn check_due_soon(&self, task: &Task) {
        let Some(deadline) = task.deadline else {
            return;
        };
        let now = Zoned::now();
        let Ok(deadline) = deadline.to_zoned(now.time_zone().clone()) else {
            return;
        };

        let until = deadline.timestamp().duration_since(now.timestamp());
        if until > SignedDuration::ZERO && until <= SignedDuration::from_hours(24) {
            self.notify(
                &format!("Task \"{}\" is due soon!", task.title),
                Level::Warning,
            );
        }
    }

    fn emit_change(&self) {
        if let Some(on_change) = &self.hooks.on_change {
            on_change(&self.tasks);
        }
    }

    fn request_render(&self) {
        if let Some(on_render) = &self.hooks.on_render {
            on_render();
        }
    }

    fn notify(&self, message: &str, level: Level) {
        if let Some(notify) = &self.hooks.notify {
            notify(message, level);
        }
    }

    fn confirm(&self, message: &str) -> bool {
        match &self.hooks.confirm {
            Some(confirm) => confirm(message),
            None => true,
        }
    }
}

fn non_empty_title(title: Option<String>) -> String {
    match title {
        Some(title) if !title.is_empty() => title,
        _ => String::from("Untitled"),
    }
}

/// Export filename stamped with the current timestamp.
pub fn export_filename(now: &Zoned) -> String {
    format!("novatasks_export_{}.json", now.strftime("%Y-%m-%dT%H:%M:%S"))
}
