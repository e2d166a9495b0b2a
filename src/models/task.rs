use jiff::Timestamp;
use jiff::civil::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a fresh opaque task id.
pub fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

/// A single tracked task. Serialized with camelCase keys, which is the
/// on-disk and on-the-wire record format.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque unique id, assigned at creation, never mutated
    pub id: String,
    /// Title of the task, never empty ("Untitled" placeholder when absent)
    pub title: String,
    /// Free-text description
    pub desc: String,
    /// Free-text label used for grouping and filtering
    pub category: String,
    /// Priority of the task
    pub priority: Priority,
    /// Board status of the task
    pub status: Status,
    /// Optional wall-clock deadline
    pub deadline: Option<DateTime>,
    /// Tags of the task
    pub tags: Vec<String>,
    /// When the task was created
    pub created_at: Timestamp,
    /// When the task entered Completed status; None whenever it is not Completed
    pub completed_at: Option<Timestamp>,
    /// Positional ordering within a view; new tasks append at the end
    pub order: u64,
    /// Cosmetic card color
    pub color: TaskColor,
    /// Opaque recurrence descriptor, interpreted by an external scheduler
    pub recurring: Option<serde_json::Value>,
    /// Sub tasks, independently toggleable
    pub subtasks: Vec<Subtask>,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: new_task_id(),
            title: String::from("Untitled"),
            desc: String::new(),
            category: String::new(),
            priority: Priority::default(),
            status: Status::default(),
            deadline: None,
            tags: vec![],
            created_at: Timestamp::now(),
            completed_at: None,
            order: 0,
            color: TaskColor::default(),
            recurring: None,
            subtasks: vec![],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Status {
    #[default]
    Pending,
    #[serde(rename = "In-Process")]
    InProcess,
    Completed,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TaskColor {
    #[default]
    Default,
    Blue,
    Green,
    Red,
    Purple,
    Orange,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Subtask {
    pub title: String,
    pub completed: bool,
}
