use jiff::Timestamp;
use serde_json::{Map, Value};

use crate::models::task::{Task, new_task_id};
use crate::storage::StorageError;

/// Normalize a persisted collection into fully-typed records.
///
/// Applied exactly once, at the load and import boundaries. Mutators never
/// back-fill fields; after this step every task carries every declared field.
pub fn normalize_tasks(value: Value, now: Timestamp) -> Result<Vec<Task>, StorageError> {
    let records = match value {
        Value::Array(records) => records,
        _ => return Err(StorageError::InvalidCollection),
    };

    let mut tasks = Vec::with_capacity(records.len());
    for record in records {
        let normalized = normalize_record(record, now)?;
        let task: Task =
            serde_json::from_value(normalized).map_err(|_| StorageError::InvalidCollection)?;
        tasks.push(task);
    }

    Ok(tasks)
}

/// Back-fill defaults on a single raw record. Fails if the record is not an
/// object; every other shape problem degrades to the field default.
pub fn normalize_record(value: Value, now: Timestamp) -> Result<Value, StorageError> {
    let mut obj = match value {
        Value::Object(obj) => obj,
        _ => return Err(StorageError::InvalidCollection),
    };

    // id and title must be non-empty strings, not merely present
    if !has_nonempty_string(&obj, "id") {
        obj.insert("id".to_string(), Value::from(new_task_id()));
    }
    if !has_nonempty_string(&obj, "title") {
        obj.insert("title".to_string(), Value::from("Untitled"));
    }

    fill_string(&mut obj, "desc", "");
    fill_string(&mut obj, "category", "General");
    fill_string(&mut obj, "priority", "Low");
    fill_string(&mut obj, "status", "Pending");
    fill_string(&mut obj, "color", "default");

    if !matches!(obj.get("deadline"), Some(Value::String(_))) {
        obj.insert("deadline".to_string(), Value::Null);
    }
    if !matches!(obj.get("tags"), Some(Value::Array(_))) {
        obj.insert("tags".to_string(), Value::Array(vec![]));
    }
    if obj.get("recurring").is_none() {
        obj.insert("recurring".to_string(), Value::Null);
    }

    normalize_timestamp(&mut obj, "createdAt", Some(now));
    normalize_timestamp(&mut obj, "completedAt", None);
    normalize_order(&mut obj);
    normalize_subtasks(&mut obj);

    // completedAt is non-null iff status is Completed; repair stale records
    let completed = obj.get("status").and_then(Value::as_str) == Some("Completed");
    if !completed {
        obj.insert("completedAt".to_string(), Value::Null);
    } else if obj.get("completedAt").is_none_or(Value::is_null) {
        let created = obj
            .get("createdAt")
            .cloned()
            .unwrap_or_else(|| Value::from(now.to_string()));
        obj.insert("completedAt".to_string(), created);
    }

    Ok(Value::Object(obj))
}

fn has_nonempty_string(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
}

fn fill_string(obj: &mut Map<String, Value>, key: &str, default: &str) {
    if !matches!(obj.get(key), Some(Value::String(_))) {
        obj.insert(key.to_string(), Value::from(default));
    }
}

/// Timestamps are stored as RFC 3339 strings. Earlier exports carried
/// millisecond epoch numbers; convert those in place.
fn normalize_timestamp(obj: &mut Map<String, Value>, key: &str, default: Option<Timestamp>) {
    let normalized = match obj.get(key) {
        Some(Value::String(s)) => Some(Value::from(s.clone())),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|millis| Timestamp::from_millisecond(millis).ok())
            .map(|ts| Value::from(ts.to_string())),
        _ => None,
    };

    let fallback = default.map(|ts| Value::from(ts.to_string()));
    obj.insert(
        key.to_string(),
        normalized.or(fallback).unwrap_or(Value::Null),
    );
}

fn normalize_order(obj: &mut Map<String, Value>) {
    let order = obj.get("order").and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_f64().map(|f| f.max(0.0) as u64))
    });
    obj.insert("order".to_string(), Value::from(order.unwrap_or(0)));
}

fn normalize_subtasks(obj: &mut Map<String, Value>) {
    let entries = match obj.get("subtasks") {
        Some(Value::Array(entries)) => entries.clone(),
        _ => vec![],
    };

    let normalized: Vec<Value> = entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(mut subtask) => {
                if !matches!(subtask.get("title"), Some(Value::String(_))) {
                    subtask.insert("title".to_string(), Value::from(""));
                }
                if !matches!(subtask.get("completed"), Some(Value::Bool(_))) {
                    subtask.insert("completed".to_string(), Value::from(false));
                }
                Some(Value::Object(subtask))
            }
            _ => None,
        })
        .collect();

    obj.insert("subtasks".to_string(), Value::Array(normalized));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{Priority, Status};
    use serde_json::json;

    fn now() -> Timestamp {
        "2026-02-10T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_empty_record_gets_all_defaults() {
        let tasks = normalize_tasks(json!([{}]), now()).unwrap();
        assert_eq!(tasks.len(), 1);

        let task = &tasks[0];
        assert!(!task.id.is_empty());
        assert_eq!(task.title, "Untitled");
        assert_eq!(task.desc, "");
        assert_eq!(task.category, "General");
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.status, Status::Pending);
        assert!(task.deadline.is_none());
        assert!(task.tags.is_empty());
        assert_eq!(task.created_at, now());
        assert!(task.completed_at.is_none());
        assert_eq!(task.order, 0);
        assert!(task.recurring.is_none());
        assert!(task.subtasks.is_empty());
    }

    #[test]
    fn test_populated_fields_survive() {
        let tasks = normalize_tasks(
            json!([{
                "id": "x1",
                "title": "Write report",
                "deadline": "2026-02-12T09:30:00",
                "tags": ["work", "urgent"],
                "order": 3,
                "subtasks": [{"title": "outline", "completed": true}]
            }]),
            now(),
        )
        .unwrap();

        let task = &tasks[0];
        assert_eq!(task.id, "x1");
        assert_eq!(task.title, "Write report");
        assert_eq!(task.tags, vec!["work", "urgent"]);
        assert_eq!(task.order, 3);
        assert_eq!(task.subtasks.len(), 1);
        assert!(task.subtasks[0].completed);
        assert!(task.deadline.is_some());
    }

    #[test]
    fn test_epoch_millis_timestamps_are_migrated() {
        let tasks = normalize_tasks(
            json!([{"title": "Old export", "createdAt": 1700000000000_i64}]),
            now(),
        )
        .unwrap();

        let expected: Timestamp = Timestamp::from_millisecond(1700000000000).unwrap();
        assert_eq!(tasks[0].created_at, expected);
    }

    #[test]
    fn test_completed_at_repaired_to_match_status() {
        let tasks = normalize_tasks(
            json!([
                {"title": "Stale stamp", "status": "Pending", "completedAt": "2026-01-01T00:00:00Z"},
                {"title": "Missing stamp", "status": "Completed", "createdAt": "2026-01-05T08:00:00Z"}
            ]),
            now(),
        )
        .unwrap();

        assert!(tasks[0].completed_at.is_none());
        assert_eq!(
            tasks[1].completed_at,
            Some("2026-01-05T08:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn test_empty_title_gets_placeholder() {
        let tasks = normalize_tasks(json!([{"title": ""}]), now()).unwrap();
        assert_eq!(tasks[0].title, "Untitled");
    }

    #[test]
    fn test_non_array_payload_is_rejected() {
        let result = normalize_tasks(json!({"tasks": []}), now());
        assert!(matches!(result, Err(StorageError::InvalidCollection)));
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let result = normalize_tasks(json!([42]), now());
        assert!(matches!(result, Err(StorageError::InvalidCollection)));
    }

    #[test]
    fn test_fractional_order_is_clamped() {
        let tasks = normalize_tasks(json!([{"order": 2.0}, {"order": -1}]), now()).unwrap();
        assert_eq!(tasks[0].order, 2);
        assert_eq!(tasks[1].order, 0);
    }
}
