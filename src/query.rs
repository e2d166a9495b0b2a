use std::str::FromStr;

use jiff::ToSpan;
use jiff::civil::Date;

use crate::models::task::{Priority, Status, Task};

/// Date dimension of the filter state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Week,
    Overdue,
    Recurring,
    Category(String),
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown filter '{0}'. Expected one of: all, today, week, overdue, recurring, cat:<name>")]
pub struct ParseFilterError(String);

impl FromStr for DateFilter {
    type Err = ParseFilterError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "all" => Ok(DateFilter::All),
            "today" => Ok(DateFilter::Today),
            "week" => Ok(DateFilter::Week),
            "overdue" => Ok(DateFilter::Overdue),
            "recurring" => Ok(DateFilter::Recurring),
            other => other
                .strip_prefix("cat:")
                .filter(|name| !name.is_empty())
                .map(|name| DateFilter::Category(name.to_string()))
                .ok_or_else(|| ParseFilterError(raw.to_string())),
        }
    }
}

/// Current filter state. `priority: None` and an empty search match everything.
#[derive(Clone, Debug, Default)]
pub struct Filters {
    pub date: DateFilter,
    pub priority: Option<Priority>,
    pub search: String,
}

/// Derive the filtered view of a snapshot. Pure: no mutation, no
/// persistence, and the input order is preserved.
pub fn apply_filters<'a>(tasks: &'a [Task], filters: &Filters, today: Date) -> Vec<&'a Task> {
    let query = filters.search.trim().to_lowercase();

    tasks
        .iter()
        .filter(|t| matches_date(t, &filters.date, today))
        .filter(|t| filters.priority.is_none_or(|p| t.priority == p))
        .filter(|t| query.is_empty() || matches_search(t, &query))
        .collect()
}

fn matches_date(task: &Task, filter: &DateFilter, today: Date) -> bool {
    match filter {
        DateFilter::All => true,
        // Deadline comparisons ignore the time of day
        DateFilter::Today => deadline_date(task).is_some_and(|d| d == today),
        DateFilter::Week => deadline_date(task).is_some_and(|d| {
            let end = today.checked_add(7.days()).expect("week window in range");
            d >= today && d < end
        }),
        DateFilter::Overdue => {
            task.status != Status::Completed && deadline_date(task).is_some_and(|d| d < today)
        }
        DateFilter::Recurring => task.recurring.is_some(),
        DateFilter::Category(name) => task.category.to_lowercase() == name.to_lowercase(),
    }
}

fn deadline_date(task: &Task) -> Option<Date> {
    task.deadline.map(|dt| dt.date())
}

fn matches_search(task: &Task, query: &str) -> bool {
    task.title.to_lowercase().contains(query)
        || task.desc.to_lowercase().contains(query)
        || task.tags.join(" ").to_lowercase().contains(query)
        || task.category.to_lowercase().contains(query)
}
