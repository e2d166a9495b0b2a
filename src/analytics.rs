use jiff::ToSpan;
use jiff::civil::Date;
use jiff::tz::TimeZone;

use crate::models::task::{Status, Task};

/// Completions on one calendar day of the productivity window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayCount {
    /// Short weekday label ("Mon", "Tue", ...)
    pub day: String,
    pub count: usize,
}

/// Derived summary statistics over a snapshot of the collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Analytics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub in_process: usize,
    /// Rounded percentage; 0 for an empty collection
    pub completion_rate: u32,
    /// Exactly 7 entries, oldest to newest, ending today
    pub productivity: Vec<DayCount>,
}

/// Compute analytics for a snapshot. Pure; `today` and the timezone used to
/// bucket completion timestamps into local calendar days are explicit inputs.
pub fn get_analytics(tasks: &[Task], today: Date, tz: &TimeZone) -> Analytics {
    let total = tasks.len();
    let completed = count_status(tasks, Status::Completed);
    let pending = count_status(tasks, Status::Pending);
    let in_process = count_status(tasks, Status::InProcess);

    let completion_rate = if total > 0 {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    } else {
        0
    };

    let mut productivity = Vec::with_capacity(7);
    for offset in (0..7i64).rev() {
        let day = today
            .checked_sub(offset.days())
            .expect("productivity window in range");

        let count = tasks
            .iter()
            .filter(|t| {
                t.completed_at
                    .is_some_and(|ts| ts.to_zoned(tz.clone()).date() == day)
            })
            .count();

        productivity.push(DayCount {
            day: day.strftime("%a").to_string(),
            count,
        });
    }

    Analytics {
        total,
        completed,
        pending,
        in_process,
        completion_rate,
        productivity,
    }
}

fn count_status(tasks: &[Task], status: Status) -> usize {
    tasks.iter().filter(|t| t.status == status).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::Timestamp;

    fn today() -> Date {
        "2026-02-10".parse().unwrap()
    }

    fn completed_at(ts: &str) -> Task {
        Task {
            status: Status::Completed,
            completed_at: Some(ts.parse::<Timestamp>().unwrap()),
            ..Task::default()
        }
    }

    #[test]
    fn test_empty_collection_has_zero_rate() {
        let analytics = get_analytics(&[], today(), &TimeZone::UTC);

        assert_eq!(analytics.total, 0);
        assert_eq!(analytics.completion_rate, 0);
        assert_eq!(analytics.productivity.len(), 7);
        assert!(analytics.productivity.iter().all(|d| d.count == 0));
    }

    #[test]
    fn test_counts_by_status() {
        let tasks = vec![
            Task::default(),
            Task::default(),
            Task {
                status: Status::InProcess,
                ..Task::default()
            },
            completed_at("2026-02-10T08:00:00Z"),
        ];

        let analytics = get_analytics(&tasks, today(), &TimeZone::UTC);

        assert_eq!(analytics.total, 4);
        assert_eq!(analytics.pending, 2);
        assert_eq!(analytics.in_process, 1);
        assert_eq!(analytics.completed, 1);
        assert_eq!(analytics.completion_rate, 25);
    }

    #[test]
    fn test_completion_rate_rounds() {
        let tasks = vec![
            completed_at("2026-02-10T08:00:00Z"),
            Task::default(),
            Task::default(),
        ];

        // 1/3 rounds to 33
        assert_eq!(
            get_analytics(&tasks, today(), &TimeZone::UTC).completion_rate,
            33
        );

        let tasks = vec![
            completed_at("2026-02-10T08:00:00Z"),
            completed_at("2026-02-10T09:00:00Z"),
            Task::default(),
        ];

        // 2/3 rounds to 67
        assert_eq!(
            get_analytics(&tasks, today(), &TimeZone::UTC).completion_rate,
            67
        );
    }

    #[test]
    fn test_productivity_window_is_seven_days_oldest_first() {
        let tasks = vec![
            completed_at("2026-02-10T10:00:00Z"),
            completed_at("2026-02-10T22:00:00Z"),
            completed_at("2026-02-04T00:00:00Z"),
            // One day before the window opens
            completed_at("2026-02-03T12:00:00Z"),
        ];

        let analytics = get_analytics(&tasks, today(), &TimeZone::UTC);

        assert_eq!(analytics.productivity.len(), 7);
        // 2026-02-04 is the oldest bucket, 2026-02-10 (a Tuesday) the newest
        assert_eq!(analytics.productivity[0].day, "Wed");
        assert_eq!(analytics.productivity[0].count, 1);
        assert_eq!(analytics.productivity[6].day, "Tue");
        assert_eq!(analytics.productivity[6].count, 2);

        let in_window: usize = analytics.productivity.iter().map(|d| d.count).sum();
        assert_eq!(in_window, 3);
    }

    #[test]
    fn test_day_boundaries_are_local_midnight() {
        // 23:30 UTC on the 9th is still the 9th in UTC, but already the 10th
        // in a +01:00 zone
        let tasks = vec![completed_at("2026-02-09T23:30:00Z")];

        let utc = get_analytics(&tasks, today(), &TimeZone::UTC);
        assert_eq!(utc.productivity[5].count, 1, "9th in UTC");
        assert_eq!(utc.productivity[6].count, 0);

        let plus_one = TimeZone::fixed(jiff::tz::Offset::constant(1));
        let shifted = get_analytics(&tasks, today(), &plus_one);
        assert_eq!(shifted.productivity[5].count, 0);
        assert_eq!(shifted.productivity[6].count, 1, "10th at +01:00");
    }
}
