use std::io::Write;

use colored::*;
use jiff::civil::DateTime;

use crate::analytics::Analytics;
use crate::hooks::Level;
use crate::models::task::{Priority, Status, Task};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Toast-style notification on stderr
pub fn notify(message: &str, level: Level) {
    let tag = match level {
        Level::Info => "ℹ".blue(),
        Level::Success => "✓".green(),
        Level::Warning => "⚠".yellow(),
        Level::Danger => "✗".red(),
    };
    eprintln!("{} {}", tag, message);
}

/// Interactive yes/no prompt on stdout; anything but y/yes declines
pub fn prompt_confirm(message: &str) -> bool {
    print!("{} [y/N] ", message);
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }

    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Get the appropriate status glyph for a task
pub fn get_status_glyph(task: &Task, is_overdue: bool) -> ColoredString {
    match task.status {
        Status::Completed => "✓".dimmed(),
        _ if is_overdue => "●".red(),
        Status::InProcess => "◐".yellow(),
        Status::Pending => "○".normal(),
    }
}

fn priority_label(priority: Priority) -> ColoredString {
    match priority {
        Priority::High => "High".red(),
        Priority::Medium => "Medium".yellow(),
        Priority::Low => "Low".dimmed(),
    }
}

/// First characters of an opaque id, enough to address a task from the CLI
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Check if a task's deadline has passed, at date granularity
pub fn is_overdue(task: &Task, today: jiff::civil::Date) -> bool {
    if task.status == Status::Completed {
        return false;
    }
    task.deadline.is_some_and(|dt| dt.date() < today)
}

/// Format a deadline for display (e.g., "Today 15:30", "Tomorrow 09:00", "Feb 15")
pub fn format_deadline(deadline: DateTime, today: jiff::civil::Date) -> String {
    let date = deadline.date();

    if date == today {
        format!("Today {}", deadline.strftime("%H:%M"))
    } else if date == today.tomorrow().expect("tomorrow should be valid") {
        format!("Tomorrow {}", deadline.strftime("%H:%M"))
    } else {
        date.strftime("%b %d").to_string()
    }
}

/// Build the right-aligned context string for a task line
fn get_task_context(task: &Task, today: jiff::civil::Date) -> Option<String> {
    let mut parts = vec![];

    if !task.category.is_empty() {
        parts.push(task.category.clone());
    }
    if let Some(deadline) = task.deadline {
        parts.push(format_deadline(deadline, today));
    }
    if !task.subtasks.is_empty() {
        let done = task.subtasks.iter().filter(|s| s.completed).count();
        parts.push(format!("{}/{}", done, task.subtasks.len()));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" · "))
    }
}

/// Render a single task line with id, glyph, title, and right-aligned context
pub fn render_task_line(task: &Task, today: jiff::civil::Date) {
    let terminal_width = get_terminal_width();

    let id_str = short_id(&task.id);
    let overdue = is_overdue(task, today);
    let glyph = get_status_glyph(task, overdue);
    let title = &task.title;

    let left_section = format!("  {}  {}  {}", id_str.dimmed(), glyph, title);
    let styled_left = if task.status == Status::Completed {
        left_section.dimmed()
    } else {
        left_section.normal()
    };

    let context = get_task_context(task, today);

    if let Some(context) = context {
        let left_visible_len = format!("  {}  {}  {}", id_str, " ", title).chars().count();
        let right_visible_len = context.chars().count();
        let total_content = left_visible_len + right_visible_len;

        if total_content + 4 < terminal_width {
            let padding = terminal_width - total_content - 2;
            println!("{}{}{}", styled_left, " ".repeat(padding), context.dimmed());
        } else {
            println!("{}", styled_left);
        }
    } else {
        println!("{}", styled_left);
    }
}

/// Render a task with its metadata expanded over several lines
pub fn render_task_detail(task: &Task, today: jiff::civil::Date) {
    render_task_line(task, today);

    let mut meta_parts = vec![priority_label(task.priority).to_string()];
    if !task.tags.is_empty() {
        meta_parts.push(
            task.tags
                .iter()
                .map(|t| format!("#{}", t))
                .collect::<Vec<_>>()
                .join(" "),
        );
    }
    println!("    {}", meta_parts.join(&format!(" {} ", "•".dimmed())));

    if !task.desc.is_empty() {
        println!("    {}", task.desc.dimmed());
    }
    for subtask in &task.subtasks {
        let mark = if subtask.completed { "☑" } else { "☐" };
        println!("      {} {}", mark.dimmed(), subtask.title);
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let task_word = if count == 1 { "task" } else { "tasks" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, task_word);
}

/// Render a section header (e.g., "Pending", "In-Process")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

/// Render the analytics summary with the 7-day productivity histogram
pub fn render_analytics(analytics: &Analytics) {
    render_view_header("Analytics", analytics.total);

    println!(
        "  {} {}  {} {}  {} {}",
        "Pending".bold(),
        analytics.pending,
        "In-Process".bold(),
        analytics.in_process,
        "Completed".bold(),
        analytics.completed,
    );
    println!(
        "  {} {}%",
        "Completion rate:".bold(),
        analytics.completion_rate
    );

    render_section_header("Completed, last 7 days");
    for entry in &analytics.productivity {
        let bar = "█".repeat(entry.count);
        println!("  {:>3}  {} {}", entry.day, bar.cyan(), entry.count);
    }
    println!();
}
