//! Plain-text rendering of a project for the terminal.

use std::fmt::Write as _;

use crate::tracker::format::format_currency;
use crate::tracker::model::{LogEntry, Project, TaskStatus};
use crate::tracker::progress::{
    milestone_paid, milestone_remaining, milestone_totals, overall_progress, phase_progress,
};

const BAR_WIDTH: usize = 20;

pub fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}

fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Completed => "[x]",
    }
}

pub fn render_project(project: &Project) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", project.project_name);
    let _ = writeln!(out, "Overall  {}", progress_bar(overall_progress(&project.phases)));
    if !project.drive_folder_path.is_empty() {
        let _ = writeln!(out, "Photos   {}", project.drive_folder_path);
    }

    for phase in &project.phases {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "#{} {}  (due {})  {}",
            phase.id,
            phase.name,
            phase.delivery_date,
            progress_bar(phase_progress(phase))
        );
        for task in &phase.tasks {
            let _ = write!(out, "  {} #{} {}", status_marker(task.status), task.id, task.name);
            if !task.photos.is_empty() {
                let _ = write!(out, "  ({} photos)", task.photos.len());
            }
            if let Some(updated) = &task.last_updated {
                let _ = write!(out, "  updated {updated}");
            }
            let _ = writeln!(out);
        }
    }

    if !project.payment_milestones.is_empty() {
        let totals = milestone_totals(&project.payment_milestones);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Payments {}  paid {} of {}, {} remaining",
            progress_bar(totals.progress),
            format_currency(totals.paid),
            format_currency(totals.total),
            format_currency(totals.remaining)
        );
        for milestone in &project.payment_milestones {
            let _ = writeln!(
                out,
                "  #{} {}  {}  paid {} / {}  ({} remaining)  {}",
                milestone.id,
                milestone.phase_name,
                milestone.status.label(),
                format_currency(milestone_paid(milestone)),
                format_currency(milestone.total_value),
                format_currency(milestone_remaining(milestone)),
                milestone.condition
            );
        }
    }

    out
}

pub fn render_logs(logs: &[LogEntry], limit: usize) -> String {
    let mut out = String::new();
    for entry in logs.iter().take(limit) {
        let _ = writeln!(out, "{}  {}  ({})", entry.timestamp, entry.message, entry.id);
    }
    if logs.is_empty() {
        out.push_str("No activity yet.\n");
    }
    out
}
