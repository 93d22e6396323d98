//! Default project used when no document has been stored yet.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::tracker::model::{LogEntry, PaymentMilestone, Phase, Project, Task};

/// Log line written when the local snapshot seeds a fresh project.
pub const LOCAL_INIT_MESSAGE: &str = "Project initialized.";
/// Log line written when the server seeds its stored document.
pub const SERVER_INIT_MESSAGE: &str = "Project initialized in cloud storage.";

#[derive(Debug, Deserialize)]
struct SeedConfig {
    project_name: String,
    drive_folder_path: String,
    phases: Vec<RawPhase>,
    milestones: Vec<RawMilestone>,
}

#[derive(Debug, Deserialize)]
struct RawPhase {
    id: u64,
    name: String,
    delivery_date: String,
    tasks: Vec<RawTask>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawMilestone {
    id: u64,
    phase_name: String,
    total_value: String,
    condition: String,
}

struct Seed {
    project_name: String,
    drive_folder_path: String,
    phases: Vec<Phase>,
    milestones: Vec<PaymentMilestone>,
}

static SEED: LazyLock<Result<Seed, String>> =
    LazyLock::new(|| parse_seed(include_str!("seed.toml")));

fn parse_seed(raw: &str) -> Result<Seed, String> {
    let parsed: SeedConfig =
        toml::from_str(raw).map_err(|e| format!("invalid seed TOML: {}", e))?;

    let phases = parsed
        .phases
        .into_iter()
        .map(|phase| Phase {
            id: phase.id,
            name: phase.name,
            delivery_date: phase.delivery_date,
            tasks: phase
                .tasks
                .into_iter()
                .map(|task| Task::new(task.id, task.name))
                .collect(),
        })
        .collect();

    let mut milestones = Vec::with_capacity(parsed.milestones.len());
    for raw in parsed.milestones {
        let total = Decimal::from_str(&raw.total_value).map_err(|e| {
            format!(
                "invalid total_value '{}' for milestone {}: {}",
                raw.total_value, raw.id, e
            )
        })?;
        milestones.push(PaymentMilestone::new(
            raw.id,
            raw.phase_name,
            total,
            raw.condition,
        ));
    }

    Ok(Seed {
        project_name: parsed.project_name,
        drive_folder_path: parsed.drive_folder_path,
        phases,
        milestones,
    })
}

fn seed() -> &'static Seed {
    match &*SEED {
        Ok(seed) => seed,
        // The seed is compiled in; a parse failure is a build defect.
        Err(e) => panic!("{e}"),
    }
}

pub fn seed_phases() -> Vec<Phase> {
    seed().phases.clone()
}

pub fn seed_milestones() -> Vec<PaymentMilestone> {
    seed().milestones.clone()
}

/// A fresh project carrying a single initialization log entry.
pub fn seed_project(init_message: &str, at: &DateTime<FixedOffset>) -> Project {
    let seed = seed();
    Project {
        project_name: seed.project_name.clone(),
        phases: seed.phases.clone(),
        payment_milestones: seed.milestones.clone(),
        logs: vec![LogEntry::new(init_message, at)],
        drive_folder_path: seed.drive_folder_path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;

    use super::*;
    use crate::tracker::model::{MilestoneStatus, TaskStatus};

    #[test]
    fn embedded_seed_parses() {
        assert!(SEED.is_ok(), "seed must parse: {:?}", SEED.as_ref().err());
    }

    #[test]
    fn seed_has_six_phases_with_unique_task_ids() {
        let phases = seed_phases();
        assert_eq!(phases.len(), 6);
        assert_eq!(phases[0].delivery_date, "21/09/2025");
        assert_eq!(phases[5].delivery_date, "15/11/2026");

        let ids: Vec<u64> = phases
            .iter()
            .flat_map(|p| p.tasks.iter().map(|t| t.id))
            .collect();
        let unique: HashSet<u64> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 21);
        assert_eq!(unique.len(), ids.len());
        assert!(
            phases
                .iter()
                .flat_map(|p| p.tasks.iter())
                .all(|t| t.status == TaskStatus::Pending && t.photos.is_empty())
        );
    }

    #[test]
    fn seed_milestones_start_unpaid() {
        let milestones = seed_milestones();
        assert_eq!(milestones.len(), 6);
        assert!(milestones.iter().all(|m| m.status == MilestoneStatus::Pending));
        assert!(milestones.iter().all(|m| m.total_value > Decimal::ZERO));
    }

    #[test]
    fn seed_project_logs_initialization() {
        let at = FixedOffset::east_opt(0)
            .and_then(|tz| tz.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).single())
            .expect("timestamp");
        let project = seed_project(SERVER_INIT_MESSAGE, &at);
        assert_eq!(project.logs.len(), 1);
        assert_eq!(project.logs[0].message, SERVER_INIT_MESSAGE);
        assert_eq!(project.logs[0].timestamp, "01/05/2026, 08:00:00");
        assert_eq!(project.drive_folder_path, "My Build/Photos");
    }

    #[test]
    fn malformed_seed_is_reported() {
        let err = parse_seed("project_name = 1").err().expect("must fail");
        assert!(err.contains("invalid seed TOML"));
    }
}
