//! Domain records for a tracked construction project.
//!
//! The whole [`Project`] aggregate is the unit of persistence: it is read and
//! written wholesale as one JSON document. Field names are camelCase on the
//! wire so documents written by earlier clients load unchanged.

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::tracker::format::display_timestamp;
use crate::tracker::progress::{checked_payments_sum, derive_milestone_status, milestone_paid};

/// Work state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(alias = "Pendente")]
    Pending,
    #[serde(alias = "Em Andamento")]
    InProgress,
    #[serde(alias = "Concluído")]
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
        }
    }

    /// Human-readable label used in log messages and terminal output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In progress",
            Self::Completed => "Completed",
        }
    }
}

/// Payment state of a milestone. Always derived from the payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MilestoneStatus {
    #[default]
    #[serde(alias = "Pendente")]
    Pending,
    #[serde(alias = "Pagamento Parcial")]
    PartiallyPaid,
    #[serde(alias = "Pago")]
    Paid,
}

impl MilestoneStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::PartiallyPaid => "Partially paid",
            Self::Paid => "Paid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    /// Embedded data URL, or a reference to an out-of-band blob.
    pub url: String,
    #[serde(default)]
    pub comment: String,
}

impl Photo {
    pub fn new(url: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url,
            comment: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique across the whole project, not only within its phase.
    pub id: u64,
    pub name: String,
    pub status: TaskStatus,
    #[serde(rename = "images", default)]
    pub photos: Vec<Photo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl Task {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: TaskStatus::Pending,
            photos: Vec::new(),
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub id: u64,
    pub name: String,
    /// Free-text target date, `DD/MM/YYYY`.
    pub delivery_date: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, at: &DateTime<FixedOffset>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: display_timestamp(at),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// ISO-8601 UTC timestamp.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredMilestone")]
pub struct PaymentMilestone {
    pub id: u64,
    pub phase_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    pub condition: String,
    pub status: MilestoneStatus,
    pub payments: Vec<Payment>,
}

impl PaymentMilestone {
    pub fn new(
        id: u64,
        phase_name: impl Into<String>,
        total_value: Decimal,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            id,
            phase_name: phase_name.into(),
            total_value,
            condition: condition.into(),
            status: MilestoneStatus::Pending,
            payments: Vec::new(),
        }
    }

    /// Recompute `status` from the current payments.
    pub fn refresh_status(&mut self) {
        self.status = derive_milestone_status(self.total_value, milestone_paid(self));
    }
}

/// Wire shape of a milestone. The stored `status` is ignored: it is always
/// recomputed from the payments on load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMilestone {
    id: u64,
    phase_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    total_value: Decimal,
    #[serde(default)]
    condition: String,
    #[serde(default, rename = "status")]
    _status: Option<serde_json::Value>,
    #[serde(default)]
    payments: Vec<Payment>,
}

/// Rejected on load: the payments of a milestone add up past the largest
/// representable amount.
#[derive(Debug, Error)]
#[error("payments of milestone {milestone_id} exceed the largest representable amount")]
pub struct PaymentsOverflow {
    pub milestone_id: u64,
}

impl TryFrom<StoredMilestone> for PaymentMilestone {
    type Error = PaymentsOverflow;

    fn try_from(stored: StoredMilestone) -> Result<Self, Self::Error> {
        let paid = checked_payments_sum(&stored.payments).ok_or(PaymentsOverflow {
            milestone_id: stored.id,
        })?;
        Ok(PaymentMilestone {
            id: stored.id,
            phase_name: stored.phase_name,
            status: derive_milestone_status(stored.total_value, paid),
            total_value: stored.total_value,
            condition: stored.condition,
            payments: stored.payments,
        })
    }
}

/// The persisted project aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_name: String,
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub payment_milestones: Vec<PaymentMilestone>,
    /// Newest first.
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub drive_folder_path: String,
}

impl Project {
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.phases.iter().flat_map(|phase| phase.tasks.iter())
    }

    pub fn find_task(&self, task_id: u64) -> Option<&Task> {
        self.tasks().find(|task| task.id == task_id)
    }

    pub(crate) fn task_mut(&mut self, task_id: u64) -> Option<&mut Task> {
        self.phases
            .iter_mut()
            .flat_map(|phase| phase.tasks.iter_mut())
            .find(|task| task.id == task_id)
    }

    pub fn find_phase(&self, phase_id: u64) -> Option<&Phase> {
        self.phases.iter().find(|phase| phase.id == phase_id)
    }

    pub fn find_milestone(&self, milestone_id: u64) -> Option<&PaymentMilestone> {
        self.payment_milestones
            .iter()
            .find(|milestone| milestone.id == milestone_id)
    }

    /// Prepend an audit entry.
    pub(crate) fn push_log(&mut self, message: String, at: &DateTime<FixedOffset>) {
        self.logs.insert(0, LogEntry::new(message, at));
    }
}
