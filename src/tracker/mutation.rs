//! Pure transitions over the [`Project`] aggregate.
//!
//! Every mutation borrows the current project and returns a new one:
//! `Ok(Some(next))` when something changed, `Ok(None)` for a silent no-op
//! (unknown id, unchanged value) and `Err` when the input is rejected. Each
//! applied change prepends exactly one audit log entry, except log deletion.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use uuid::Uuid;

use crate::tracker::format::{display_timestamp, format_currency, iso_timestamp};
use crate::tracker::model::{Payment, PaymentMilestone, Photo, Project, TaskStatus};
use crate::tracker::progress::{milestone_paid, milestone_remaining};

/// Slack allowed when a payment brings a milestone to exactly its total.
pub const PAYMENT_TOLERANCE: Decimal = dec!(0.001);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid delivery date '{value}', expected DD/MM/YYYY")]
    InvalidDeliveryDate { value: String },

    #[error("payment amount must be a positive number")]
    InvalidAmount,

    #[error(
        "payment of {} exceeds the outstanding balance of {}",
        money(.amount),
        money(.remaining)
    )]
    PaymentExceedsRemaining { amount: Decimal, remaining: Decimal },

    #[error("project name must not be empty")]
    EmptyProjectName,
}

fn money(amount: &Decimal) -> String {
    format_currency(*amount)
}

pub type MutationResult = Result<Option<Project>, ValidationError>;

/// Parse a user-entered amount. Accepts `,` or `.` as the decimal separator.
pub fn parse_amount(raw: &str) -> Result<Decimal, ValidationError> {
    let normalized = raw.trim().replace(',', ".");
    let amount = Decimal::from_str(&normalized).map_err(|_| ValidationError::InvalidAmount)?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(amount)
}

/// `DD/MM/YYYY` shape: ten characters, three non-empty slash-separated parts.
fn is_delivery_date(value: &str) -> bool {
    if value.chars().count() != 10 {
        return false;
    }
    let parts: Vec<&str> = value.split('/').collect();
    parts.len() == 3 && parts.iter().all(|part| !part.is_empty())
}

impl Project {
    /// Flip a task between Completed and `reopen`.
    pub fn toggle_task_complete(
        &self,
        task_id: u64,
        reopen: TaskStatus,
        at: &DateTime<FixedOffset>,
    ) -> MutationResult {
        let mut next = self.clone();
        let Some(task) = next.task_mut(task_id) else {
            return Ok(None);
        };

        task.status = if task.status == TaskStatus::Completed {
            reopen
        } else {
            TaskStatus::Completed
        };
        task.last_updated = Some(display_timestamp(at));
        let message = format!(
            "Task \"{}\" marked as {}.",
            task.name,
            task.status.label()
        );

        next.push_log(message, at);
        Ok(Some(next))
    }

    /// Attach already-encoded photos and move the task to InProgress.
    pub fn upload_photos(
        &self,
        task_id: u64,
        photos: Vec<Photo>,
        at: &DateTime<FixedOffset>,
    ) -> MutationResult {
        if photos.is_empty() {
            return Ok(None);
        }
        let mut next = self.clone();
        let Some(task) = next.task_mut(task_id) else {
            return Ok(None);
        };

        let count = photos.len();
        task.photos.extend(photos);
        task.status = TaskStatus::InProgress;
        task.last_updated = Some(display_timestamp(at));
        let noun = if count == 1 { "photo" } else { "photos" };
        let message = format!("{count} {noun} added to task \"{}\".", task.name);

        next.push_log(message, at);
        Ok(Some(next))
    }

    /// Remove a photo. A missing photo on an existing task still logs.
    pub fn delete_photo(
        &self,
        task_id: u64,
        photo_id: &str,
        at: &DateTime<FixedOffset>,
    ) -> MutationResult {
        let mut next = self.clone();
        let Some(task) = next.task_mut(task_id) else {
            return Ok(None);
        };

        task.photos.retain(|photo| photo.id != photo_id);
        let message = format!("Photo removed from task \"{}\".", task.name);

        next.push_log(message, at);
        Ok(Some(next))
    }

    pub fn update_photo_comment(
        &self,
        task_id: u64,
        photo_id: &str,
        comment: &str,
        at: &DateTime<FixedOffset>,
    ) -> MutationResult {
        let mut next = self.clone();
        let Some(task) = next.task_mut(task_id) else {
            return Ok(None);
        };
        let Some(photo) = task.photos.iter_mut().find(|photo| photo.id == photo_id) else {
            return Ok(None);
        };
        if photo.comment == comment {
            return Ok(None);
        }

        photo.comment = comment.to_string();
        let message = format!("Photo comment updated on task \"{}\".", task.name);

        next.push_log(message, at);
        Ok(Some(next))
    }

    pub fn update_phase_date(
        &self,
        phase_id: u64,
        new_date: &str,
        at: &DateTime<FixedOffset>,
    ) -> MutationResult {
        if !is_delivery_date(new_date) {
            return Err(ValidationError::InvalidDeliveryDate {
                value: new_date.to_string(),
            });
        }

        let mut next = self.clone();
        let Some(phase) = next.phases.iter_mut().find(|phase| phase.id == phase_id) else {
            return Ok(None);
        };
        if phase.delivery_date == new_date {
            return Ok(None);
        }

        phase.delivery_date = new_date.to_string();
        let message = format!(
            "Delivery date of phase \"{}\" changed to {new_date}.",
            phase.name
        );

        next.push_log(message, at);
        Ok(Some(next))
    }

    /// Check a prospective payment without applying it. Returns the target
    /// milestone, or `None` when the id is unknown.
    pub fn validate_payment(
        &self,
        milestone_id: u64,
        amount: Decimal,
    ) -> Result<Option<&PaymentMilestone>, ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmount);
        }
        let Some(milestone) = self.find_milestone(milestone_id) else {
            return Ok(None);
        };

        let limit = milestone.total_value.saturating_add(PAYMENT_TOLERANCE);
        match milestone_paid(milestone).checked_add(amount) {
            Some(after) if after <= limit => Ok(Some(milestone)),
            _ => Err(ValidationError::PaymentExceedsRemaining {
                amount,
                remaining: milestone_remaining(milestone),
            }),
        }
    }

    pub fn record_payment(
        &self,
        milestone_id: u64,
        amount: Decimal,
        receipt_url: Option<String>,
        comments: Option<String>,
        at: &DateTime<FixedOffset>,
    ) -> MutationResult {
        if self.validate_payment(milestone_id, amount)?.is_none() {
            return Ok(None);
        }

        let mut next = self.clone();
        let Some(milestone) = next
            .payment_milestones
            .iter_mut()
            .find(|milestone| milestone.id == milestone_id)
        else {
            return Ok(None);
        };

        milestone.payments.push(Payment {
            id: Uuid::new_v4().to_string(),
            amount,
            date: iso_timestamp(at),
            receipt_url,
            comments: comments.filter(|text| !text.trim().is_empty()),
        });
        milestone.refresh_status();
        let message = format!(
            "Payment of {} recorded for \"{}\".",
            format_currency(amount),
            milestone.phase_name
        );

        next.push_log(message, at);
        Ok(Some(next))
    }

    pub fn rename_project(&self, name: &str, at: &DateTime<FixedOffset>) -> MutationResult {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyProjectName);
        }
        if self.project_name == name {
            return Ok(None);
        }

        let mut next = self.clone();
        next.project_name = name.to_string();
        next.push_log(format!("Project renamed to \"{name}\"."), at);
        Ok(Some(next))
    }

    pub fn set_drive_folder_path(&self, path: &str, at: &DateTime<FixedOffset>) -> MutationResult {
        if self.drive_folder_path == path {
            return Ok(None);
        }

        let mut next = self.clone();
        next.drive_folder_path = path.to_string();
        next.push_log(format!("Photo folder path set to \"{path}\"."), at);
        Ok(Some(next))
    }

    /// Drop one audit entry. Does not itself log.
    pub fn delete_log_entry(&self, log_id: &str) -> MutationResult {
        if !self.logs.iter().any(|entry| entry.id == log_id) {
            return Ok(None);
        }

        let mut next = self.clone();
        next.logs.retain(|entry| entry.id != log_id);
        Ok(Some(next))
    }
}
