//! Derived progress and payment figures. Pure, recomputed on every read.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::tracker::model::{MilestoneStatus, Payment, Phase, PaymentMilestone, TaskStatus};

/// Aggregate figures across all payment milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneTotals {
    pub total: Decimal,
    pub paid: Decimal,
    pub remaining: Decimal,
    /// Paid share of the total, integer percent in `0..=100`.
    pub progress: u8,
}

/// Integer percent of `part / whole`, rounded half-up. Only a complete
/// whole reaches 100.
fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    if part >= whole {
        return 100;
    }
    let rounded = (200 * part + whole) / (2 * whole);
    rounded.min(99) as u8
}

fn decimal_percent(part: Decimal, whole: Decimal) -> u8 {
    if whole <= Decimal::ZERO || part <= Decimal::ZERO {
        return 0;
    }
    if part >= whole {
        return 100;
    }
    // part < whole, so the ratio is below one and scaling it cannot overflow.
    (part / whole * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .min(dec!(99))
        .to_u8()
        .unwrap_or(0)
}

fn completion(phases: &[&Phase]) -> u8 {
    let (done, total) = phases
        .iter()
        .flat_map(|phase| phase.tasks.iter())
        .fold((0, 0), |(done, total), task| {
            let done = done + usize::from(task.status == TaskStatus::Completed);
            (done, total + 1)
        });
    percent(done, total)
}

/// Share of completed tasks across every phase.
pub fn overall_progress(phases: &[Phase]) -> u8 {
    let refs: Vec<&Phase> = phases.iter().collect();
    completion(&refs)
}

pub fn phase_progress(phase: &Phase) -> u8 {
    completion(&[phase])
}

/// Sum of `payments`, or `None` when it is not representable.
pub fn checked_payments_sum(payments: &[Payment]) -> Option<Decimal> {
    payments
        .iter()
        .try_fold(Decimal::ZERO, |acc, payment| acc.checked_add(payment.amount))
}

/// Paid so far. Loaded and recorded milestones always have a representable
/// sum; anything else saturates.
pub fn milestone_paid(milestone: &PaymentMilestone) -> Decimal {
    milestone
        .payments
        .iter()
        .fold(Decimal::ZERO, |acc, payment| acc.saturating_add(payment.amount))
}

pub fn milestone_remaining(milestone: &PaymentMilestone) -> Decimal {
    milestone.total_value.saturating_sub(milestone_paid(milestone))
}

/// Nothing paid is always Pending, even for a zero-value milestone.
pub fn derive_milestone_status(total: Decimal, paid: Decimal) -> MilestoneStatus {
    if paid <= Decimal::ZERO {
        MilestoneStatus::Pending
    } else if paid >= total {
        MilestoneStatus::Paid
    } else {
        MilestoneStatus::PartiallyPaid
    }
}

pub fn milestone_totals(milestones: &[PaymentMilestone]) -> MilestoneTotals {
    let (total, paid) = milestones
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(total, paid), m| {
            (
                total.saturating_add(m.total_value),
                paid.saturating_add(milestone_paid(m)),
            )
        });
    MilestoneTotals {
        total,
        paid,
        remaining: total.saturating_sub(paid),
        progress: decimal_percent(paid, total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::model::Task;

    fn phase_with(statuses: &[TaskStatus]) -> Phase {
        Phase {
            id: 1,
            name: "Phase".to_string(),
            delivery_date: "01/01/2026".to_string(),
            tasks: statuses
                .iter()
                .enumerate()
                .map(|(i, status)| {
                    let mut task = Task::new(i as u64 + 1, format!("Task {i}"));
                    task.status = *status;
                    task
                })
                .collect(),
        }
    }

    fn payment(amount: Decimal) -> Payment {
        Payment {
            id: format!("p-{amount}"),
            amount,
            date: "2026-01-01T00:00:00.000Z".to_string(),
            receipt_url: None,
            comments: None,
        }
    }

    fn big(mantissa: i128, exponent: u32) -> Decimal {
        Decimal::from_i128_with_scale(mantissa * 10i128.pow(exponent), 0)
    }

    #[test]
    fn overall_progress_of_no_tasks_is_zero() {
        assert_eq!(overall_progress(&[]), 0);
        assert_eq!(overall_progress(&[phase_with(&[])]), 0);
    }

    #[test]
    fn progress_rounds_half_up() {
        use TaskStatus::*;
        // 1 of 3 = 33.3, 2 of 3 = 66.7, 1 of 8 = 12.5
        assert_eq!(phase_progress(&phase_with(&[Completed, Pending, InProgress])), 33);
        assert_eq!(phase_progress(&phase_with(&[Completed, Completed, Pending])), 67);
        let mut eight = vec![Pending; 8];
        eight[0] = Completed;
        assert_eq!(phase_progress(&phase_with(&eight)), 13);
    }

    #[test]
    fn overall_progress_spans_all_phases() {
        use TaskStatus::*;
        let phases = vec![
            phase_with(&[Completed, Completed]),
            phase_with(&[Pending, InProgress]),
        ];
        assert_eq!(overall_progress(&phases), 50);
        assert_eq!(phase_progress(&phases[0]), 100);
        assert_eq!(phase_progress(&phases[1]), 0);
    }

    #[test]
    fn milestone_status_follows_payments() {
        assert_eq!(derive_milestone_status(dec!(100), dec!(0)), MilestoneStatus::Pending);
        assert_eq!(
            derive_milestone_status(dec!(100), dec!(40)),
            MilestoneStatus::PartiallyPaid
        );
        assert_eq!(derive_milestone_status(dec!(100), dec!(100)), MilestoneStatus::Paid);
        assert_eq!(derive_milestone_status(dec!(0), dec!(0)), MilestoneStatus::Pending);
    }

    #[test]
    fn totals_sum_every_milestone() {
        let mut first = PaymentMilestone::new(1, "Start", dec!(1000), "On signing");
        first.payments = vec![payment(dec!(250)), payment(dec!(125.50))];
        let second = PaymentMilestone::new(2, "Roof", dec!(3000), "On completion");

        assert_eq!(milestone_paid(&first), dec!(375.50));
        assert_eq!(milestone_remaining(&first), dec!(624.50));

        let totals = milestone_totals(&[first, second]);
        assert_eq!(totals.total, dec!(4000));
        assert_eq!(totals.paid, dec!(375.50));
        assert_eq!(totals.remaining, dec!(3624.50));
        assert_eq!(totals.progress, 9);
    }

    #[test]
    fn totals_of_nothing_are_zero() {
        let totals = milestone_totals(&[]);
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.progress, 0);
    }

    #[test]
    fn progress_reaches_100_only_when_everything_is_done() {
        use TaskStatus::*;
        let mut statuses = vec![Completed; 200];
        statuses[0] = Pending;
        assert_eq!(phase_progress(&phase_with(&statuses)), 99);

        statuses[0] = Completed;
        assert_eq!(phase_progress(&phase_with(&statuses)), 100);

        let mut first = PaymentMilestone::new(1, "Start", dec!(1000), "On signing");
        first.payments = vec![payment(dec!(999.999))];
        assert_eq!(milestone_totals(&[first]).progress, 99);
    }

    #[test]
    fn huge_amounts_do_not_overflow() {
        let mut paid = PaymentMilestone::new(1, "Tower", big(1, 27), "On completion");
        paid.payments = vec![payment(big(1, 27))];
        let totals = milestone_totals(&[paid]);
        assert_eq!(totals.progress, 100);
        assert_eq!(totals.remaining, Decimal::ZERO);

        let annex = PaymentMilestone::new(2, "Annex", big(5, 28), "On completion");
        let totals = milestone_totals(&[annex.clone(), annex]);
        assert_eq!(totals.total, Decimal::MAX);
        assert_eq!(totals.progress, 0);
    }

    #[test]
    fn checked_sum_reports_overflow() {
        assert_eq!(
            checked_payments_sum(&[payment(dec!(1.5)), payment(dec!(2))]),
            Some(dec!(3.5))
        );
        assert_eq!(
            checked_payments_sum(&[payment(big(5, 28)), payment(big(5, 28))]),
            None
        );
    }
}
