//! Review-date arithmetic for policy cadences.

use chrono::{Months, NaiveDate};

use crate::entities::Policy;
use crate::enums::{PolicyStatus, ReviewFrequency};

/// Date the next review is due, `review_date` plus the cadence in months.
///
/// Month addition clamps to the last day of the target month, so
/// Jan 31 + 1 month is Feb 28 (or Feb 29 in a leap year). Returns `None`
/// only when the result overflows `NaiveDate`.
#[must_use]
pub fn next_review_date(review_date: NaiveDate, frequency: ReviewFrequency) -> Option<NaiveDate> {
    review_date.checked_add_months(Months::new(frequency.months()))
}

/// Whether a policy is due for review on `today`.
///
/// Only published policies with both a cadence and a review date qualify.
/// A review due today counts as overdue.
#[must_use]
pub fn is_overdue(policy: &Policy, today: NaiveDate) -> bool {
    if policy.status != PolicyStatus::Published {
        return false;
    }
    let (Some(frequency), Some(review_date)) = (policy.frequency, policy.review_date) else {
        return false;
    };
    next_review_date(review_date, frequency).is_some_and(|due| due <= today)
}
