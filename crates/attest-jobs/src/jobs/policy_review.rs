//! Flags overdue policies and notifies their owners.
//!
//! The overdue set is computed from the schedule timestamp, not the wall
//! clock, so a delayed fire still evaluates the day it was meant for.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use attest_core::entities::Policy;
use attest_core::redact::redact_secrets;
use attest_core::review::{is_overdue, next_review_date};
use attest_db::error::DatabaseError;
use attest_providers::EmailMessage;

use crate::env::{JobSettings, TaskOptions};
use crate::error::JobError;
use crate::jobs::POLICY_REVIEW;
use crate::metadata::{KEY_COMPLETED, KEY_FAILED, KEY_TOTAL};
use crate::pacer::Pacer;
use crate::retry::RetryPolicy;
use crate::scheduler::ScheduledRun;
use crate::task::{Task, TaskContext};

/// Ids of the policies the first attempt found overdue.
pub const KEY_REVIEW_IDS: &str = "review_ids";
/// Ids of the policies whose owner has been emailed, across attempts.
pub const KEY_NOTIFIED_IDS: &str = "notified_ids";
const KEY_CANDIDATES: &str = "candidates";
const KEY_MARKED: &str = "marked";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyReviewSummary {
    /// Published policies with a cadence and review date.
    pub candidates: usize,
    pub overdue: usize,
    /// Rows moved to `needs_review`.
    pub marked: u64,
    /// Owners emailed by this run, counting earlier attempts.
    pub notified: usize,
    pub notify_failed: usize,
    pub skipped_no_owner: usize,
}

pub struct PolicyReviewTask {
    pacer: Pacer,
    options: TaskOptions,
}

impl PolicyReviewTask {
    #[must_use]
    pub fn new(settings: &JobSettings) -> Self {
        Self {
            pacer: Pacer::new(settings.email_batch_size, settings.email_interval),
            options: settings.orchestrator,
        }
    }

    #[must_use]
    pub const fn pacer(&self) -> &Pacer {
        &self.pacer
    }
}

fn review_email(policy: &Policy, owner: &str, today: NaiveDate) -> EmailMessage {
    let due = policy
        .review_date
        .zip(policy.frequency)
        .and_then(|(date, frequency)| next_review_date(date, frequency))
        .unwrap_or(today);
    EmailMessage {
        to: owner.to_string(),
        subject: format!("Policy review due: {}", policy.name),
        text: format!(
            "The policy \"{}\" was due for review on {due}. It has been moved to \"needs review\" \
             until it is re-approved.",
            policy.name
        ),
    }
}

#[async_trait]
impl Task for PolicyReviewTask {
    type Input = ScheduledRun;
    type Output = PolicyReviewSummary;

    fn id(&self) -> &'static str {
        POLICY_REVIEW
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.options.retry
    }

    fn max_duration(&self) -> Duration {
        self.options.max_duration
    }

    async fn run(
        &self,
        input: &ScheduledRun,
        ctx: &TaskContext,
    ) -> Result<PolicyReviewSummary, JobError> {
        let service = ctx.service();
        let meta = ctx.metadata();
        let today = input.timestamp.date_naive();

        let (candidates, overdue) = overdue_set(ctx, today).await?;
        let mut summary = PolicyReviewSummary {
            candidates,
            overdue: overdue.len(),
            ..Default::default()
        };

        // Only rows still `published` change, so a retry adds nothing twice.
        let ids: Vec<String> = overdue.iter().map(|p| p.id.clone()).collect();
        let marked = service.mark_needs_review(&ids).await?;
        let marked = meta.increment(KEY_MARKED, i64::try_from(marked).unwrap_or(i64::MAX));
        summary.marked = u64::try_from(marked).unwrap_or_default();

        let messages: Vec<(String, EmailMessage)> = overdue
            .iter()
            .filter_map(|p| {
                p.owner_email
                    .as_deref()
                    .map(str::trim)
                    .filter(|owner| !owner.is_empty())
                    .map(|owner| (p.id.clone(), review_email(p, owner, today)))
            })
            .collect();
        summary.skipped_no_owner = overdue.len() - messages.len();

        let notified: HashSet<String> = string_list(meta.get(KEY_NOTIFIED_IDS)).into_iter().collect();
        meta.set(KEY_TOTAL, messages.len());
        meta.set(KEY_COMPLETED, notified.len());
        meta.set(KEY_FAILED, 0);
        ctx.flush_metadata().await?;
        let pending: Vec<(String, EmailMessage)> = messages
            .into_iter()
            .filter(|(id, _)| !notified.contains(id))
            .collect();
        summary.notified = notified.len();

        match ctx.env().email.as_ref() {
            Some(email) if !pending.is_empty() => {
                let outcomes = self
                    .pacer
                    .run(pending, |(policy_id, message)| async move {
                        let outcome = email.send(&message).await;
                        match &outcome {
                            Ok(_) => {
                                meta.append(KEY_NOTIFIED_IDS, policy_id.as_str());
                                meta.increment(KEY_COMPLETED, 1);
                            }
                            Err(e) => {
                                meta.increment(KEY_FAILED, 1);
                                tracing::warn!(
                                    to = %message.to,
                                    error = %redact_secrets(&e.to_string()),
                                    "review notification failed"
                                );
                            }
                        }
                        outcome
                    })
                    .await;
                let sent = outcomes.iter().filter(|o| o.is_ok()).count();
                summary.notified += sent;
                summary.notify_failed = outcomes.len() - sent;
                ctx.flush_metadata().await?;
            }
            Some(_) => {}
            None if !pending.is_empty() => {
                tracing::warn!(owners = pending.len(), "email not configured, skipping review notifications");
            }
            None => {}
        }

        tracing::info!(
            candidates = summary.candidates,
            overdue = summary.overdue,
            marked = summary.marked,
            notified = summary.notified,
            notify_failed = summary.notify_failed,
            attempt = ctx.attempt(),
            "policy review finished"
        );
        Ok(summary)
    }
}

/// Candidate count and overdue policies for this run.
///
/// The first attempt computes the set and records it in run metadata before
/// anything is marked. Later attempts reload those ids, because the bulk
/// update has already taken them out of `published`.
async fn overdue_set(ctx: &TaskContext, today: NaiveDate) -> Result<(usize, Vec<Policy>), JobError> {
    let service = ctx.service();
    let meta = ctx.metadata();

    if let Some(ids) = meta.get(KEY_REVIEW_IDS) {
        let mut policies = Vec::new();
        for id in string_list(Some(ids)) {
            match service.get_policy(&id).await {
                Ok(policy) => policies.push(policy),
                // Deleted since the first attempt.
                Err(DatabaseError::NoResult) => {}
                Err(e) => return Err(e.into()),
            }
        }
        let candidates = meta
            .get_i64(KEY_CANDIDATES)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(policies.len());
        return Ok((candidates, policies));
    }

    let candidates = service.list_review_candidates().await?;
    let count = candidates.len();
    let overdue: Vec<Policy> = candidates
        .into_iter()
        .filter(|p| is_overdue(p, today))
        .collect();
    meta.set(KEY_CANDIDATES, count);
    meta.set(
        KEY_REVIEW_IDS,
        overdue.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
    );
    Ok((count, overdue))
}

fn string_list(value: Option<Value>) -> Vec<String> {
    value
        .as_ref()
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
