//! JSON shape checks for entities that cross the job boundary.

use chrono::{NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;

use attest_core::entities::{Employee, JobRun, Policy};
use attest_core::enums::{PolicyStatus, ReviewFrequency, RunStatus};

#[test]
fn policy_serializes_review_date_as_plain_date() {
    let ts = Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap();
    let policy = Policy {
        id: "pol-0000abcd".into(),
        organization_id: "org-00000001".into(),
        name: "Incident Response".into(),
        status: PolicyStatus::Published,
        frequency: Some(ReviewFrequency::Quarterly),
        review_date: NaiveDate::from_ymd_opt(2025, 1, 31),
        owner_email: Some("ciso@example.com".into()),
        created_at: ts,
        updated_at: ts,
    };

    let json = serde_json::to_value(&policy).unwrap();
    assert_eq!(json["status"], "published");
    assert_eq!(json["frequency"], "quarterly");
    assert_eq!(json["review_date"], "2025-01-31");

    let back: Policy = serde_json::from_value(json).unwrap();
    assert_eq!(back, policy);
}

#[test]
fn job_run_keeps_metadata_object() {
    let run = JobRun {
        id: "run-00000001".into(),
        task_id: "cloud-scan".into(),
        parent_run_id: None,
        status: RunStatus::Running,
        attempts: 1,
        metadata: Some(serde_json::json!({ "total": 120, "completed": 50 })),
        output: None,
        error: None,
        started_at: Utc::now(),
        finished_at: None,
    };
    let json = serde_json::to_value(&run).unwrap();
    assert_eq!(json["metadata"]["completed"], 50);
    assert_eq!(json["status"], "running");
}

#[test]
fn employee_defaults_are_explicit() {
    let raw = r#"{"email":"a@example.com","name":null,"department":"Eng","active":false}"#;
    let employee: Employee = serde_json::from_str(raw).unwrap();
    assert!(!employee.active);
    assert_eq!(employee.department.as_deref(), Some("Eng"));
}
