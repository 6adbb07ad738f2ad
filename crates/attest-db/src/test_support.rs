//! Shared fixtures for repository unit tests.

use attest_core::entities::{Connection, Organization};

use crate::service::AttestService;

pub async fn test_service() -> AttestService {
    AttestService::new_local(":memory:").await.unwrap()
}

pub async fn seed_org(svc: &AttestService, name: &str) -> Organization {
    svc.create_organization(name).await.unwrap()
}

pub async fn seed_connection(svc: &AttestService, org: &Organization, provider: &str) -> Connection {
    svc.create_connection(&org.id, provider).await.unwrap()
}
