//! Provider clients against a loopback `tiny_http` server.
//!
//! Each test serves canned responses and asserts on the captured request
//! (method, path, bearer token, JSON body) and the mapped result.

use std::io::Read;
use std::sync::mpsc;

use chrono::Utc;
use pretty_assertions::assert_eq;

use attest_config::{DirectoryConfig, EmailConfig, ScannerConfig, VectorConfig};
use attest_core::entities::Connection;
use attest_core::enums::ConnectionStatus;
use attest_providers::{
    CloudScanner, EmailMessage, EmailSender, EmployeeDirectory, GoogleWorkspaceDirectory,
    HttpCloudScanner, HttpEmailSender, HttpVectorStore, ProviderError, RipplingDirectory,
    ScanRequest, VectorStore,
};

struct Captured {
    method: String,
    url: String,
    auth: Option<String>,
    body: String,
}

/// Serve `responses` in order, one per request, then stop.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<Captured>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for (status, body) in responses {
            let mut request = server.recv().unwrap();
            let mut content = String::new();
            request.as_reader().read_to_string(&mut content).unwrap();
            let auth = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());
            tx.send(Captured {
                method: request.method().to_string(),
                url: request.url().to_string(),
                auth,
                body: content,
            })
            .unwrap();
            let header =
                tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .unwrap();
            request
                .respond(
                    tiny_http::Response::from_string(body)
                        .with_status_code(status)
                        .with_header(header),
                )
                .unwrap();
        }
    });
    (format!("http://127.0.0.1:{port}"), rx)
}

fn connection(provider: &str) -> Connection {
    let now = Utc::now();
    Connection {
        id: "con-00000001".into(),
        organization_id: "org-00000001".into(),
        provider: provider.into(),
        status: ConnectionStatus::Active,
        last_synced_at: None,
        created_at: now,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scanner_posts_connection_and_counts_results() {
    let (url, rx) = serve(vec![(
        200,
        r#"{"check_id":"scan-1","results":[{"id":"a","title":"A","passed":true},{"id":"b","title":"B","passed":false}]}"#,
    )]);
    let scanner = HttpCloudScanner::from_config(&ScannerConfig {
        url,
        token: "scan-token".into(),
    })
    .unwrap();

    let report = scanner
        .scan(&ScanRequest {
            connection_id: "con-00000001".into(),
            organization_id: "org-00000001".into(),
            provider: "aws".into(),
        })
        .await
        .unwrap();
    assert_eq!(report.check_id, "scan-1");
    assert_eq!((report.passed_count(), report.failed_count()), (1, 1));

    let req = rx.recv().unwrap();
    assert_eq!(req.method, "POST");
    assert_eq!(req.url, "/v1/scans");
    assert_eq!(req.auth.as_deref(), Some("Bearer scan-token"));
    let body: serde_json::Value = serde_json::from_str(&req.body).unwrap();
    assert_eq!(body["provider"], "aws");
}

#[tokio::test]
async fn scanner_rate_limit_surfaces_retry_after() {
    let (url, _rx) = serve(vec![(429, "{}")]);
    let scanner = HttpCloudScanner::from_config(&ScannerConfig {
        url,
        token: String::new(),
    })
    .unwrap();
    let err = scanner
        .scan(&ScanRequest {
            connection_id: "con-1".into(),
            organization_id: "org-1".into(),
            provider: "gcp".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::RateLimited {
            retry_after_secs: 60
        }
    ));
}

// ---------------------------------------------------------------------------
// Vector store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn vector_delete_sends_id_array() {
    let (url, rx) = serve(vec![(200, r#"{"result":{"deleted":2}}"#)]);
    let store = HttpVectorStore::from_config(&VectorConfig {
        url,
        token: "vt".into(),
    })
    .unwrap();

    let ids = vec!["manual_answer_ans-1".to_string(), "manual_answer_ans-2".to_string()];
    assert_eq!(store.delete(&ids).await.unwrap(), 2);

    let req = rx.recv().unwrap();
    assert_eq!(req.url, "/delete");
    let body: Vec<String> = serde_json::from_str(&req.body).unwrap();
    assert_eq!(body, ids);
}

#[tokio::test]
async fn vector_server_error_is_api_error() {
    let (url, _rx) = serve(vec![(500, "index unavailable")]);
    let store = HttpVectorStore::from_config(&VectorConfig {
        url,
        token: "vt".into(),
    })
    .unwrap();
    let err = store.delete(&["x".to_string()]).await.unwrap_err();
    assert!(matches!(err, ProviderError::Api { status: 500, .. }));
    assert!(err.is_transient());
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

#[tokio::test]
async fn email_send_returns_provider_id() {
    let (url, rx) = serve(vec![(200, r#"{"id":"msg_123"}"#)]);
    let sender = HttpEmailSender::from_config(&EmailConfig {
        api_url: url,
        api_key: "re_key".into(),
        ..Default::default()
    })
    .unwrap();

    let id = sender
        .send(&EmailMessage {
            to: "owner@example.com".into(),
            subject: "Policy review due".into(),
            text: "Incident Response is due for review.".into(),
        })
        .await
        .unwrap();
    assert_eq!(id, "msg_123");

    let req = rx.recv().unwrap();
    assert_eq!(req.url, "/emails");
    assert_eq!(req.auth.as_deref(), Some("Bearer re_key"));
    let body: serde_json::Value = serde_json::from_str(&req.body).unwrap();
    assert_eq!(body["to"][0], "owner@example.com");
    assert_eq!(body["subject"], "Policy review due");
}

// ---------------------------------------------------------------------------
// Directories
// ---------------------------------------------------------------------------

#[tokio::test]
async fn google_directory_follows_page_tokens() {
    let (url, rx) = serve(vec![
        (
            200,
            r#"{"users":[{"primaryEmail":"a@example.com","suspended":false}],"nextPageToken":"p 2"}"#,
        ),
        (
            200,
            r#"{"users":[{"primaryEmail":"b@example.com","suspended":true}]}"#,
        ),
    ]);
    let directory = GoogleWorkspaceDirectory::from_config(&DirectoryConfig {
        google_workspace_url: url,
        token: "gw".into(),
        ..Default::default()
    })
    .unwrap();

    let employees = directory
        .list_employees(&connection("google-workspace"))
        .await
        .unwrap();
    let emails: Vec<_> = employees.iter().map(|e| e.email.as_str()).collect();
    assert_eq!(emails, vec!["a@example.com", "b@example.com"]);

    let first = rx.recv().unwrap();
    assert!(first.url.starts_with("/admin/directory/v1/users?customer=my_customer"));
    let second = rx.recv().unwrap();
    assert!(second.url.ends_with("&pageToken=p%202"), "got {}", second.url);
}

#[tokio::test]
async fn rippling_directory_lists_employees() {
    let (url, rx) = serve(vec![(
        200,
        r#"{"results":[{"work_email":"a@example.com","name":"A","department":"Ops","employment_status":"ACTIVE"}]}"#,
    )]);
    let directory = RipplingDirectory::from_config(&DirectoryConfig {
        rippling_url: url,
        token: "rp".into(),
        ..Default::default()
    })
    .unwrap();

    let employees = directory.list_employees(&connection("rippling")).await.unwrap();
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0].department.as_deref(), Some("Ops"));
    assert_eq!(rx.recv().unwrap().url, "/platform/api/employees");
}
