use super::*;
use crate::api::{CsvExport, ProxyClient};
use async_trait::async_trait;
use reqwest::StatusCode;
use shared::domain::UserPayload;
use std::{collections::HashMap, sync::Mutex};

fn user(id: i64, name: &str) -> User {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "full_name": name,
        "birth_date": "1990-01-01",
        "address": "1 Main St",
        "high_school": null,
        "primary_email": format!("user{id}@example.com"),
        "secondary_emails": [
            { "id": id * 10, "user_id": id, "email": format!("alt{id}@example.com"), "description": "alt" }
        ],
        "educations": []
    }))
    .expect("user")
}

fn user_from_payload(id: i64, payload: &UserPayload) -> User {
    let mut value = serde_json::to_value(payload).expect("payload");
    value["id"] = serde_json::json!(id);
    value["secondary_emails"] = serde_json::json!([]);
    value["educations"] = serde_json::json!([]);
    serde_json::from_value(value).expect("user")
}

/// In-memory directory that records every call in order.
#[derive(Default)]
struct FakeApi {
    users: Mutex<Vec<User>>,
    calls: Mutex<Vec<String>>,
    payloads: Mutex<Vec<UserPayload>>,
    failures: Mutex<HashMap<&'static str, (StatusCode, Option<String>)>>,
    export: Option<CsvExport>,
    import_report: ImportReport,
}

impl FakeApi {
    fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
            ..Self::default()
        }
    }

    fn failing(self, operation: &'static str, status: StatusCode, detail: Option<&str>) -> Self {
        self.failures
            .lock()
            .expect("lock")
            .insert(operation, (status, detail.map(str::to_string)));
        self
    }

    fn fail_from_now(&self, operation: &'static str, status: StatusCode) {
        self.failures
            .lock()
            .expect("lock")
            .insert(operation, (status, None));
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    fn payloads(&self) -> Vec<UserPayload> {
        self.payloads.lock().expect("lock").clone()
    }

    fn record(&self, operation: &'static str, call: String) -> Result<(), ClientError> {
        self.calls.lock().expect("lock").push(call);
        match self.failures.lock().expect("lock").get(operation) {
            Some((status, detail)) => Err(ClientError::Status {
                status: *status,
                detail: detail.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DirectoryApi for FakeApi {
    async fn list_users(&self, _query: &ListQuery) -> Result<Vec<User>, ClientError> {
        self.record("list", "list".into())?;
        Ok(self.users.lock().expect("lock").clone())
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, ClientError> {
        self.record("get", format!("get {user_id}"))?;
        self.users
            .lock()
            .expect("lock")
            .iter()
            .find(|user| user.id == user_id)
            .cloned()
            .ok_or(ClientError::Status {
                status: StatusCode::NOT_FOUND,
                detail: None,
            })
    }

    async fn create_user(&self, payload: &UserPayload) -> Result<User, ClientError> {
        self.record("create", "create".into())?;
        self.payloads.lock().expect("lock").push(payload.clone());
        let mut users = self.users.lock().expect("lock");
        let next_id = users.iter().map(|user| user.id.0).max().unwrap_or(0) + 1;
        let created = user_from_payload(next_id, payload);
        users.push(created.clone());
        Ok(created)
    }

    async fn update_user(
        &self,
        user_id: UserId,
        payload: &UserPayload,
    ) -> Result<User, ClientError> {
        self.record("update", format!("update {user_id}"))?;
        self.payloads.lock().expect("lock").push(payload.clone());
        let updated = user_from_payload(user_id.0, payload);
        let mut users = self.users.lock().expect("lock");
        for slot in users.iter_mut().filter(|user| user.id == user_id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    async fn delete_user(&self, user_id: UserId) -> Result<(), ClientError> {
        self.record("delete", format!("delete {user_id}"))?;
        self.users
            .lock()
            .expect("lock")
            .retain(|user| user.id != user_id);
        Ok(())
    }

    async fn export_csv(&self) -> Result<CsvExport, ClientError> {
        self.record("export", "export".into())?;
        Ok(self.export.clone().unwrap_or(CsvExport {
            content_disposition: None,
            bytes: Vec::new(),
        }))
    }

    async fn import_csv(&self, file: ImportFile) -> Result<ImportReport, ClientError> {
        self.record("import", format!("import {}", file.name))?;
        Ok(self.import_report.clone())
    }
}

struct RecordingPrompt {
    answer: bool,
    confirmations: Vec<String>,
    notices: Vec<String>,
}

impl RecordingPrompt {
    fn answering(answer: bool) -> Self {
        Self {
            answer,
            confirmations: Vec::new(),
            notices: Vec::new(),
        }
    }
}

impl Prompt for RecordingPrompt {
    fn confirm(&mut self, message: &str) -> bool {
        self.confirmations.push(message.to_string());
        self.answer
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

#[derive(Default)]
struct RecordingSink {
    staged: Vec<Vec<u8>>,
    saved: Vec<(usize, String)>,
    released: Vec<usize>,
    fail_save_with: Option<String>,
}

impl DownloadSink for RecordingSink {
    type Handle = usize;

    fn stage(&mut self, bytes: &[u8]) -> anyhow::Result<usize> {
        self.staged.push(bytes.to_vec());
        Ok(self.staged.len() - 1)
    }

    fn save(&mut self, handle: &usize, filename: &str) -> anyhow::Result<()> {
        if let Some(err) = &self.fail_save_with {
            anyhow::bail!("{err}");
        }
        self.saved.push((*handle, filename.to_string()));
        Ok(())
    }

    fn release(&mut self, handle: usize) {
        self.released.push(handle);
    }
}

fn controller(api: FakeApi) -> DirectoryController<FakeApi, RecordingPrompt> {
    DirectoryController::new(api, RecordingPrompt::answering(true))
}

#[tokio::test]
async fn fetch_replaces_list_in_server_order() {
    let mut ctl = controller(FakeApi::with_users(vec![user(3, "Cy"), user(1, "Al")]));
    assert_eq!(ctl.fetch_users().await, Outcome::Succeeded);

    let ids: Vec<_> = ctl.users().iter().map(|user| user.id.0).collect();
    assert_eq!(ids, vec![3, 1]);
    assert!(!ctl.is_loading());
    assert_eq!(ctl.list_phase(), &Phase::Succeeded);
    assert_eq!(ctl.error(), None);
}

#[tokio::test]
async fn fetch_failure_keeps_previous_list_and_sets_error() {
    let mut ctl = controller(FakeApi::with_users(vec![user(1, "Al")]));
    ctl.fetch_users().await;
    ctl.api().fail_from_now("list", StatusCode::BAD_GATEWAY);

    assert_eq!(ctl.fetch_users().await, Outcome::Failed);
    assert_eq!(ctl.users().len(), 1);
    assert!(!ctl.is_loading());
    assert_eq!(
        ctl.error(),
        Some("Failed to load users: HTTP error! status: 502")
    );
}

#[tokio::test]
async fn network_fault_on_first_load_leaves_empty_list() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = ProxyClient::new(format!("http://{addr}"));
    let mut ctl = DirectoryController::new(api, RecordingPrompt::answering(true));

    assert_eq!(ctl.fetch_users().await, Outcome::Failed);
    assert!(ctl.users().is_empty());
    assert!(!ctl.is_loading());
    let error = ctl.error().expect("error message");
    assert!(error.starts_with("Failed to load users: "));
    assert!(error.len() > "Failed to load users: ".len());
}

#[tokio::test]
async fn confirmed_delete_refetches_instead_of_removing_locally() {
    let mut ctl = controller(FakeApi::with_users(vec![user(7, "Gus"), user(8, "Hal")]));
    ctl.fetch_users().await;
    // The refetch fails, so any id-7 removal would have to be local.
    ctl.api().fail_from_now("list", StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(ctl.delete_user(UserId(7)).await, Outcome::Succeeded);
    assert_eq!(ctl.api().calls(), vec!["list", "delete 7", "list"]);
    assert!(ctl.users().iter().any(|user| user.id == UserId(7)));
    assert_eq!(
        ctl.prompt().confirmations,
        vec!["Are you sure you want to delete user ID 7?"]
    );
    assert_eq!(
        ctl.prompt().notices,
        vec!["User ID 7 deleted successfully."]
    );
}

#[tokio::test]
async fn delete_refetch_shows_server_state() {
    let mut ctl = controller(FakeApi::with_users(vec![user(7, "Gus"), user(8, "Hal")]));
    ctl.fetch_users().await;

    ctl.delete_user(UserId(7)).await;
    let ids: Vec<_> = ctl.users().iter().map(|user| user.id.0).collect();
    assert_eq!(ids, vec![8]);
}

#[tokio::test]
async fn declined_delete_makes_no_call() {
    let api = FakeApi::with_users(vec![user(7, "Gus")]);
    let mut ctl = DirectoryController::new(api, RecordingPrompt::answering(false));

    assert_eq!(ctl.delete_user(UserId(7)).await, Outcome::Skipped);
    assert!(ctl.api().calls().is_empty());
    assert!(ctl.prompt().notices.is_empty());
}

#[tokio::test]
async fn failed_delete_surfaces_backend_detail() {
    let api = FakeApi::with_users(vec![user(7, "Gus")]).failing(
        "delete",
        StatusCode::NOT_FOUND,
        Some("User not found"),
    );
    let mut ctl = controller(api);

    assert_eq!(ctl.delete_user(UserId(7)).await, Outcome::Failed);
    assert_eq!(ctl.prompt().notices, vec!["Failed to delete user: User not found"]);
    assert_eq!(ctl.api().calls(), vec!["delete 7"]);
}

#[tokio::test]
async fn create_submits_payload_closes_form_and_refetches() {
    let mut ctl = controller(FakeApi::default());
    ctl.open_create();
    let draft = ctl.draft_mut().expect("open form");
    draft.full_name = "Katherine Johnson".into();
    draft.birth_date = "1918-08-26".into();
    draft.address = "Hampton, VA".into();
    draft.primary_email = "kj@example.com".into();
    draft.add_secondary_email().email = "kj@nasa.example".into();

    assert_eq!(ctl.submit_form().await, Outcome::Succeeded);
    assert_eq!(ctl.form(), &FormState::Closed);
    assert_eq!(ctl.api().calls(), vec!["create", "list"]);
    assert_eq!(ctl.prompt().notices, vec!["User added successfully!"]);
    assert_eq!(ctl.users().len(), 1);

    let payload = &ctl.api().payloads()[0];
    assert_eq!(payload.secondary_emails.len(), 1);
    assert_eq!(payload.high_school, None);
}

#[tokio::test]
async fn edit_sends_full_replacement_keyed_by_target() {
    let existing = user(4, "Dot");
    let mut ctl = controller(FakeApi::with_users(vec![existing.clone()]));
    ctl.open_edit(existing);
    ctl.draft_mut().expect("open form").address = "2 Side St".into();

    assert_eq!(ctl.submit_form().await, Outcome::Succeeded);
    assert_eq!(ctl.api().calls(), vec!["update 4", "list"]);
    assert_eq!(ctl.prompt().notices, vec!["User updated successfully!"]);

    let payload = &ctl.api().payloads()[0];
    assert_eq!(payload.address, "2 Side St");
    assert_eq!(payload.secondary_emails.len(), 1);
    assert_eq!(payload.secondary_emails[0].email, "alt4@example.com");
}

#[tokio::test]
async fn failed_submit_keeps_form_open_with_draft() {
    let api = FakeApi::default().failing(
        "create",
        StatusCode::BAD_REQUEST,
        Some("Primary email already registered"),
    );
    let mut ctl = controller(api);
    ctl.open_create();
    ctl.draft_mut().expect("open form").full_name = "Dup".into();

    assert_eq!(ctl.submit_form().await, Outcome::Failed);
    let FormState::Open(form) = ctl.form() else {
        panic!("form must stay open");
    };
    assert_eq!(form.draft.full_name, "Dup");
    assert_eq!(
        form.submission().failure(),
        Some("Submission failed: Primary email already registered")
    );
    assert_eq!(
        ctl.error(),
        Some("Submission failed: Primary email already registered")
    );
    assert_eq!(ctl.api().calls(), vec!["create"]);
}

#[tokio::test]
async fn submit_without_open_form_is_skipped() {
    let mut ctl = controller(FakeApi::default());
    assert_eq!(ctl.submit_form().await, Outcome::Skipped);
    assert!(ctl.api().calls().is_empty());
}

#[tokio::test]
async fn export_saves_under_disposition_name_and_releases() {
    let api = FakeApi {
        export: Some(CsvExport {
            content_disposition: Some(r#"attachment; filename="report.csv""#.into()),
            bytes: b"id\n1\n".to_vec(),
        }),
        ..FakeApi::default()
    };
    let mut ctl = controller(api);
    let mut sink = RecordingSink::default();

    assert_eq!(ctl.export_csv(&mut sink).await, Outcome::Succeeded);
    assert_eq!(sink.staged, vec![b"id\n1\n".to_vec()]);
    assert_eq!(sink.saved, vec![(0, "report.csv".to_string())]);
    assert_eq!(sink.released, vec![0]);
    assert_eq!(ctl.export_phase(), &Phase::Succeeded);
}

#[tokio::test]
async fn export_without_disposition_uses_default_name() {
    let mut ctl = controller(FakeApi::default());
    let mut sink = RecordingSink::default();

    ctl.export_csv(&mut sink).await;
    assert_eq!(sink.saved, vec![(0, "users_export.csv".to_string())]);
}

#[tokio::test]
async fn export_releases_handle_when_save_fails() {
    let mut ctl = controller(FakeApi::default());
    let mut sink = RecordingSink {
        fail_save_with: Some("disk full".into()),
        ..RecordingSink::default()
    };

    assert_eq!(ctl.export_csv(&mut sink).await, Outcome::Failed);
    assert_eq!(sink.released, vec![0]);
    assert_eq!(
        ctl.prompt().notices,
        vec!["Failed to export users: disk full"]
    );
}

#[tokio::test]
async fn export_failure_never_stages() {
    let api = FakeApi::default().failing("export", StatusCode::INTERNAL_SERVER_ERROR, None);
    let mut ctl = controller(api);
    let mut sink = RecordingSink::default();

    assert_eq!(ctl.export_csv(&mut sink).await, Outcome::Failed);
    assert!(sink.staged.is_empty());
    assert_eq!(
        ctl.prompt().notices,
        vec!["Failed to export users: HTTP error! status: 500"]
    );
}

#[tokio::test]
async fn import_without_selection_makes_no_call() {
    let mut ctl = controller(FakeApi::default());
    assert_eq!(ctl.import_selected().await, Outcome::Skipped);
    assert!(ctl.api().calls().is_empty());
    assert_eq!(
        ctl.prompt().notices,
        vec!["Please select a CSV file to import."]
    );
}

#[tokio::test]
async fn import_with_partial_errors_joins_message_and_refetches() {
    let api = FakeApi {
        import_report: ImportReport {
            message: Some("Imported 3, skipped 2".into()),
            errors: vec!["row 4: bad email".into(), "row 9: missing name".into()],
            detail: None,
        },
        ..FakeApi::default()
    };
    let mut ctl = controller(api);
    ctl.select_file(Some(ImportFile {
        name: "people.csv".into(),
        bytes: b"full_name\n".to_vec(),
    }));

    assert_eq!(ctl.import_selected().await, Outcome::Succeeded);
    assert_eq!(
        ctl.prompt().notices,
        vec!["Imported 3, skipped 2\n\nErrors/Skipped:\nrow 4: bad email\nrow 9: missing name"]
    );
    assert_eq!(ctl.api().calls(), vec!["import people.csv", "list"]);
    assert!(ctl.import_state().selected().is_none());
    assert_eq!(ctl.import_state().phase(), &Phase::Succeeded);
}

#[tokio::test]
async fn import_answer_with_null_errors_still_succeeds_and_refetches() {
    use axum::{
        routing::{get, post},
        Json, Router,
    };

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listed = serde_json::to_value(vec![user(1, "Ada")]).expect("users");
    let app = Router::new()
        .route("/api/users/", get(move || async move { Json(listed) }))
        .route(
            "/api/users/import/csv",
            post(|| async {
                Json(serde_json::json!({ "message": "Imported 3", "errors": null }))
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let api = ProxyClient::new(format!("http://{addr}"));
    let mut ctl = DirectoryController::new(api, RecordingPrompt::answering(true));
    ctl.select_file(Some(ImportFile {
        name: "people.csv".into(),
        bytes: b"full_name\nAda\n".to_vec(),
    }));

    assert_eq!(ctl.import_selected().await, Outcome::Succeeded);
    assert_eq!(ctl.prompt().notices, vec!["Imported 3"]);
    assert_eq!(ctl.error(), None);
    assert_eq!(ctl.users().len(), 1);
    assert_eq!(ctl.users()[0].id, UserId(1));
    assert_eq!(ctl.import_state().phase(), &Phase::Succeeded);
}

#[tokio::test]
async fn failed_import_clears_selection_and_reports_detail() {
    let api = FakeApi::default().failing(
        "import",
        StatusCode::BAD_REQUEST,
        Some("Invalid CSV header"),
    );
    let mut ctl = controller(api);
    ctl.select_file(Some(ImportFile {
        name: "broken.csv".into(),
        bytes: b"nope".to_vec(),
    }));

    assert_eq!(ctl.import_selected().await, Outcome::Failed);
    assert!(ctl.import_state().selected().is_none());
    assert_eq!(ctl.error(), Some("Import failed: Invalid CSV header"));
    assert_eq!(ctl.prompt().notices, vec!["Import failed: Invalid CSV header"]);
    assert_eq!(ctl.api().calls(), vec!["import broken.csv"]);
}

#[test]
fn import_summary_defaults_when_message_missing() {
    assert_eq!(import_summary(&ImportReport::default()), "Import completed.");
}

#[tokio::test]
async fn detail_not_found_is_reported_plainly() {
    let mut ctl = controller(FakeApi::with_users(vec![user(1, "Al")]));

    assert_eq!(ctl.fetch_user_detail(UserId(99)).await, Outcome::Failed);
    assert!(ctl.detail().user().is_none());
    assert_eq!(
        ctl.detail().phase().failure(),
        Some("Failed to load user details: User not found")
    );

    assert_eq!(ctl.fetch_user_detail(UserId(1)).await, Outcome::Succeeded);
    assert_eq!(
        ctl.detail().user().map(|user| user.full_name.as_str()),
        Some("Al")
    );
}
