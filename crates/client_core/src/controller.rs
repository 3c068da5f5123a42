//! Client state machine for the user directory screen.
//!
//! Each operation moves its own [`Phase`] from `InFlight` to a terminal state
//! on every path, so no loading indicator can be left behind. The list is only
//! ever replaced by a fresh server response; mutations never edit it locally.

use shared::{
    domain::{User, UserId},
    protocol::ImportReport,
};
use tracing::{debug, info, warn};

use crate::{
    api::{DirectoryApi, ImportFile, ListQuery},
    disposition::filename_from_disposition,
    error::ClientError,
    form::UserForm,
};

const DEFAULT_IMPORT_MESSAGE: &str = "Import completed.";
const NO_FILE_SELECTED_MESSAGE: &str = "Please select a CSV file to import.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed(String),
}

impl Phase {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Phase::InFlight)
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Phase::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// What an operation ended with, for callers that need an exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
    /// Nothing was sent: the user declined, or there was nothing to send.
    Skipped,
}

/// Blocking user dialogs.
pub trait Prompt {
    fn confirm(&mut self, message: &str) -> bool;
    fn notify(&mut self, message: &str);
}

/// Destination for exported bytes.
///
/// Bytes are staged into a temporary handle, saved under a file name, and the
/// handle is released afterwards whether or not saving worked.
pub trait DownloadSink {
    type Handle;

    fn stage(&mut self, bytes: &[u8]) -> anyhow::Result<Self::Handle>;
    fn save(&mut self, handle: &Self::Handle, filename: &str) -> anyhow::Result<()>;
    fn release(&mut self, handle: Self::Handle);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormState {
    #[default]
    Closed,
    Open(OpenForm),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenForm {
    editing: Option<User>,
    pub draft: UserForm,
    submission: Phase,
}

impl OpenForm {
    /// User being edited; `None` means the form creates a new user.
    pub fn editing(&self) -> Option<&User> {
        self.editing.as_ref()
    }

    pub fn submission(&self) -> &Phase {
        &self.submission
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportState {
    selected: Option<ImportFile>,
    phase: Phase,
}

impl ImportState {
    pub fn selected(&self) -> Option<&ImportFile> {
        self.selected.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailState {
    user: Option<User>,
    phase: Phase,
}

impl DetailState {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }
}

pub struct DirectoryController<A, P> {
    api: A,
    prompt: P,
    query: ListQuery,
    users: Vec<User>,
    list: Phase,
    error: Option<String>,
    form: FormState,
    export: Phase,
    import: ImportState,
    detail: DetailState,
}

impl<A: DirectoryApi, P: Prompt> DirectoryController<A, P> {
    pub fn new(api: A, prompt: P) -> Self {
        Self {
            api,
            prompt,
            query: ListQuery::default(),
            users: Vec::new(),
            list: Phase::Idle,
            error: None,
            form: FormState::Closed,
            export: Phase::Idle,
            import: ImportState::default(),
            detail: DetailState::default(),
        }
    }

    pub fn with_query(mut self, query: ListQuery) -> Self {
        self.query = query;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    /// Users in server order, as of the last successful fetch.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn is_loading(&self) -> bool {
        self.list.is_in_flight()
    }

    pub fn list_phase(&self) -> &Phase {
        &self.list
    }

    /// Inline error text from the last failed fetch, submit or import.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn draft_mut(&mut self) -> Option<&mut UserForm> {
        match &mut self.form {
            FormState::Open(form) => Some(&mut form.draft),
            FormState::Closed => None,
        }
    }

    pub fn export_phase(&self) -> &Phase {
        &self.export
    }

    pub fn import_state(&self) -> &ImportState {
        &self.import
    }

    pub fn detail(&self) -> &DetailState {
        &self.detail
    }

    pub async fn fetch_users(&mut self) -> Outcome {
        self.list = Phase::InFlight;
        self.error = None;

        match self.api.list_users(&self.query).await {
            Ok(users) => {
                debug!(count = users.len(), "user list loaded");
                self.users = users;
                self.list = Phase::Succeeded;
                Outcome::Succeeded
            }
            Err(err) => {
                warn!(%err, "failed to load users");
                let message = format!("Failed to load users: {err}");
                self.error = Some(message.clone());
                self.list = Phase::Failed(message);
                Outcome::Failed
            }
        }
    }

    /// Deletes after confirmation, then reloads the list from the server.
    pub async fn delete_user(&mut self, user_id: UserId) -> Outcome {
        let question = format!("Are you sure you want to delete user ID {user_id}?");
        if !self.prompt.confirm(&question) {
            debug!(%user_id, "delete cancelled");
            return Outcome::Skipped;
        }

        match self.api.delete_user(user_id).await {
            Ok(()) => {
                info!(%user_id, "user deleted");
                self.prompt
                    .notify(&format!("User ID {user_id} deleted successfully."));
                self.fetch_users().await;
                Outcome::Succeeded
            }
            Err(err) => {
                warn!(%user_id, %err, "failed to delete user");
                self.prompt
                    .notify(&format!("Failed to delete user: {err}"));
                Outcome::Failed
            }
        }
    }

    pub fn open_create(&mut self) {
        self.form = FormState::Open(OpenForm {
            editing: None,
            draft: UserForm::default(),
            submission: Phase::Idle,
        });
    }

    pub fn open_edit(&mut self, user: User) {
        let draft = UserForm::from_user(&user);
        self.form = FormState::Open(OpenForm {
            editing: Some(user),
            draft,
            submission: Phase::Idle,
        });
    }

    pub fn close_form(&mut self) {
        self.form = FormState::Closed;
    }

    /// Sends the draft as an update when editing, otherwise as a create. On
    /// failure the form stays open with the draft untouched.
    pub async fn submit_form(&mut self) -> Outcome {
        let FormState::Open(form) = &mut self.form else {
            warn!("submit requested without an open form");
            return Outcome::Skipped;
        };
        form.submission = Phase::InFlight;
        self.error = None;

        let payload = form.draft.to_payload();
        let result = match form.editing.as_ref().map(|user| user.id) {
            Some(user_id) => self
                .api
                .update_user(user_id, &payload)
                .await
                .map(|_| "User updated successfully!"),
            None => self
                .api
                .create_user(&payload)
                .await
                .map(|_| "User added successfully!"),
        };

        match result {
            Ok(message) => {
                self.form = FormState::Closed;
                self.prompt.notify(message);
                self.fetch_users().await;
                Outcome::Succeeded
            }
            Err(err) => {
                warn!(%err, "failed to submit user form");
                let message = format!("Submission failed: {err}");
                form.submission = Phase::Failed(message.clone());
                self.error = Some(message);
                Outcome::Failed
            }
        }
    }

    pub async fn export_csv<S: DownloadSink>(&mut self, sink: &mut S) -> Outcome {
        self.export = Phase::InFlight;

        let export = match self.api.export_csv().await {
            Ok(export) => export,
            Err(err) => return self.export_failed(&err),
        };
        let filename = filename_from_disposition(export.content_disposition.as_deref());

        let handle = match sink.stage(&export.bytes) {
            Ok(handle) => handle,
            Err(err) => return self.export_failed(&format!("{err:#}")),
        };
        let saved = sink.save(&handle, &filename);
        sink.release(handle);

        match saved {
            Ok(()) => {
                info!(%filename, size_bytes = export.bytes.len(), "users exported");
                self.export = Phase::Succeeded;
                Outcome::Succeeded
            }
            Err(err) => self.export_failed(&format!("{err:#}")),
        }
    }

    fn export_failed(&mut self, err: &dyn std::fmt::Display) -> Outcome {
        warn!(%err, "failed to export users");
        let message = format!("Failed to export users: {err}");
        self.prompt.notify(&message);
        self.export = Phase::Failed(message);
        Outcome::Failed
    }

    pub fn select_file(&mut self, file: Option<ImportFile>) {
        if let Some(file) = &file {
            debug!(file = %file.name, "import file selected");
        }
        self.import.selected = file;
    }

    /// Uploads the selected file. The selection is consumed whatever the
    /// result.
    pub async fn import_selected(&mut self) -> Outcome {
        let Some(file) = self.import.selected.take() else {
            self.prompt.notify(NO_FILE_SELECTED_MESSAGE);
            return Outcome::Skipped;
        };

        self.import.phase = Phase::InFlight;
        self.error = None;
        debug!(file = %file.name, size_bytes = file.bytes.len(), "importing users");

        match self.api.import_csv(file).await {
            Ok(report) => {
                let message = import_summary(&report);
                info!(rejected_rows = report.errors.len(), "csv import finished");
                self.import.phase = Phase::Succeeded;
                self.prompt.notify(&message);
                self.fetch_users().await;
                Outcome::Succeeded
            }
            Err(err) => {
                warn!(%err, "failed to import users");
                let message = format!("Import failed: {err}");
                self.error = Some(message.clone());
                self.prompt.notify(&message);
                self.import.phase = Phase::Failed(message);
                Outcome::Failed
            }
        }
    }

    pub async fn fetch_user_detail(&mut self, user_id: UserId) -> Outcome {
        self.detail = DetailState {
            user: None,
            phase: Phase::InFlight,
        };

        match self.api.get_user(user_id).await {
            Ok(user) => {
                self.detail.user = Some(user);
                self.detail.phase = Phase::Succeeded;
                Outcome::Succeeded
            }
            Err(err) => {
                warn!(%user_id, %err, "failed to load user details");
                self.detail.phase = Phase::Failed(format!(
                    "Failed to load user details: {}",
                    detail_reason(&err)
                ));
                Outcome::Failed
            }
        }
    }
}

/// Message shown after a successful import, listing any rejected rows.
pub fn import_summary(report: &ImportReport) -> String {
    let mut message = report
        .message
        .clone()
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_IMPORT_MESSAGE.to_string());
    if !report.errors.is_empty() {
        message.push_str("\n\nErrors/Skipped:\n");
        message.push_str(&report.errors.join("\n"));
    }
    message
}

fn detail_reason(err: &ClientError) -> String {
    if err.is_not_found() {
        "User not found".to_string()
    } else {
        err.to_string()
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
