use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::UserId;

/// Multipart field name the backend import endpoint reads the CSV from.
pub const IMPORT_FILE_FIELD: &str = "file";

pub fn users_route() -> &'static str {
    "/api/users/"
}

pub fn user_route(user_id: UserId) -> String {
    format!("/api/users/{user_id}")
}

pub fn export_csv_route() -> &'static str {
    "/api/users/export/csv"
}

pub fn import_csv_route() -> &'static str {
    "/api/users/import/csv"
}

/// Backend answer to a CSV import, on success and on failure alike.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// The backend sends `"errors": null` when a row-level error list is absent.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
