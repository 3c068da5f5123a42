use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(SecondaryEmailId);
id_newtype!(EducationId);

/// A user record as returned by the backend. The client never fabricates one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub address: String,
    #[serde(default)]
    pub high_school: Option<String>,
    pub primary_email: String,
    #[serde(default)]
    pub secondary_emails: Vec<SecondaryEmail>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub remark1: Option<String>,
    #[serde(default)]
    pub remark2: Option<String>,
    #[serde(default)]
    pub remark3: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryEmail {
    pub id: SecondaryEmailId,
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub id: EducationId,
    pub user_id: UserId,
    pub institution_name: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub institution_type: Option<String>,
}

/// Secondary email entry without identifiers, sent on create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryEmailDraft {
    pub email: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationDraft {
    pub institution_name: String,
    pub student_id: Option<String>,
    pub institution_type: Option<String>,
}

/// Body of a create or update call. On update the backend replaces both child
/// collections with the ones given here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub full_name: String,
    pub birth_date: String,
    pub address: String,
    pub high_school: Option<String>,
    pub primary_email: String,
    pub secondary_emails: Vec<SecondaryEmailDraft>,
    pub educations: Vec<EducationDraft>,
    pub remark1: Option<String>,
    pub remark2: Option<String>,
    pub remark3: Option<String>,
}

impl From<&SecondaryEmail> for SecondaryEmailDraft {
    fn from(value: &SecondaryEmail) -> Self {
        Self {
            email: value.email.clone(),
            description: value.description.clone(),
        }
    }
}

impl From<&Education> for EducationDraft {
    fn from(value: &Education) -> Self {
        Self {
            institution_name: value.institution_name.clone(),
            student_id: value.student_id.clone(),
            institution_type: value.institution_type.clone(),
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
