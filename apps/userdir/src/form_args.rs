use clap::Args;
use client_core::UserForm;
use shared::domain::{EducationDraft, SecondaryEmailDraft};

/// User fields accepted by `create` and `update`. Unset flags leave the
/// draft as it is; an empty value clears an optional field.
#[derive(Args, Debug, Default, Clone)]
pub struct UserArgs {
    #[arg(long)]
    pub full_name: Option<String>,
    /// Date of birth as YYYY-MM-DD.
    #[arg(long)]
    pub birth_date: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub high_school: Option<String>,
    #[arg(long)]
    pub primary_email: Option<String>,
    /// Adds a secondary email; may be repeated.
    #[arg(
        long = "secondary-email",
        value_name = "EMAIL[:DESCRIPTION]",
        value_parser = parse_secondary_email
    )]
    pub secondary_emails: Vec<SecondaryEmailDraft>,
    /// Adds an education entry; may be repeated.
    #[arg(
        long = "education",
        value_name = "NAME[:STUDENT_ID[:TYPE]]",
        value_parser = parse_education
    )]
    pub educations: Vec<EducationDraft>,
    #[arg(long)]
    pub remark1: Option<String>,
    #[arg(long)]
    pub remark2: Option<String>,
    #[arg(long)]
    pub remark3: Option<String>,
}

impl UserArgs {
    /// Flags a new user cannot be created without.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("--full-name", &self.full_name),
            ("--birth-date", &self.birth_date),
            ("--address", &self.address),
            ("--primary-email", &self.primary_email),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(flag, _)| flag)
        .collect()
    }

    /// Writes the given flags into the draft. New child entries are appended
    /// after the existing ones.
    pub fn apply(self, draft: &mut UserForm) {
        let fields = [
            (self.full_name, &mut draft.full_name),
            (self.birth_date, &mut draft.birth_date),
            (self.address, &mut draft.address),
            (self.high_school, &mut draft.high_school),
            (self.primary_email, &mut draft.primary_email),
            (self.remark1, &mut draft.remark1),
            (self.remark2, &mut draft.remark2),
            (self.remark3, &mut draft.remark3),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        draft.secondary_emails.extend(self.secondary_emails);
        draft.educations.extend(self.educations);
    }
}

pub fn parse_secondary_email(raw: &str) -> Result<SecondaryEmailDraft, String> {
    let (email, description) = match raw.split_once(':') {
        Some((email, description)) => (email, Some(description)),
        None => (raw, None),
    };
    let email = email.trim();
    if email.is_empty() {
        return Err("secondary email must not be empty".to_string());
    }
    Ok(SecondaryEmailDraft {
        email: email.to_string(),
        description: non_blank(description),
    })
}

pub fn parse_education(raw: &str) -> Result<EducationDraft, String> {
    let mut parts = raw.splitn(3, ':');
    let institution_name = parts.next().unwrap_or_default().trim();
    if institution_name.is_empty() {
        return Err("institution name must not be empty".to_string());
    }
    Ok(EducationDraft {
        institution_name: institution_name.to_string(),
        student_id: non_blank(parts.next()),
        institution_type: non_blank(parts.next()),
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "tests/form_args_tests.rs"]
mod tests;
