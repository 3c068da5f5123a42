use shared::domain::{EducationDraft, SecondaryEmailDraft, User, UserPayload};

/// Editable draft behind the create/edit form.
///
/// Optional text fields are plain strings while editing; blank values are
/// sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserForm {
    pub full_name: String,
    pub birth_date: String,
    pub address: String,
    pub high_school: String,
    pub primary_email: String,
    pub secondary_emails: Vec<SecondaryEmailDraft>,
    pub educations: Vec<EducationDraft>,
    pub remark1: String,
    pub remark2: String,
    pub remark3: String,
}

impl UserForm {
    /// Draft pre-filled from an existing user. Child entries lose their
    /// identifiers, so saving replaces both collections.
    pub fn from_user(user: &User) -> Self {
        Self {
            full_name: user.full_name.clone(),
            birth_date: user.birth_date.format("%Y-%m-%d").to_string(),
            address: user.address.clone(),
            high_school: user.high_school.clone().unwrap_or_default(),
            primary_email: user.primary_email.clone(),
            secondary_emails: user.secondary_emails.iter().map(Into::into).collect(),
            educations: user.educations.iter().map(Into::into).collect(),
            remark1: user.remark1.clone().unwrap_or_default(),
            remark2: user.remark2.clone().unwrap_or_default(),
            remark3: user.remark3.clone().unwrap_or_default(),
        }
    }

    pub fn add_secondary_email(&mut self) -> &mut SecondaryEmailDraft {
        self.secondary_emails.push(SecondaryEmailDraft::default());
        let last = self.secondary_emails.len() - 1;
        &mut self.secondary_emails[last]
    }

    pub fn remove_secondary_email(&mut self, index: usize) -> Option<SecondaryEmailDraft> {
        (index < self.secondary_emails.len()).then(|| self.secondary_emails.remove(index))
    }

    pub fn add_education(&mut self) -> &mut EducationDraft {
        self.educations.push(EducationDraft::default());
        let last = self.educations.len() - 1;
        &mut self.educations[last]
    }

    pub fn remove_education(&mut self, index: usize) -> Option<EducationDraft> {
        (index < self.educations.len()).then(|| self.educations.remove(index))
    }

    pub fn to_payload(&self) -> UserPayload {
        UserPayload {
            full_name: self.full_name.clone(),
            birth_date: self.birth_date.clone(),
            address: self.address.clone(),
            high_school: non_blank(&self.high_school),
            primary_email: self.primary_email.clone(),
            secondary_emails: self
                .secondary_emails
                .iter()
                .map(|entry| SecondaryEmailDraft {
                    email: entry.email.clone(),
                    description: entry.description.as_deref().and_then(non_blank),
                })
                .collect(),
            educations: self
                .educations
                .iter()
                .map(|entry| EducationDraft {
                    institution_name: entry.institution_name.clone(),
                    student_id: entry.student_id.as_deref().and_then(non_blank),
                    institution_type: entry.institution_type.as_deref().and_then(non_blank),
                })
                .collect(),
            remark1: non_blank(&self.remark1),
            remark2: non_blank(&self.remark2),
            remark3: non_blank(&self.remark3),
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
