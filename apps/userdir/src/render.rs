use std::fmt::Write as _;

use shared::domain::User;

/// Narrowest terminal that still gets the table layout.
pub const TABLE_MIN_WIDTH: usize = 100;
const DEFAULT_WIDTH: usize = 120;
const NOT_AVAILABLE: &str = "N/A";

/// Terminal width from `COLUMNS`, or a default when unset or unreadable.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .filter(|width| *width > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

pub fn render_users(users: &[User], width: usize) -> String {
    if users.is_empty() {
        return "No users found.\n".to_string();
    }
    if width >= TABLE_MIN_WIDTH {
        render_table(users, width)
    } else {
        render_cards(users)
    }
}

fn render_table(users: &[User], width: usize) -> String {
    const HEADERS: [&str; 5] = ["ID", "Full Name", "Primary Email", "Birth Date", "Address"];

    let rows: Vec<[String; 5]> = users
        .iter()
        .map(|user| {
            [
                user.id.to_string(),
                user.full_name.clone(),
                user.primary_email.clone(),
                user.birth_date.to_string(),
                user.address.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in &rows {
        for (slot, cell) in widths.iter_mut().zip(row) {
            *slot = (*slot).max(cell.chars().count());
        }
    }
    // The address column absorbs whatever does not fit.
    let separators = 2 * (HEADERS.len() - 1);
    let fixed: usize = widths[..4].iter().sum::<usize>() + separators;
    widths[4] = widths[4].min(width.saturating_sub(fixed).max(HEADERS[4].len()));

    let mut out = String::new();
    push_row(&mut out, &HEADERS.map(str::to_string), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", truncate(cell, *width), width = *width))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}

fn render_cards(users: &[User]) -> String {
    let mut out = String::new();
    for (index, user) in users.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "[{}] {}", user.id, user.full_name);
        let _ = writeln!(out, "  Email:      {}", user.primary_email);
        let _ = writeln!(out, "  Birth Date: {}", user.birth_date);
        let _ = writeln!(out, "  Address:    {}", user.address);
    }
    out
}

pub fn render_detail(user: &User) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "User Details: {}", user.full_name);
    let _ = writeln!(out, "ID: {}", user.id);
    let _ = writeln!(out, "Full Name: {}", user.full_name);
    let _ = writeln!(out, "Birth Date: {}", user.birth_date);
    let _ = writeln!(out, "Address: {}", user.address);
    let _ = writeln!(out, "Primary Email: {}", user.primary_email);
    if let Some(high_school) = user.high_school.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "High School: {high_school}");
    }

    let _ = writeln!(out, "\nSecondary Emails");
    if user.secondary_emails.is_empty() {
        let _ = writeln!(out, "  No secondary emails listed.");
    }
    for email in &user.secondary_emails {
        match email.description.as_deref().filter(|s| !s.is_empty()) {
            Some(description) => {
                let _ = writeln!(out, "  - {} ({description})", email.email);
            }
            None => {
                let _ = writeln!(out, "  - {}", email.email);
            }
        }
    }

    let _ = writeln!(out, "\nEducation History");
    if user.educations.is_empty() {
        let _ = writeln!(out, "  No education history listed.");
    }
    for education in &user.educations {
        let mut line = format!("  - {}", education.institution_name);
        if let Some(kind) = education.institution_type.as_deref().filter(|s| !s.is_empty()) {
            let _ = write!(line, " ({kind})");
        }
        if let Some(student_id) = education.student_id.as_deref().filter(|s| !s.is_empty()) {
            let _ = write!(line, " - ID: {student_id}");
        }
        let _ = writeln!(out, "{line}");
    }

    let _ = writeln!(out, "\nRemarks");
    for (label, remark) in [
        ("Remark 1", &user.remark1),
        ("Remark 2", &user.remark2),
        ("Remark 3", &user.remark3),
    ] {
        let remark = remark.as_deref().filter(|s| !s.is_empty());
        let _ = writeln!(out, "  {label}: {}", remark.unwrap_or(NOT_AVAILABLE));
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
