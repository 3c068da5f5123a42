use std::sync::LazyLock;

use regex::Regex;

/// File name used when the export response does not name one.
pub const DEFAULT_EXPORT_FILENAME: &str = "users_export.csv";

/// `filename=` parameter of a `Content-Disposition` header: a quoted value in
/// either quote style, or everything up to the next `;`.
#[allow(clippy::expect_used)]
static FILENAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"filename[^;=\n]*=("[^"\n]*"|'[^'\n]*'|[^;\n]*)"#)
        .expect("FILENAME_PATTERN is a valid regex literal")
});

/// File name to save an export under.
///
/// Only an `attachment` disposition is consulted. Quotes are stripped and
/// surrounding whitespace trimmed; an empty result falls back to
/// [`DEFAULT_EXPORT_FILENAME`].
pub fn filename_from_disposition(header: Option<&str>) -> String {
    header
        .filter(|value| value.contains("attachment"))
        .and_then(|value| FILENAME_PATTERN.captures(value))
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().replace(['"', '\''], ""))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_EXPORT_FILENAME.to_string())
}

#[cfg(test)]
#[path = "tests/disposition_tests.rs"]
mod tests;
