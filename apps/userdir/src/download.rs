use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use client_core::{DownloadSink, DEFAULT_EXPORT_FILENAME};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Saves exports into a directory. Bytes are first written to a temporary
/// file, which is removed on release.
pub struct TempFileSink {
    out_dir: PathBuf,
    saved: Vec<PathBuf>,
}

impl TempFileSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            saved: Vec::new(),
        }
    }

    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }
}

impl DownloadSink for TempFileSink {
    type Handle = NamedTempFile;

    fn stage(&mut self, bytes: &[u8]) -> anyhow::Result<NamedTempFile> {
        let mut file = NamedTempFile::new().context("failed to create temporary export file")?;
        file.write_all(bytes)
            .and_then(|()| file.flush())
            .context("failed to write temporary export file")?;
        debug!(path = %file.path().display(), size_bytes = bytes.len(), "export staged");
        Ok(file)
    }

    fn save(&mut self, handle: &NamedTempFile, filename: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;
        let target = self.out_dir.join(safe_file_name(filename));
        fs::copy(handle.path(), &target)
            .with_context(|| format!("failed to write {}", target.display()))?;
        self.saved.push(target);
        Ok(())
    }

    fn release(&mut self, handle: NamedTempFile) {
        if let Err(err) = handle.close() {
            warn!(%err, "failed to remove temporary export file");
        }
    }
}

/// Last path component of a server-chosen name, so it cannot escape the
/// output directory.
fn safe_file_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_EXPORT_FILENAME)
}

#[cfg(test)]
#[path = "tests/download_tests.rs"]
mod tests;
