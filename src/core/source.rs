//! Where batch inputs come from.
//!
//! A source is read once by the task that owns it and released when that task
//! drops it, whether the run succeeded or not.

use crate::core::error::{AppError, Result};

use std::fs;
use std::path::{Path, PathBuf};

pub trait AddressSource: Send + 'static {
    /// Reads every candidate address, in input order.
    fn read_addresses(&mut self) -> Result<Vec<String>>;

    /// Short label for logs.
    fn describe(&self) -> String {
        "in-memory list".to_string()
    }
}

impl AddressSource for Vec<String> {
    fn read_addresses(&mut self) -> Result<Vec<String>> {
        Ok(std::mem::take(self))
    }
}

/// A newline-delimited file of addresses, or a JSON array of strings.
///
/// Blank lines are skipped and surrounding whitespace trimmed. With
/// [`remove_on_release`](Self::remove_on_release) the file is deleted when
/// the source is dropped.
#[derive(Debug)]
pub struct FileAddressSource {
    path: PathBuf,
    remove_on_release: bool,
}

impl FileAddressSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Input file not found or is not a file: {}", path.display()),
            )));
        }
        Ok(Self {
            path,
            remove_on_release: false,
        })
    }

    pub fn remove_on_release(mut self, remove: bool) -> Self {
        self.remove_on_release = remove;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AddressSource for FileAddressSource {
    fn read_addresses(&mut self) -> Result<Vec<String>> {
        tracing::debug!(target: "batch_task", "Reading addresses from {}", self.path.display());
        let content = fs::read_to_string(&self.path)?;
        parse_addresses(&content)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for FileAddressSource {
    fn drop(&mut self) {
        if !self.remove_on_release {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(target: "batch_task", "Released input {}", self.path.display()),
            Err(e) => tracing::warn!(target: "batch_task",
                "Failed to remove input {}: {}", self.path.display(), e),
        }
    }
}

fn parse_addresses(content: &str) -> Result<Vec<String>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let list: Vec<String> = serde_json::from_str(trimmed)?;
        return Ok(list
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect());
    }
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
