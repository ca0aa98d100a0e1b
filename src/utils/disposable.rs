//! Disposable (throwaway) domain list, loaded once and read-only afterwards.

use crate::core::error::Result;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Clone)]
pub struct DisposableDomains {
    domains: HashSet<String>,
}

impl DisposableDomains {
    /// Parses a newline-delimited list. Blank lines and `#` comments are skipped.
    pub fn parse(content: &str) -> Self {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect()
    }

    /// Reads the list at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let list = Self::parse(&content);
        tracing::info!(
            "Loaded {} disposable domains from {}",
            list.len(),
            path.as_ref().display()
        );
        Ok(list)
    }

    /// Loads the configured list. A missing or unreadable file yields an empty list.
    pub fn load_or_empty(path: Option<&str>) -> Self {
        let Some(path) = path else {
            tracing::debug!("No disposable domain list configured.");
            return Self::default();
        };
        match Self::from_file(path) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Disposable domains file '{}' not loaded: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(&domain.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for DisposableDomains {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            domains: iter
                .into_iter()
                .map(|d| d.as_ref().trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }
}
