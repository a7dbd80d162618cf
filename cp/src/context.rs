//! Context file provider
//!
//! The context file is prepared outside this program (from markdown, JSON or
//! web pages). Here it is only read back as text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Failed to read context file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Context file {0} is not valid UTF-8 text")]
    NotText(PathBuf),
}

/// Seed text for a session
#[derive(Debug, Clone)]
pub struct ContextSource {
    path: PathBuf,
}

impl ContextSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the context text
    ///
    /// A missing or blank file yields `Ok(None)`.
    pub fn load(&self) -> Result<Option<String>, ContextError> {
        debug!(path = %self.path.display(), "ContextSource::load: called");
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("ContextSource::load: no context file");
                return Ok(None);
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(ContextError::NotText(self.path.clone()));
            }
            Err(source) => {
                return Err(ContextError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let text = text.trim();
        if text.is_empty() {
            debug!("ContextSource::load: context file is blank");
            return Ok(None);
        }

        info!("Loaded {} chars of context from {}", text.chars().count(), self.path.display());
        Ok(Some(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        let source = ContextSource::new(temp.path().join("context.md"));
        assert!(source.load().unwrap().is_none());
    }

    #[test]
    fn test_blank_file_is_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("context.md");
        fs::write(&path, "\n   \n").unwrap();
        assert!(ContextSource::new(&path).load().unwrap().is_none());
    }

    #[test]
    fn test_text_is_trimmed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("context.md");
        fs::write(&path, "\n# Trail Shoes\nWaterproof upper.\n\n").unwrap();

        let text = ContextSource::new(&path).load().unwrap().unwrap();
        assert_eq!(text, "# Trail Shoes\nWaterproof upper.");
    }

    #[test]
    fn test_binary_file_is_not_text() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("context.md");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        assert!(matches!(ContextSource::new(&path).load(), Err(ContextError::NotText(_))));
    }
}
