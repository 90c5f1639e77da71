//! Persistent capture index.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::CaptureError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CounterFile {
    index: u32,
}

/// Next capture index, stored as a small TOML file (`index = N`).
#[derive(Debug, Clone)]
pub struct CaptureCounter {
    path: PathBuf,
}

impl CaptureCounter {
    /// Counter persisted at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the counter file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored index. A missing file means zero.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Counter`] if the file exists but cannot be
    /// read or parsed.
    pub fn load(&self) -> Result<u32, CaptureError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => toml::from_str::<CounterFile>(&text)
                .map(|c| c.index)
                .map_err(|e| {
                    CaptureError::Counter(format!(
                        "{}: {e}",
                        self.path.display()
                    ))
                }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(CaptureError::Counter(format!(
                "{}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Persist `next` as the index of the following capture.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Counter`] if the file cannot be written.
    pub fn store(&self, next: u32) -> Result<(), CaptureError> {
        let text = toml::to_string(&CounterFile { index: next })
            .map_err(|e| CaptureError::Counter(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    CaptureError::Counter(format!(
                        "{}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        fs::write(&self.path, text).map_err(|e| {
            CaptureError::Counter(format!("{}: {e}", self.path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("arpass-counter-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_file_starts_at_zero() {
        let dir = scratch("missing");
        let counter = CaptureCounter::new(dir.join("index.toml"));
        assert_eq!(counter.load().unwrap(), 0);
    }

    #[test]
    fn store_then_load() {
        let dir = scratch("store");
        let counter = CaptureCounter::new(dir.join("nested/index.toml"));
        counter.store(42).unwrap();
        assert_eq!(counter.load().unwrap(), 42);
        let text = fs::read_to_string(counter.path()).unwrap();
        assert_eq!(text.trim(), "index = 42");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = scratch("garbage");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("index.toml");
        fs::write(&path, "index = \"seven\"").unwrap();
        assert!(matches!(
            CaptureCounter::new(path).load(),
            Err(CaptureError::Counter(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}
