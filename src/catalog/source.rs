//! Where the car park information export is read from.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::model::LoadError;

/// A readable tabular source holding the full text of one CSV export.
///
/// Implementations are shared between request threads and the reload path,
/// hence `Send + Sync`.
pub trait TabularSource: Send + Sync {
    /// Reads the whole table. Called once per load or reload.
    fn read_table(&self) -> Result<String, LoadError>;

    /// Short human-readable description for log lines.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// Directory source
// ---------------------------------------------------------------------------

/// Reads the newest export from a data directory.
///
/// Exports are published as `<prefix><date>.csv` (for example
/// `HDBCarparkInformation20240501.csv`), so the file whose name sorts last
/// is taken as the newest.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    data_dir: PathBuf,
    file_prefix: String,
}

impl DirectorySource {
    pub fn new(data_dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    /// Finds the export file to read, without reading it.
    pub fn locate(&self) -> Result<PathBuf, LoadError> {
        if !self.data_dir.is_dir() {
            return Err(LoadError::DirectoryMissing(self.data_dir.display().to_string()));
        }

        let mut newest: Option<PathBuf> = None;
        for entry in std::fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if !path.is_file() || !self.matches(&path) {
                continue;
            }
            if newest.as_ref().is_none_or(|current| path.file_name() > current.file_name()) {
                newest = Some(path);
            }
        }

        newest.ok_or_else(|| LoadError::NoMatchingFile {
            dir: self.data_dir.display().to_string(),
            prefix: self.file_prefix.clone(),
        })
    }

    fn matches(&self, path: &Path) -> bool {
        let name_ok = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&self.file_prefix));
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        name_ok && ext_ok
    }
}

impl TabularSource for DirectorySource {
    fn read_table(&self) -> Result<String, LoadError> {
        let path = self.locate()?;
        Ok(std::fs::read_to_string(path)?)
    }

    fn describe(&self) -> String {
        format!("{}/{}*.csv", self.data_dir.display(), self.file_prefix)
    }
}

// ---------------------------------------------------------------------------
// Inline source
// ---------------------------------------------------------------------------

/// Holds the CSV text in memory. Useful for embedding a fixed catalog and
/// for exercising reload without touching the filesystem.
#[derive(Debug, Default)]
pub struct InlineSource {
    text: RwLock<String>,
}

impl InlineSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: RwLock::new(text.into()),
        }
    }

    /// Swaps in new CSV text; takes effect on the next reload.
    pub fn replace(&self, text: impl Into<String>) {
        *self.text.write().unwrap_or_else(PoisonError::into_inner) = text.into();
    }
}

impl TabularSource for InlineSource {
    fn read_table(&self) -> Result<String, LoadError> {
        Ok(self.text.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn describe(&self) -> String {
        "inline".to_string()
    }
}

// Lets a caller keep a handle on a source (e.g. to `replace` it) while the
// catalog owns another.
impl<T: TabularSource + ?Sized> TabularSource for std::sync::Arc<T> {
    fn read_table(&self) -> Result<String, LoadError> {
        (**self).read_table()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
