use super::{CellPolicy, ExtractError, Table, TableSource};
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Blob store backed by a local directory; each key is a file name.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ExtractError> {
        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(ExtractError::NotFound(key.to_string())),
        }
    }

    fn open_error(key: &str, source: std::io::Error) -> ExtractError {
        match source.kind() {
            ErrorKind::NotFound => ExtractError::NotFound(key.to_string()),
            _ => ExtractError::Io {
                key: key.to_string(),
                source,
            },
        }
    }
}

impl TableSource for DirectoryStore {
    fn fetch_table_with(&self, key: &str, policy: CellPolicy) -> Result<Table, ExtractError> {
        let path = self.path_for(key)?;
        let file = File::open(&path).map_err(|source| Self::open_error(key, source))?;

        let table = Table::from_csv_reader_with(key, file, policy)?;
        debug!(key, rows = table.len(), path = %path.display(), ?policy, "extract loaded");
        Ok(table)
    }

    fn last_modified(&self, key: &str) -> Result<Option<DateTime<Utc>>, ExtractError> {
        let path = self.path_for(key)?;
        let modified = fs::metadata(&path)
            .and_then(|metadata| metadata.modified())
            .map_err(|source| Self::open_error(key, source))?;
        Ok(Some(DateTime::<Utc>::from(modified)))
    }
}
