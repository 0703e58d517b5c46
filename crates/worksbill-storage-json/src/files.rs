use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use worksbill_core::{storage::book_warnings, CoreError};
use worksbill_domain::ProjectBook;

/// Writes `book` as pretty JSON through a synced `<file>.tmp` sibling and a rename.
pub fn save_book_to_path(book: &ProjectBook, path: &Path) -> Result<(), CoreError> {
    let json =
        serde_json::to_string_pretty(book).map_err(|err| CoreError::Serde(err.to_string()))?;
    replace_file(path, json.as_bytes())
}

/// Reads a book and logs any dangling references it carries.
pub fn load_book_from_path(path: &Path) -> Result<ProjectBook, CoreError> {
    let bytes = fs::read(path)?;
    let book: ProjectBook =
        serde_json::from_slice(&bytes).map_err(|err| CoreError::Serde(err.to_string()))?;
    for warning in book_warnings(&book) {
        tracing::warn!(path = %path.display(), "{warning}");
    }
    Ok(book)
}

pub(crate) fn replace_file(path: &Path, contents: &[u8]) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let staging = staging_path(path);
    let mut file = File::create(&staging)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&staging, path)?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
