//! JSON files on disk for project books.
//!
//! Books live in `<books>/<slug>.json`. Every overwrite first copies the old
//! file into `<backups>/<slug>/`, and explicit backups land there too; each
//! book keeps at most `retention` of them.

mod files;
mod names;

use std::{
    cmp::Reverse,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use worksbill_core::{
    storage::{book_warnings, ProjectBackupInfo, ProjectStorage},
    CoreError,
};
use worksbill_domain::ProjectBook;

pub use files::{load_book_from_path, save_book_to_path};
pub use names::canonical_name;

use names::{BackupName, EXTENSION};

#[derive(Clone)]
pub struct JsonProjectStorage {
    books_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

/// One row of `book list`.
#[derive(Debug, Clone)]
pub struct BookMetadata {
    pub slug: String,
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub project_count: usize,
    pub boq_item_count: usize,
    pub execution_count: usize,
    pub bill_count: usize,
    pub warning_count: usize,
}

/// One row of `book backups`.
#[derive(Debug, Clone)]
pub struct BackupMetadata {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
    pub path: PathBuf,
}

impl JsonProjectStorage {
    pub fn with_retention(
        books_dir: PathBuf,
        backups_dir: PathBuf,
        retention: usize,
    ) -> Result<Self, CoreError> {
        fs::create_dir_all(&books_dir)?;
        fs::create_dir_all(&backups_dir)?;
        Ok(Self {
            books_dir,
            backups_dir,
            retention: retention.max(1),
        })
    }

    pub fn book_path(&self, name: &str) -> PathBuf {
        self.books_dir
            .join(canonical_name(name))
            .with_extension(EXTENSION)
    }

    pub fn list_book_metadata(&self) -> Result<Vec<BookMetadata>, CoreError> {
        let mut rows = self
            .list_books()?
            .into_iter()
            .map(|slug| {
                let path = self.book_path(&slug);
                let book = load_book_from_path(&path)?;
                Ok::<_, CoreError>(BookMetadata {
                    warning_count: book_warnings(&book).len(),
                    project_count: book.projects.len(),
                    boq_item_count: book.boq_items.len(),
                    execution_count: book.executions.len(),
                    bill_count: book.bills.len(),
                    created_at: book.created_at,
                    updated_at: book.updated_at,
                    name: book.name,
                    slug,
                    path,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    /// Newest first.
    pub fn list_backup_metadata(&self, name: &str) -> Result<Vec<BackupMetadata>, CoreError> {
        self.list_backups(name)?
            .into_iter()
            .map(|info| {
                Ok::<_, CoreError>(BackupMetadata {
                    created_at: BackupName::parse(&info.id).map(|parsed| parsed.created_at()),
                    size_bytes: fs::metadata(&info.path)?.len(),
                    name: info.id,
                    path: info.path,
                })
            })
            .collect()
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    /// Stores `contents` as a new backup of `book` and prunes beyond retention.
    fn store_backup(
        &self,
        book: &str,
        contents: &[u8],
        note: Option<&str>,
    ) -> Result<ProjectBackupInfo, CoreError> {
        let dir = self.backup_dir(book);
        fs::create_dir_all(&dir)?;
        let backup = BackupName::new(book, Utc::now(), note).vacant_in(&dir);
        let id = backup.to_string();
        let path = dir.join(&id);
        files::replace_file(&path, contents)?;

        for stale in self.list_backups(book)?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&stale.path) {
                tracing::warn!(backup = %stale.id, error = %err, "could not prune backup");
            }
        }
        tracing::info!(book = %backup.book, backup = %id, "backup written");
        Ok(ProjectBackupInfo {
            book: backup.book.clone(),
            created_at: backup.created_at().to_rfc3339(),
            id,
            path,
        })
    }

    /// Writes `book` to `path`, first keeping whatever file was there as a backup of `slug`.
    fn overwrite(&self, slug: &str, book: &ProjectBook, path: &Path) -> Result<(), CoreError> {
        match fs::read(path) {
            Ok(previous) => {
                self.store_backup(slug, &previous, None)?;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        save_book_to_path(book, path)
    }
}

impl ProjectStorage for JsonProjectStorage {
    fn save_book(&self, name: &str, book: &ProjectBook) -> Result<(), CoreError> {
        self.overwrite(name, book, &self.book_path(name))
    }

    fn load_book(&self, name: &str) -> Result<ProjectBook, CoreError> {
        let path = self.book_path(name);
        if !path.is_file() {
            return Err(CoreError::not_found("project book", canonical_name(name)));
        }
        load_book_from_path(&path)
    }

    /// Slugs of stored books, sorted.
    fn list_books(&self) -> Result<Vec<String>, CoreError> {
        let mut slugs = Vec::new();
        for entry in fs::read_dir(&self.books_dir)? {
            let path = entry?.path();
            let is_book = path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(EXTENSION);
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()).filter(|_| is_book) {
                slugs.push(stem.to_string());
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    fn delete_book(&self, name: &str) -> Result<(), CoreError> {
        match fs::remove_file(self.book_path(name)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    /// Paths inside the books directory are treated like named saves.
    fn save_book_to_path(&self, book: &ProjectBook, path: &Path) -> Result<(), CoreError> {
        let stored_as = path
            .parent()
            .filter(|dir| *dir == self.books_dir.as_path())
            .and_then(|_| path.file_stem())
            .and_then(|stem| stem.to_str());
        match stored_as {
            Some(slug) => self.overwrite(slug, book, path),
            None => save_book_to_path(book, path),
        }
    }

    fn load_book_from_path(&self, path: &Path) -> Result<ProjectBook, CoreError> {
        load_book_from_path(path)
    }

    fn backup_book(
        &self,
        name: &str,
        book: &ProjectBook,
        note: Option<&str>,
    ) -> Result<ProjectBackupInfo, CoreError> {
        let json =
            serde_json::to_vec_pretty(book).map_err(|err| CoreError::Serde(err.to_string()))?;
        self.store_backup(name, &json, note)
    }

    /// Newest first; files that do not follow the backup naming are skipped.
    fn list_backups(&self, name: &str) -> Result<Vec<ProjectBackupInfo>, CoreError> {
        let dir = self.backup_dir(name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(parsed) = BackupName::parse(&file_name) {
                found.push((parsed, file_name, entry.path()));
            }
        }
        found.sort_by_key(|(parsed, _, _)| Reverse(parsed.age_key()));
        Ok(found
            .into_iter()
            .map(|(parsed, id, path)| ProjectBackupInfo {
                book: canonical_name(name),
                created_at: parsed.created_at().to_rfc3339(),
                id,
                path,
            })
            .collect())
    }

    fn restore_backup(&self, backup: &ProjectBackupInfo) -> Result<ProjectBook, CoreError> {
        if !backup.path.is_file() {
            return Err(CoreError::not_found("backup", &backup.id));
        }
        let book = load_book_from_path(&backup.path)?;
        self.save_book(&backup.book, &book)?;
        Ok(book)
    }
}
