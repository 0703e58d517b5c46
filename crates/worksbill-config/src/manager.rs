use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{NaiveDateTime, Utc};

use crate::{Config, ConfigError};

const CONFIG_FILE: &str = "config.json";
const BACKUP_PREFIX: &str = "config_";
const BACKUP_SUFFIX: &str = ".json";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const STAMP_LEN: usize = 15;
const DEFAULT_BACKUP_LIMIT: usize = 20;

/// Reads and writes [`Config`] and keeps a bounded set of dated copies.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    backups_dir: PathBuf,
    backup_limit: usize,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            config_path,
            backups_dir,
            backup_limit: DEFAULT_BACKUP_LIMIT,
        }
    }

    /// Lays out `<base>/config/config.json` and `<base>/config/backups/`.
    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        let config_dir = base.join("config");
        let backups_dir = config_dir.join("backups");
        fs::create_dir_all(&backups_dir)?;
        Ok(Self::new(config_dir.join(CONFIG_FILE), backups_dir))
    }

    /// Caps how many configuration backups survive; older ones are pruned.
    pub fn with_backup_limit(mut self, limit: usize) -> Self {
        self.backup_limit = limit.max(1);
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Stored configuration, or defaults when nothing has been saved yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        match fs::read_to_string(&self.config_path) {
            Ok(data) => decode(&data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Replaces the config file through a sibling temp file and a rename.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let staging = self.config_path.with_extension("json.tmp");
        write_file(&staging, &encode(config)?)?;
        fs::rename(&staging, &self.config_path)?;
        Ok(())
    }

    /// Writes `config_<stamp>[_<note>].json` and returns that file name.
    pub fn backup(&self, config: &Config, note: Option<&str>) -> Result<String, ConfigError> {
        let stamp = Utc::now().format(STAMP_FORMAT).to_string();
        let name = match note.and_then(slug) {
            Some(label) => format!("{BACKUP_PREFIX}{stamp}_{label}{BACKUP_SUFFIX}"),
            None => format!("{BACKUP_PREFIX}{stamp}{BACKUP_SUFFIX}"),
        };
        write_file(&self.backups_dir.join(&name), &encode(config)?)?;
        self.prune()?;
        Ok(name)
    }

    /// Loads a backup by file name and makes it the active configuration.
    pub fn restore(&self, backup_name: &str) -> Result<Config, ConfigError> {
        if backup_name.contains(['/', '\\']) || !is_backup_name(backup_name) {
            return Err(ConfigError::BackupNotFound(backup_name.to_string()));
        }
        let path = self.backups_dir.join(backup_name);
        let data = fs::read_to_string(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ConfigError::BackupNotFound(backup_name.to_string()),
            _ => err.into(),
        })?;
        let config = decode(&data)?;
        self.save(&config)?;
        Ok(config)
    }

    /// Backup file names, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>, ConfigError> {
        let entries = match fs::read_dir(&self.backups_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if is_backup_name(&name) {
                names.push(name);
            }
        }
        names.sort_by(|a, b| stamp_of(b).cmp(&stamp_of(a)).then_with(|| b.cmp(a)));
        Ok(names)
    }

    fn prune(&self) -> Result<(), ConfigError> {
        for stale in self.list_backups()?.into_iter().skip(self.backup_limit) {
            fs::remove_file(self.backups_dir.join(stale))?;
        }
        Ok(())
    }
}

fn encode(config: &Config) -> Result<String, ConfigError> {
    serde_json::to_string_pretty(config).map_err(|err| ConfigError::Serde(err.to_string()))
}

fn decode(data: &str) -> Result<Config, ConfigError> {
    serde_json::from_str(data).map_err(|err| ConfigError::Serde(err.to_string()))
}

fn write_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    Ok(())
}

fn is_backup_name(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_SUFFIX)
}

/// Timestamp embedded right after the `config_` prefix.
fn stamp_of(name: &str) -> Option<NaiveDateTime> {
    let stamp = name.strip_prefix(BACKUP_PREFIX)?.get(..STAMP_LEN)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()
}

/// Lowercase, dash-separated label safe for a file name.
fn slug(note: &str) -> Option<String> {
    let words: Vec<String> = note
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    (!words.is_empty()).then(|| words.join("-"))
}
