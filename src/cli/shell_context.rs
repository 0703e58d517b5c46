//! Shared runtime state for shell commands.

use std::{env, path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;
use worksbill_config::{Config, ConfigManager};
use worksbill_core::{
    storage::book_warnings, Clock, NotificationSink, RecordingNotifier, SystemClock, WorksEngine,
};
use worksbill_domain::{
    Actor, ApprovalRequest, BoqItem, Execution, FundHead, Identifiable, Project, ProjectBook,
    RaBill,
};
use worksbill_storage_json::JsonProjectStorage;

use super::{
    commands,
    core::{CommandError, CommandResult},
    format::{self, Grouping},
    io as cli_io,
    output::{self, OutputPreferences},
    registry::CommandRegistry,
};
use crate::{config::engine_settings, errors::CliError, utils};

const BOOKS_DIR: &str = "books";
const BACKUPS_DIR: &str = "backups";
const UNTITLED_BOOK: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub engine: WorksEngine,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<dyn Clock>,
    pub storage: JsonProjectStorage,
    pub config_manager: ConfigManager,
    pub config: Config,
    /// Storage name the current book was loaded from or last saved under.
    pub book_name: Option<String>,
    pub current_project: Option<Uuid>,
    pub current_actor: Option<Uuid>,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_base_dir(mode, utils::app_data_dir())
    }

    /// Context whose configuration, books and backups live under `base`.
    pub fn with_base_dir(mode: CliMode, base: PathBuf) -> Result<Self, CliError> {
        let config_manager = ConfigManager::with_base_dir(base.clone())?;
        let config = config_manager.load()?;
        let config_manager = config_manager.with_backup_limit(config.backup_retention);
        output::set_preferences(OutputPreferences {
            color_enabled: config.ui_color_enabled && mode == CliMode::Interactive,
            quiet_mode: env::var_os("WORKSBILL_QUIET").is_some(),
        });

        let books_dir = config
            .default_book_root
            .clone()
            .unwrap_or_else(|| base.join(BOOKS_DIR));
        let backups_dir = config
            .default_backup_root
            .clone()
            .unwrap_or_else(|| base.join(BACKUPS_DIR));
        let storage =
            JsonProjectStorage::with_retention(books_dir, backups_dir, config.backup_retention)?;

        let notifier = Arc::new(RecordingNotifier::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let sink: Arc<dyn NotificationSink> = notifier.clone();
        let engine = WorksEngine::new(UNTITLED_BOOK, engine_settings(&config), Arc::clone(&clock), sink);

        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let mut context = Self {
            mode,
            registry,
            engine,
            notifier,
            clock,
            storage,
            config_manager,
            config,
            book_name: None,
            current_project: None,
            current_actor: None,
            last_command: None,
            running: true,
        };
        context.auto_load_last()?;
        Ok(context)
    }

    fn auto_load_last(&mut self) -> Result<(), CliError> {
        if self.mode != CliMode::Interactive {
            return Ok(());
        }
        let Some(name) = self.config.last_opened_book.clone() else {
            return Ok(());
        };
        match self.storage_load(&name) {
            Ok(()) => cli_io::print_info(format!("Loaded book `{}`.", name)),
            Err(err) => cli_io::print_warning(format!("Could not reopen `{}`: {}", name, err)),
        }
        Ok(())
    }

    pub fn prompt(&self) -> String {
        let book = self.book_name.as_deref().unwrap_or("unsaved");
        let project = self
            .current_project
            .and_then(|id| self.engine.project(id).ok())
            .map(|project| format!(":{}", project.code))
            .unwrap_or_default();
        let actor = self
            .current_actor
            .and_then(|id| self.engine.actor(id).ok())
            .map(|actor| format!(" as {}", actor.name))
            .unwrap_or_default();
        format!("worksbill[{book}{project}{actor}]> ")
    }

    pub fn command(&self, name: &str) -> Option<&super::registry::CommandEntry> {
        self.registry.get(name)
    }

    pub fn project(&self) -> Result<Project, CommandError> {
        let id = self.current_project.ok_or(CommandError::ProjectNotSelected)?;
        Ok(self.engine.project(id)?)
    }

    pub fn project_id(&self) -> Result<Uuid, CommandError> {
        self.project().map(|project| project.id)
    }

    pub fn actor(&self) -> Result<Actor, CommandError> {
        let id = self.current_actor.ok_or(CommandError::ActorNotSelected)?;
        Ok(self.engine.actor(id)?)
    }

    pub fn find_project(&self, code: &str) -> Result<Project, CommandError> {
        self.engine
            .projects()?
            .into_iter()
            .find(|project| project.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| CommandError::InvalidArguments(format!("no project with code `{code}`")))
    }

    pub fn find_actor(&self, name: &str) -> Result<Actor, CommandError> {
        self.engine
            .actors()?
            .into_iter()
            .find(|actor| actor.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CommandError::InvalidArguments(format!("no actor named `{name}`")))
    }

    pub fn find_fund_head(&self, code: &str) -> Result<FundHead, CommandError> {
        self.engine
            .fund_heads()?
            .into_iter()
            .find(|fund| fund.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| CommandError::InvalidArguments(format!("no fund head with code `{code}`")))
    }

    /// BOQ item of the active project by its schedule code.
    pub fn find_boq_item(&self, code: &str) -> Result<BoqItem, CommandError> {
        let project_id = self.project_id()?;
        self.engine
            .boq_items(project_id)?
            .into_iter()
            .map(|(item, _)| item)
            .find(|item| item.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| CommandError::InvalidArguments(format!("no BOQ item with code `{code}`")))
    }

    pub fn find_execution(&self, token: &str) -> Result<Execution, CommandError> {
        resolve_prefix("execution", token, self.engine.executions()?)
    }

    /// Bill of the active project by bill number, falling back to an id prefix.
    pub fn find_bill(&self, token: &str) -> Result<RaBill, CommandError> {
        let bills = match self.current_project {
            Some(project_id) => self.engine.bills(project_id)?,
            None => self.engine.router().all_bills()?,
        };
        if let Some(bill) = bills
            .iter()
            .find(|bill| bill.bill_number.eq_ignore_ascii_case(token))
        {
            return Ok(bill.clone());
        }
        resolve_prefix("bill", token, bills)
    }

    pub fn find_request(&self, token: &str) -> Result<ApprovalRequest, CommandError> {
        resolve_prefix("request", token, self.engine.requests()?)
    }

    pub fn money(&self, amount: Decimal) -> String {
        format::money(
            amount,
            &self.config.currency,
            Grouping::for_locale(&self.config.locale),
        )
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Swaps in an engine rebuilt from `book`, keeping selections that still resolve.
    pub fn replace_engine(&mut self, book: ProjectBook) -> CommandResult {
        for warning in book_warnings(&book) {
            cli_io::print_warning(warning);
        }
        let sink: Arc<dyn NotificationSink> = self.notifier.clone();
        self.engine = WorksEngine::from_book(
            book,
            engine_settings(&self.config),
            Arc::clone(&self.clock),
            sink,
        )?;
        self.reconcile_selection()
    }

    /// Re-applies configuration-driven settings to the open book.
    pub fn rebuild_engine(&mut self) -> CommandResult {
        let book = self.engine.to_book()?;
        self.replace_engine(book)
    }

    /// Starts an empty book; nothing is written until `book save`.
    pub fn reset_engine(&mut self, name: &str) {
        let sink: Arc<dyn NotificationSink> = self.notifier.clone();
        self.engine = WorksEngine::new(
            name,
            engine_settings(&self.config),
            Arc::clone(&self.clock),
            sink,
        );
        self.book_name = None;
        self.current_project = None;
        self.current_actor = None;
    }

    fn reconcile_selection(&mut self) -> CommandResult {
        let projects = self.engine.projects()?;
        if !self
            .current_project
            .is_some_and(|id| projects.iter().any(|project| project.id == id))
        {
            self.current_project = projects.first().map(|project| project.id);
        }
        if let Some(id) = self.current_actor {
            if self.engine.actor(id).is_err() {
                self.current_actor = None;
            }
        }
        Ok(())
    }

    /// Loads a stored book by name and remembers it as the last opened one.
    pub fn storage_load(&mut self, name: &str) -> CommandResult {
        use worksbill_core::storage::ProjectStorage;

        let book = self.storage.load_book(name)?;
        self.replace_engine(book)?;
        self.book_name = Some(name.to_string());
        self.remember_book(name)
    }

    pub fn remember_book(&mut self, name: &str) -> CommandResult {
        if self.config.last_opened_book.as_deref() != Some(name) {
            self.config.last_opened_book = Some(name.to_string());
            self.persist_config()?;
        }
        Ok(())
    }

    pub fn persist_config(&self) -> CommandResult {
        self.config_manager.save(&self.config)?;
        Ok(())
    }

    pub fn require_named_book(&self) -> Result<String, CommandError> {
        self.book_name.clone().ok_or_else(|| {
            CommandError::InvalidArguments(
                "Book has no storage name yet. Use `book save <name>` once to bind it.".into(),
            )
        })
    }
}

/// Resolves a record by a (possibly shortened) id; dashes are ignored.
fn resolve_prefix<T: Identifiable>(
    kind: &str,
    token: &str,
    records: Vec<T>,
) -> Result<T, CommandError> {
    let needle: String = token
        .trim()
        .chars()
        .filter(|ch| *ch != '-')
        .collect::<String>()
        .to_ascii_lowercase();
    if needle.is_empty() {
        return Err(CommandError::InvalidArguments(format!("{kind} id is required")));
    }
    let mut matches: Vec<T> = records
        .into_iter()
        .filter(|record| record.id().simple().to_string().starts_with(&needle))
        .collect();
    match matches.len() {
        0 => Err(CommandError::InvalidArguments(format!(
            "no {kind} matches `{token}`"
        ))),
        1 => Ok(matches.remove(0)),
        count => Err(CommandError::InvalidArguments(format!(
            "`{token}` matches {count} {kind} records; use more characters"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worksbill_domain::FundHead;

    #[test]
    fn prefixes_resolve_unique_records() {
        let first = FundHead::new("MH-5054", "Roads and bridges");
        let second = FundHead::new("MH-4059", "Public works");
        let token: String = first.id.to_string().chars().take(13).collect();
        let found = resolve_prefix("fund", &token, vec![first.clone(), second.clone()])
            .expect("resolve");
        assert_eq!(found.id, first.id);

        assert!(matches!(
            resolve_prefix("fund", "", vec![first.clone()]),
            Err(CommandError::InvalidArguments(_))
        ));
        assert!(resolve_prefix("fund", "zz", vec![first, second]).is_err());
    }
}
