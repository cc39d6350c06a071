// src/lib.rs
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

// --- Declare modules ---
mod config;
pub mod ledger;
pub mod store;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util,
    load as load_config_util,
    parse_color,
    save as save_config_util,
    Config,
    Error as ConfigError,
    StandardColor,
    Theme,
    Units,
};
pub use ledger::{
    compute_stats,
    filter_logs,
    ChartMetric,
    Error as LedgerError,
    Exercise,
    ExerciseId,
    Ledger,
    LogEntry,
    LogFilters,
    LogId,
    LogStats,
    Plan,
    PlanId,
    Suggestion,
};
pub use store::{
    decode_backup,
    encode_backup,
    get_data_dir as get_data_dir_util,
    Backup,
    DocumentStore,
    Error as StoreError,
    EXPORT_VERSION,
};

pub struct AppService {
    pub config: Config,
    pub ledger: Ledger,
    pub store: DocumentStore,
    pub config_path: PathBuf,
}

impl AppService {
    /// Initializes the application service: loads the config, opens the
    /// document store and reads both data documents. A document that is
    /// present but unreadable degrades to an empty collection with a
    /// warning instead of failing startup.
    /// # Errors
    /// Returns `anyhow::Error` if config/data path determination or I/O fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .context(format!("Failed to load config from {config_path:?}"))?;

        let data_dir = store::get_data_dir().context("Failed to determine data directory")?;
        let store = DocumentStore::open(&data_dir)
            .with_context(|| format!("Failed to open data store at {data_dir:?}"))?;

        let ledger = Self::load_ledger(&store)?;

        Ok(Self {
            config,
            ledger,
            store,
            config_path,
        })
    }

    /// Loads both documents from a store, mapping decode failures to
    /// empty collections.
    /// # Errors
    /// Returns `anyhow::Error` on I/O failures.
    pub fn load_ledger(store: &DocumentStore) -> Result<Ledger> {
        let plans = match store.load_plans() {
            Ok(plans) => plans,
            Err(StoreError::Decode(err)) => {
                eprintln!("Warning: stored plans could not be read ({err}); starting with an empty plan list.");
                Vec::new()
            }
            Err(err) => return Err(err).context("Failed to load plans"),
        };
        let logs = match store.load_logs() {
            Ok(logs) => logs,
            Err(StoreError::Decode(err)) => {
                eprintln!("Warning: stored logs could not be read ({err}); starting with an empty log list.");
                Vec::new()
            }
            Err(err) => return Err(err).context("Failed to load logs"),
        };
        Ok(Ledger::from_parts(plans, logs))
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_data_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Sets the display units.
    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_units(&mut self, units: Units) -> Result<(), ConfigError> {
        self.config.units = units;
        self.save_config()
    }

    /// Sets the default chart metric.
    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_default_chart_metric(&mut self, metric: ChartMetric) -> Result<(), ConfigError> {
        self.config.default_chart_metric = metric;
        self.save_config()
    }

    fn persist_plans(&self) -> Result<()> {
        self.store
            .save_plans(self.ledger.plans())
            .context("Failed to save plans")
    }

    fn persist_logs(&self) -> Result<()> {
        self.store
            .save_logs(self.ledger.logs())
            .context("Failed to save logs")
    }

    /// Resolves a plan identifier (id or name) to a plan.
    /// # Errors
    /// Returns `anyhow::Error` if the identifier is empty or unknown.
    pub fn resolve_plan(&self, identifier: &str) -> Result<&Plan> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            bail!("Plan identifier cannot be empty.");
        }
        self.ledger
            .resolve_plan(trimmed)
            .ok_or_else(|| LedgerError::PlanNotFound(trimmed.to_string()).into())
    }

    /// Resolves an exercise identifier (id or name) within a plan.
    /// # Errors
    /// Returns `anyhow::Error` if the identifier is empty or unknown.
    pub fn resolve_exercise(&self, plan_id: PlanId, identifier: &str) -> Result<&Exercise> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            bail!("Exercise identifier cannot be empty.");
        }
        let plan = self
            .ledger
            .plan(plan_id)
            .ok_or_else(|| LedgerError::PlanNotFound(plan_id.to_string()))?;
        self.ledger
            .resolve_exercise(plan, trimmed)
            .ok_or_else(|| LedgerError::ExerciseNotFound(trimmed.to_string()).into())
    }

    /// Creates a new plan.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `LedgerError` or persistence failures.
    pub fn create_plan(&mut self, name: &str) -> Result<PlanId> {
        let id = self.ledger.create_plan(name)?;
        self.persist_plans()?;
        Ok(id)
    }

    /// Renames a plan, keeping log snapshots in sync.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `LedgerError` or persistence failures.
    pub fn rename_plan(&mut self, id: PlanId, new_name: &str) -> Result<()> {
        self.ledger.rename_plan(id, new_name)?;
        self.persist_plans()?;
        self.persist_logs()?;
        Ok(())
    }

    /// Deletes a plan and its logs. Returns the number of logs removed.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `LedgerError` or persistence failures.
    pub fn delete_plan(&mut self, id: PlanId) -> Result<usize> {
        let removed_logs = self.ledger.delete_plan(id)?;
        self.persist_plans()?;
        self.persist_logs()?;
        Ok(removed_logs)
    }

    /// Adds an exercise to a plan.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `LedgerError` or persistence failures.
    pub fn add_exercise(&mut self, plan_id: PlanId, name: &str) -> Result<ExerciseId> {
        let id = self.ledger.add_exercise(plan_id, name)?;
        self.persist_plans()?;
        Ok(id)
    }

    /// Renames an exercise, keeping log snapshots in sync.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `LedgerError` or persistence failures.
    pub fn rename_exercise(
        &mut self,
        plan_id: PlanId,
        exercise_id: ExerciseId,
        new_name: &str,
    ) -> Result<()> {
        self.ledger.rename_exercise(plan_id, exercise_id, new_name)?;
        self.persist_plans()?;
        self.persist_logs()?;
        Ok(())
    }

    /// Deletes an exercise and its logs. Returns the number of logs removed.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `LedgerError` or persistence failures.
    pub fn delete_exercise(&mut self, plan_id: PlanId, exercise_id: ExerciseId) -> Result<usize> {
        let removed_logs = self.ledger.delete_exercise(plan_id, exercise_id)?;
        self.persist_plans()?;
        self.persist_logs()?;
        Ok(removed_logs)
    }

    /// Records a log entry, stamped with the current time.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `LedgerError` or persistence failures.
    pub fn add_log(
        &mut self,
        plan_id: PlanId,
        exercise_id: ExerciseId,
        weight: f64,
        reps: i64,
    ) -> Result<LogId> {
        let id = self
            .ledger
            .add_log(plan_id, exercise_id, weight, reps, Utc::now())?;
        self.persist_logs()?;
        Ok(id)
    }

    /// Deletes a log entry. Returns whether anything was removed; a
    /// missing id is not an error.
    /// # Errors
    /// Returns `anyhow::Error` on persistence failures.
    pub fn delete_log(&mut self, id: LogId) -> Result<bool> {
        let removed = self.ledger.delete_log(id);
        if removed {
            self.persist_logs()?;
        }
        Ok(removed)
    }

    /// Empties the log collection, leaving plans untouched. Returns the
    /// number of logs removed.
    /// # Errors
    /// Returns `anyhow::Error` on persistence failures.
    pub fn clear_logs(&mut self) -> Result<usize> {
        let count = self.ledger.clear_logs();
        self.persist_logs()?;
        Ok(count)
    }

    /// Clears plans, exercises and logs, and removes both documents.
    /// # Errors
    /// Returns `anyhow::Error` on persistence failures.
    pub fn reset_all(&mut self) -> Result<()> {
        self.ledger.reset();
        self.store
            .clear()
            .context("Failed to remove data documents")
    }

    pub fn filter_logs(&self, filters: &LogFilters) -> Vec<&LogEntry> {
        self.ledger.filter_logs(filters)
    }

    /// Aggregate statistics over the logs matching `filters`.
    pub fn stats(&self, filters: &LogFilters) -> LogStats {
        compute_stats(&self.ledger.filter_logs(filters))
    }

    /// Progressive-overload suggestion for one exercise.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `LedgerError` if a referent is missing.
    pub fn suggest_next(&self, plan_id: PlanId, exercise_id: ExerciseId) -> Result<Suggestion> {
        self.ledger
            .suggest_next(plan_id, exercise_id)
            .map_err(Into::into)
    }

    /// Date-ascending metric series for one exercise.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `LedgerError` if a referent is missing.
    pub fn chart_series(
        &self,
        plan_id: PlanId,
        exercise_id: ExerciseId,
        metric: ChartMetric,
    ) -> Result<Vec<(chrono::DateTime<Utc>, f64)>> {
        self.ledger
            .chart_series(plan_id, exercise_id, metric)
            .map_err(Into::into)
    }

    /// Serializes the full ledger as a versioned backup document.
    /// # Errors
    /// Returns `anyhow::Error` if encoding fails.
    pub fn export_backup(&self) -> Result<String> {
        let backup = Backup {
            version: EXPORT_VERSION,
            exported_at: Some(Utc::now()),
            plans: self.ledger.plans().to_vec(),
            logs: self.ledger.logs().to_vec(),
        };
        encode_backup(&backup).context("Failed to encode backup")
    }

    /// Replaces the entire ledger with an imported backup and persists it.
    /// The ledger is untouched when the payload is rejected.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `LedgerError::MalformedImport` if the
    /// payload is missing `plans` or `logs`, or persistence failures.
    pub fn import_backup(&mut self, json: &str) -> Result<()> {
        let backup = match decode_backup(json) {
            Ok(backup) => backup,
            Err(StoreError::Decode(err)) => {
                bail!(LedgerError::MalformedImport(err.to_string()))
            }
            Err(err) => return Err(err).context("Failed to read import payload"),
        };
        self.ledger = Ledger::from_parts(backup.plans, backup.logs);
        self.persist_plans()?;
        self.persist_logs()?;
        Ok(())
    }
}
