// src/ledger.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// Progressive overload step, kept in 0.5 increments when applied.
const WEIGHT_INCREMENT: f64 = 2.5;

// Custom Error type for ledger operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Plan not found: {0}")]
    PlanNotFound(String),
    #[error("Exercise not found: {0}")]
    ExerciseNotFound(String),
    #[error("Plan name must be unique (case-insensitive): '{0}' already exists.")]
    PlanNameNotUnique(String),
    #[error("Exercise name must be unique within its plan (case-insensitive): '{0}' already exists.")]
    ExerciseNameNotUnique(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Import payload is malformed: {0}")]
    MalformedImport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseId(Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(Uuid);

impl PlanId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl ExerciseId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl LogId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ExerciseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlanId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl FromStr for ExerciseId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl FromStr for LogId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub exercises: Vec<Exercise>,
}

impl Plan {
    pub fn exercise(&self, id: ExerciseId) -> Option<&Exercise> {
        self.exercises.iter().find(|x| x.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
}

/// One recorded performance: weight x reps against one exercise within one
/// plan. `plan_name`/`exercise_name` are display snapshots kept in sync by
/// the rename operations; the ids are the references that matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: LogId,
    pub timestamp: DateTime<Utc>,
    pub plan_id: PlanId,
    pub plan_name: String,
    pub exercise_id: ExerciseId,
    pub exercise_name: String,
    pub weight: f64,
    pub reps: i64,
}

impl LogEntry {
    /// Training load of this entry: weight x reps.
    #[allow(clippy::cast_precision_loss)]
    pub fn volume(&self) -> f64 {
        self.weight * self.reps as f64
    }
}

#[derive(Default, Debug, Clone)]
pub struct LogFilters {
    pub plan_id: Option<PlanId>,
    pub exercise_id: Option<ExerciseId>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogStats {
    pub total_logs: usize,
    pub total_volume: f64,
    pub unique_exercises: usize,
    pub last_workout: Option<DateTime<Utc>>,
}

/// Outcome of the progressive-overload heuristic. The CLI renders these;
/// the variants carry the numbers so callers can format them per units.
#[derive(Debug, Clone, PartialEq)]
pub enum Suggestion {
    NoHistory,
    IncreaseWeight { current: f64, next: f64 },
    KeepWeight { weight: f64 },
    BeatVolume { weight: f64, reps: i64, volume: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartMetric {
    #[default]
    Weight,
    Volume,
}

impl fmt::Display for ChartMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartMetric::Weight => write!(f, "weight"),
            ChartMetric::Volume => write!(f, "volume"),
        }
    }
}

/// Case-folded, trimmed form of a name, used for every uniqueness check
/// and for text filtering. The stored display name is never altered.
fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn same_weight(a: f64, b: f64) -> bool {
    (a - b).abs() < f64::EPSILON
}

fn round_to_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

/// Returns the subsequence of `logs` matching all set filter fields: plan
/// reference, exercise reference, and normalized text against
/// "exercise_name plan_name". Pure; applying it twice yields the same set.
pub fn filter_logs<'a>(logs: &'a [LogEntry], filters: &LogFilters) -> Vec<&'a LogEntry> {
    let text = filters
        .text
        .as_deref()
        .map(normalize)
        .filter(|t| !t.is_empty());

    logs.iter()
        .filter(|l| filters.plan_id.map_or(true, |id| l.plan_id == id))
        .filter(|l| filters.exercise_id.map_or(true, |id| l.exercise_id == id))
        .filter(|l| {
            text.as_ref().map_or(true, |t| {
                normalize(&format!("{} {}", l.exercise_name, l.plan_name)).contains(t.as_str())
            })
        })
        .collect()
}

/// Aggregates a filtered log set: entry count, total volume, distinct
/// exercise count, and the most recent timestamp (None when empty).
pub fn compute_stats(logs: &[&LogEntry]) -> LogStats {
    let unique: HashSet<ExerciseId> = logs.iter().map(|l| l.exercise_id).collect();
    LogStats {
        total_logs: logs.len(),
        total_volume: logs.iter().map(|l| l.volume()).sum(),
        unique_exercises: unique.len(),
        last_workout: logs.iter().map(|l| l.timestamp).max(),
    }
}

/// Owns the plan and log collections and enforces their invariants:
/// unique names under normalization, snapshots kept in sync on rename,
/// and cascade deletion of logs when their referent goes away.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    plans: Vec<Plan>,
    logs: Vec<LogEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from loaded or imported collections, replacing
    /// everything. Order and ids are taken as-is.
    pub fn from_parts(plans: Vec<Plan>, logs: Vec<LogEntry>) -> Self {
        Self { plans, logs }
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn plan(&self, id: PlanId) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }

    pub fn exercise(&self, plan_id: PlanId, id: ExerciseId) -> Option<&Exercise> {
        self.plan(plan_id).and_then(|p| p.exercise(id))
    }

    /// Resolves a plan identifier: a plan id string first, then a
    /// case-insensitive name match.
    pub fn resolve_plan(&self, identifier: &str) -> Option<&Plan> {
        if let Ok(id) = identifier.trim().parse::<PlanId>() {
            if let Some(plan) = self.plan(id) {
                return Some(plan);
            }
        }
        let normalized = normalize(identifier);
        self.plans.iter().find(|p| normalize(&p.name) == normalized)
    }

    /// Resolves an exercise identifier within one plan, id first then name.
    pub fn resolve_exercise<'a>(&self, plan: &'a Plan, identifier: &str) -> Option<&'a Exercise> {
        if let Ok(id) = identifier.trim().parse::<ExerciseId>() {
            if let Some(exercise) = plan.exercise(id) {
                return Some(exercise);
            }
        }
        let normalized = normalize(identifier);
        plan.exercises
            .iter()
            .find(|x| normalize(&x.name) == normalized)
    }

    /// Creates a plan with a fresh id and no exercises.
    /// # Errors
    /// - `InvalidInput` if the name is empty after trimming.
    /// - `PlanNameNotUnique` if another plan has the same normalized name.
    pub fn create_plan(&mut self, name: &str) -> Result<PlanId, Error> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Plan name cannot be empty.".to_string()));
        }
        let normalized = normalize(trimmed);
        if self.plans.iter().any(|p| normalize(&p.name) == normalized) {
            return Err(Error::PlanNameNotUnique(trimmed.to_string()));
        }
        let plan = Plan {
            id: PlanId::new(),
            name: trimmed.to_string(),
            exercises: Vec::new(),
        };
        let id = plan.id;
        self.plans.push(plan);
        Ok(id)
    }

    /// Renames a plan and re-syncs the `plan_name` snapshot on every log
    /// referencing it.
    /// # Errors
    /// - `PlanNotFound` if no plan has this id.
    /// - `InvalidInput` if the new name is empty after trimming.
    /// - `PlanNameNotUnique` if another plan already has the name.
    pub fn rename_plan(&mut self, id: PlanId, new_name: &str) -> Result<(), Error> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Plan name cannot be empty.".to_string()));
        }
        let index = self
            .plans
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::PlanNotFound(id.to_string()))?;
        let normalized = normalize(trimmed);
        if self
            .plans
            .iter()
            .any(|p| p.id != id && normalize(&p.name) == normalized)
        {
            return Err(Error::PlanNameNotUnique(trimmed.to_string()));
        }
        self.plans[index].name = trimmed.to_string();
        for log in self.logs.iter_mut().filter(|l| l.plan_id == id) {
            log.plan_name = trimmed.to_string();
        }
        Ok(())
    }

    /// Deletes a plan and cascades deletion of every log referencing it.
    /// Returns the number of logs removed.
    /// # Errors
    /// - `PlanNotFound` if no plan has this id.
    pub fn delete_plan(&mut self, id: PlanId) -> Result<usize, Error> {
        let index = self
            .plans
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::PlanNotFound(id.to_string()))?;
        self.plans.remove(index);
        let before = self.logs.len();
        self.logs.retain(|l| l.plan_id != id);
        Ok(before - self.logs.len())
    }

    /// Appends a new exercise to a plan.
    /// # Errors
    /// - `PlanNotFound` if the plan does not exist.
    /// - `InvalidInput` if the name is empty after trimming.
    /// - `ExerciseNameNotUnique` if the plan already has the name.
    pub fn add_exercise(&mut self, plan_id: PlanId, name: &str) -> Result<ExerciseId, Error> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput(
                "Exercise name cannot be empty.".to_string(),
            ));
        }
        let plan = self
            .plans
            .iter_mut()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))?;
        let normalized = normalize(trimmed);
        if plan
            .exercises
            .iter()
            .any(|x| normalize(&x.name) == normalized)
        {
            return Err(Error::ExerciseNameNotUnique(trimmed.to_string()));
        }
        let exercise = Exercise {
            id: ExerciseId::new(),
            name: trimmed.to_string(),
        };
        let id = exercise.id;
        plan.exercises.push(exercise);
        Ok(id)
    }

    /// Renames an exercise and re-syncs the `exercise_name` snapshot on
    /// every log referencing it.
    /// # Errors
    /// - `PlanNotFound` / `ExerciseNotFound` if either referent is missing.
    /// - `InvalidInput` if the new name is empty after trimming.
    /// - `ExerciseNameNotUnique` if another exercise in the plan has it.
    pub fn rename_exercise(
        &mut self,
        plan_id: PlanId,
        exercise_id: ExerciseId,
        new_name: &str,
    ) -> Result<(), Error> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput(
                "Exercise name cannot be empty.".to_string(),
            ));
        }
        let plan = self
            .plans
            .iter_mut()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))?;
        let index = plan
            .exercises
            .iter()
            .position(|x| x.id == exercise_id)
            .ok_or_else(|| Error::ExerciseNotFound(exercise_id.to_string()))?;
        let normalized = normalize(trimmed);
        if plan
            .exercises
            .iter()
            .any(|x| x.id != exercise_id && normalize(&x.name) == normalized)
        {
            return Err(Error::ExerciseNameNotUnique(trimmed.to_string()));
        }
        plan.exercises[index].name = trimmed.to_string();
        for log in self
            .logs
            .iter_mut()
            .filter(|l| l.plan_id == plan_id && l.exercise_id == exercise_id)
        {
            log.exercise_name = trimmed.to_string();
        }
        Ok(())
    }

    /// Removes an exercise from its plan and cascades deletion of every
    /// log matching both the plan and the exercise. Returns the number of
    /// logs removed.
    /// # Errors
    /// - `PlanNotFound` / `ExerciseNotFound` if either referent is missing.
    pub fn delete_exercise(
        &mut self,
        plan_id: PlanId,
        exercise_id: ExerciseId,
    ) -> Result<usize, Error> {
        let plan = self
            .plans
            .iter_mut()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))?;
        let index = plan
            .exercises
            .iter()
            .position(|x| x.id == exercise_id)
            .ok_or_else(|| Error::ExerciseNotFound(exercise_id.to_string()))?;
        plan.exercises.remove(index);
        let before = self.logs.len();
        self.logs
            .retain(|l| !(l.plan_id == plan_id && l.exercise_id == exercise_id));
        Ok(before - self.logs.len())
    }

    /// Appends a log entry against an exercise within a plan, snapshotting
    /// the current plan and exercise names.
    /// # Errors
    /// - `PlanNotFound` / `ExerciseNotFound` if either referent is missing
    ///   (the exercise must belong to the given plan).
    /// - `InvalidInput` if the weight is not finite and non-negative, or
    ///   reps is not a positive integer.
    pub fn add_log(
        &mut self,
        plan_id: PlanId,
        exercise_id: ExerciseId,
        weight: f64,
        reps: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<LogId, Error> {
        let (plan_name, exercise_name) = {
            let plan = self
                .plan(plan_id)
                .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))?;
            let exercise = plan
                .exercise(exercise_id)
                .ok_or_else(|| Error::ExerciseNotFound(exercise_id.to_string()))?;
            (plan.name.clone(), exercise.name.clone())
        };
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Weight must be a non-negative number (got {weight})."
            )));
        }
        if reps < 1 {
            return Err(Error::InvalidInput(format!(
                "Reps must be a positive integer (got {reps})."
            )));
        }
        let entry = LogEntry {
            id: LogId::new(),
            timestamp,
            plan_id,
            plan_name,
            exercise_id,
            exercise_name,
            weight,
            reps,
        };
        let id = entry.id;
        self.logs.push(entry);
        Ok(id)
    }

    /// Removes the log entry with this id. Returns whether anything was
    /// removed; a missing id is not an error.
    pub fn delete_log(&mut self, id: LogId) -> bool {
        let before = self.logs.len();
        self.logs.retain(|l| l.id != id);
        self.logs.len() < before
    }

    /// Empties the log collection, leaving plans and exercises untouched.
    /// Returns the number of logs removed.
    pub fn clear_logs(&mut self) -> usize {
        let count = self.logs.len();
        self.logs.clear();
        count
    }

    /// Clears plans, exercises and logs.
    pub fn reset(&mut self) {
        self.plans.clear();
        self.logs.clear();
    }

    pub fn filter_logs(&self, filters: &LogFilters) -> Vec<&LogEntry> {
        filter_logs(&self.logs, filters)
    }

    /// Derives a progressive-overload suggestion from the log history of
    /// one exercise. Pure function of the history: most recent entry
    /// first, then in priority order
    /// 1. the two most recent entries at the last weight both hit 8+ reps
    ///    -> step the weight up by 2.5, rounded to the nearest 0.5,
    /// 2. last reps under 5 -> keep the weight, aim for one more rep,
    /// 3. otherwise -> beat the last session's volume.
    /// # Errors
    /// - `PlanNotFound` / `ExerciseNotFound` if either referent is missing.
    pub fn suggest_next(
        &self,
        plan_id: PlanId,
        exercise_id: ExerciseId,
    ) -> Result<Suggestion, Error> {
        let plan = self
            .plan(plan_id)
            .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))?;
        if plan.exercise(exercise_id).is_none() {
            return Err(Error::ExerciseNotFound(exercise_id.to_string()));
        }

        let mut history: Vec<&LogEntry> = self
            .logs
            .iter()
            .filter(|l| l.plan_id == plan_id && l.exercise_id == exercise_id)
            .collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)); // newest first

        let Some(&last) = history.first() else {
            return Ok(Suggestion::NoHistory);
        };

        let at_last_weight: Vec<&&LogEntry> = history
            .iter()
            .filter(|l| same_weight(l.weight, last.weight))
            .collect();
        let consistent = at_last_weight.len() >= 2
            && at_last_weight[0].reps >= 8
            && at_last_weight[1].reps >= 8;

        if consistent {
            Ok(Suggestion::IncreaseWeight {
                current: last.weight,
                next: round_to_half(last.weight + WEIGHT_INCREMENT),
            })
        } else if last.reps < 5 {
            Ok(Suggestion::KeepWeight {
                weight: last.weight,
            })
        } else {
            Ok(Suggestion::BeatVolume {
                weight: last.weight,
                reps: last.reps,
                volume: last.volume(),
            })
        }
    }

    /// Time series for one exercise, ascending by timestamp, each entry
    /// projected to the selected metric. Consumed by charting callers.
    /// # Errors
    /// - `PlanNotFound` / `ExerciseNotFound` if either referent is missing.
    pub fn chart_series(
        &self,
        plan_id: PlanId,
        exercise_id: ExerciseId,
        metric: ChartMetric,
    ) -> Result<Vec<(DateTime<Utc>, f64)>, Error> {
        let plan = self
            .plan(plan_id)
            .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))?;
        if plan.exercise(exercise_id).is_none() {
            return Err(Error::ExerciseNotFound(exercise_id.to_string()));
        }

        let mut series: Vec<&LogEntry> = self
            .logs
            .iter()
            .filter(|l| l.plan_id == plan_id && l.exercise_id == exercise_id)
            .collect();
        series.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Ok(series
            .into_iter()
            .map(|l| {
                let value = match metric {
                    ChartMetric::Weight => l.weight,
                    ChartMetric::Volume => l.volume(),
                };
                (l.timestamp, value)
            })
            .collect())
    }
}
