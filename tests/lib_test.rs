use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use workout_planner_lib::{
    compute_stats, filter_logs, AppService, ChartMetric, Config, DocumentStore, ExerciseId,
    Ledger, LedgerError, LogEntry, LogFilters, StoreError, Suggestion,
};

// Helper function to create a test service backed by a temp directory.
// The TempDir must stay alive for the duration of the test.
fn create_test_service() -> Result<(AppService, TempDir)> {
    let dir = tempfile::tempdir()?;
    let store = DocumentStore::open(dir.path().join("data"))?;
    let service = AppService {
        config: Config::default(),
        ledger: Ledger::new(),
        store,
        config_path: dir.path().join("config.toml"),
    };
    Ok((service, dir))
}

// Fixed timestamps so history-dependent logic is deterministic.
fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

fn nil_exercise_id() -> ExerciseId {
    "00000000-0000-0000-0000-000000000000".parse().unwrap()
}

#[test]
fn test_create_plan_unique_name() -> Result<()> {
    let mut ledger = Ledger::new();
    ledger.create_plan("Push Day")?;

    // Same name, case-insensitive and with extra whitespace
    let result = ledger.create_plan("  push day ");
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("must be unique"));

    // Different name is fine
    assert!(ledger.create_plan("Pull Day").is_ok());
    assert_eq!(ledger.plans().len(), 2);

    Ok(())
}

#[test]
fn test_create_plan_trims_name_and_rejects_empty() -> Result<()> {
    let mut ledger = Ledger::new();
    let id = ledger.create_plan("  Push Day  ")?;
    assert_eq!(ledger.plan(id).unwrap().name, "Push Day");

    let result = ledger.create_plan("   ");
    assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
    assert_eq!(ledger.plans().len(), 1);

    Ok(())
}

#[test]
fn test_rename_plan_syncs_log_snapshots() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let pull = ledger.create_plan("Pull Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    let row = ledger.add_exercise(pull, "Barbell Row")?;

    ledger.add_log(push, bench, 60.0, 5, ts(1, 10))?;
    ledger.add_log(push, bench, 62.5, 5, ts(2, 10))?;
    ledger.add_log(pull, row, 70.0, 8, ts(3, 10))?;

    ledger.rename_plan(push, "Chest Day")?;

    assert_eq!(ledger.plan(push).unwrap().name, "Chest Day");
    for log in ledger.logs().iter().filter(|l| l.plan_id == push) {
        assert_eq!(log.plan_name, "Chest Day");
        // Exercise snapshots are untouched by a plan rename
        assert_eq!(log.exercise_name, "Bench Press");
    }
    // Logs of the other plan keep their snapshot
    let other: Vec<&LogEntry> = ledger.logs().iter().filter(|l| l.plan_id == pull).collect();
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].plan_name, "Pull Day");

    // Renaming to another plan's name is rejected
    let result = ledger.rename_plan(push, "pull day");
    assert!(matches!(result, Err(LedgerError::PlanNameNotUnique(_))));

    // Renaming a plan to its own name (different case) is fine
    ledger.rename_plan(push, "CHEST DAY")?;

    // Renaming a missing plan is rejected
    let mut empty = Ledger::new();
    let orphan = empty.create_plan("Gone")?;
    empty.delete_plan(orphan)?;
    assert!(matches!(
        empty.rename_plan(orphan, "Whatever"),
        Err(LedgerError::PlanNotFound(_))
    ));

    Ok(())
}

#[test]
fn test_delete_plan_cascades_only_its_logs() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let pull = ledger.create_plan("Pull Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    let row = ledger.add_exercise(pull, "Barbell Row")?;

    ledger.add_log(push, bench, 60.0, 5, ts(1, 10))?;
    ledger.add_log(push, bench, 60.0, 6, ts(2, 10))?;
    ledger.add_log(pull, row, 70.0, 8, ts(3, 10))?;

    let removed = ledger.delete_plan(push)?;
    assert_eq!(removed, 2);
    assert_eq!(ledger.plans().len(), 1);
    assert_eq!(ledger.logs().len(), 1);
    assert!(ledger.logs().iter().all(|l| l.plan_id == pull));

    // Deleting again reports not found
    assert!(matches!(
        ledger.delete_plan(push),
        Err(LedgerError::PlanNotFound(_))
    ));

    Ok(())
}

#[test]
fn test_add_exercise_unique_within_plan() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let pull = ledger.create_plan("Pull Day")?;
    ledger.add_exercise(push, "Bench Press")?;

    let result = ledger.add_exercise(push, "bench press");
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("unique within its plan"));

    // Same name in a different plan is fine
    assert!(ledger.add_exercise(pull, "Bench Press").is_ok());

    // Unknown plan is rejected
    let mut other = Ledger::new();
    let gone = other.create_plan("Gone")?;
    other.delete_plan(gone)?;
    assert!(matches!(
        other.add_exercise(gone, "Squat"),
        Err(LedgerError::PlanNotFound(_))
    ));

    Ok(())
}

#[test]
fn test_rename_exercise_syncs_log_snapshots() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    let ohp = ledger.add_exercise(push, "Overhead Press")?;

    ledger.add_log(push, bench, 60.0, 5, ts(1, 10))?;
    ledger.add_log(push, ohp, 40.0, 8, ts(2, 10))?;

    ledger.rename_exercise(push, bench, "Incline Bench Press")?;

    let bench_logs: Vec<&LogEntry> = ledger
        .logs()
        .iter()
        .filter(|l| l.exercise_id == bench)
        .collect();
    assert_eq!(bench_logs.len(), 1);
    assert_eq!(bench_logs[0].exercise_name, "Incline Bench Press");
    assert_eq!(bench_logs[0].plan_name, "Push Day");

    // The other exercise's log is untouched
    let ohp_logs: Vec<&LogEntry> = ledger
        .logs()
        .iter()
        .filter(|l| l.exercise_id == ohp)
        .collect();
    assert_eq!(ohp_logs[0].exercise_name, "Overhead Press");

    // Duplicate name within the plan is rejected
    let result = ledger.rename_exercise(push, bench, "overhead press");
    assert!(matches!(
        result,
        Err(LedgerError::ExerciseNameNotUnique(_))
    ));

    Ok(())
}

#[test]
fn test_delete_exercise_cascades_matching_logs() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    let ohp = ledger.add_exercise(push, "Overhead Press")?;

    ledger.add_log(push, bench, 60.0, 5, ts(1, 10))?;
    ledger.add_log(push, bench, 62.5, 4, ts(2, 10))?;
    ledger.add_log(push, ohp, 40.0, 8, ts(3, 10))?;

    let removed = ledger.delete_exercise(push, bench)?;
    assert_eq!(removed, 2);
    assert_eq!(ledger.plan(push).unwrap().exercises.len(), 1);
    assert_eq!(ledger.logs().len(), 1);
    assert_eq!(ledger.logs()[0].exercise_id, ohp);

    assert!(matches!(
        ledger.delete_exercise(push, bench),
        Err(LedgerError::ExerciseNotFound(_))
    ));

    Ok(())
}

#[test]
fn test_add_log_validates_input_and_referents() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let pull = ledger.create_plan("Pull Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;

    // Zero reps
    let result = ledger.add_log(push, bench, 60.0, 0, ts(1, 10));
    assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
    // Negative reps
    let result = ledger.add_log(push, bench, 60.0, -3, ts(1, 10));
    assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
    // Negative weight
    let result = ledger.add_log(push, bench, -10.0, 5, ts(1, 10));
    assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
    // Non-finite weight
    let result = ledger.add_log(push, bench, f64::NAN, 5, ts(1, 10));
    assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
    // None of the failed attempts changed the collection
    assert!(ledger.logs().is_empty());

    // The exercise must belong to the given plan
    let result = ledger.add_log(pull, bench, 60.0, 5, ts(1, 10));
    assert!(matches!(result, Err(LedgerError::ExerciseNotFound(_))));
    assert!(ledger.logs().is_empty());

    // Bodyweight-style entries at weight 0 are allowed
    ledger.add_log(push, bench, 0.0, 12, ts(1, 10))?;
    assert_eq!(ledger.logs().len(), 1);

    Ok(())
}

#[test]
fn test_add_log_snapshots_current_names() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;

    ledger.add_log(push, bench, 60.0, 5, ts(1, 10))?;
    ledger.rename_plan(push, "Chest Day")?;
    ledger.add_log(push, bench, 62.5, 5, ts(2, 10))?;

    let logs = ledger.logs();
    // Both snapshots reflect the current plan name (first via rename sync,
    // second captured at write time)
    assert_eq!(logs[0].plan_name, "Chest Day");
    assert_eq!(logs[1].plan_name, "Chest Day");
    assert_eq!(logs[1].exercise_name, "Bench Press");

    Ok(())
}

#[test]
fn test_delete_log_is_noop_when_absent() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    let log_id = ledger.add_log(push, bench, 60.0, 5, ts(1, 10))?;

    assert!(ledger.delete_log(log_id));
    assert!(ledger.logs().is_empty());
    // Second delete finds nothing and is not an error
    assert!(!ledger.delete_log(log_id));

    Ok(())
}

#[test]
fn test_clear_logs_keeps_plans() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    ledger.add_log(push, bench, 60.0, 5, ts(1, 10))?;
    ledger.add_log(push, bench, 60.0, 6, ts(2, 10))?;

    assert_eq!(ledger.clear_logs(), 2);
    assert!(ledger.logs().is_empty());
    assert_eq!(ledger.plans().len(), 1);
    assert_eq!(ledger.plan(push).unwrap().exercises.len(), 1);

    Ok(())
}

#[test]
fn test_filter_logs_is_conjunctive() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let pull = ledger.create_plan("Pull Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    let ohp = ledger.add_exercise(push, "Overhead Press")?;
    let row = ledger.add_exercise(pull, "Barbell Row")?;

    ledger.add_log(push, bench, 60.0, 5, ts(1, 10))?;
    ledger.add_log(push, ohp, 40.0, 8, ts(2, 10))?;
    ledger.add_log(pull, row, 70.0, 8, ts(3, 10))?;

    // Plan filter alone
    let filters = LogFilters {
        plan_id: Some(push),
        ..Default::default()
    };
    assert_eq!(ledger.filter_logs(&filters).len(), 2);

    // Exercise filter alone
    let filters = LogFilters {
        exercise_id: Some(row),
        ..Default::default()
    };
    assert_eq!(ledger.filter_logs(&filters).len(), 1);

    // Text matches against "exercise_name plan_name", case-insensitive
    let filters = LogFilters {
        text: Some("  PRESS ".to_string()),
        ..Default::default()
    };
    assert_eq!(ledger.filter_logs(&filters).len(), 2);
    let filters = LogFilters {
        text: Some("pull".to_string()),
        ..Default::default()
    };
    assert_eq!(ledger.filter_logs(&filters).len(), 1);

    // All predicates must hold at once
    let filters = LogFilters {
        plan_id: Some(push),
        text: Some("bench".to_string()),
        ..Default::default()
    };
    let matched = ledger.filter_logs(&filters);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].exercise_id, bench);

    // Empty filter text matches everything
    let filters = LogFilters {
        text: Some("   ".to_string()),
        ..Default::default()
    };
    assert_eq!(ledger.filter_logs(&filters).len(), 3);

    Ok(())
}

#[test]
fn test_filter_logs_is_idempotent() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    let ohp = ledger.add_exercise(push, "Overhead Press")?;
    ledger.add_log(push, bench, 60.0, 5, ts(1, 10))?;
    ledger.add_log(push, ohp, 40.0, 8, ts(2, 10))?;

    let filters = LogFilters {
        plan_id: Some(push),
        text: Some("bench".to_string()),
        ..Default::default()
    };
    let once: Vec<LogEntry> = ledger
        .filter_logs(&filters)
        .into_iter()
        .cloned()
        .collect();
    let twice: Vec<LogEntry> = filter_logs(&once, &filters)
        .into_iter()
        .cloned()
        .collect();
    assert_eq!(once, twice);

    Ok(())
}

#[test]
fn test_compute_stats() -> Result<()> {
    // Empty set
    let stats = compute_stats(&[]);
    assert_eq!(stats.total_logs, 0);
    assert_eq!(stats.total_volume, 0.0);
    assert_eq!(stats.unique_exercises, 0);
    assert!(stats.last_workout.is_none());

    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    let ohp = ledger.add_exercise(push, "Overhead Press")?;
    ledger.add_log(push, bench, 60.0, 5, ts(1, 10))?; // volume 300
    ledger.add_log(push, bench, 62.5, 4, ts(3, 10))?; // volume 250
    ledger.add_log(push, ohp, 40.0, 8, ts(2, 10))?; // volume 320

    let filtered = ledger.filter_logs(&LogFilters::default());
    let stats = compute_stats(&filtered);
    assert_eq!(stats.total_logs, 3);
    assert_eq!(stats.total_volume, 870.0);
    assert_eq!(stats.unique_exercises, 2);
    assert_eq!(stats.last_workout, Some(ts(3, 10)));

    Ok(())
}

#[test]
fn test_suggestion_increase_weight_after_two_solid_sessions() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    ledger.add_log(push, bench, 50.0, 8, ts(1, 10))?;
    ledger.add_log(push, bench, 50.0, 9, ts(2, 10))?;

    match ledger.suggest_next(push, bench)? {
        Suggestion::IncreaseWeight { current, next } => {
            assert_eq!(current, 50.0);
            assert_eq!(next, 52.5);
        }
        other => panic!("expected IncreaseWeight, got {other:?}"),
    }

    Ok(())
}

#[test]
fn test_suggestion_ignores_other_weights_in_between() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    // A heavier attempt in between does not break the same-weight streak
    ledger.add_log(push, bench, 50.0, 8, ts(1, 10))?;
    ledger.add_log(push, bench, 60.0, 3, ts(2, 10))?;
    ledger.add_log(push, bench, 50.0, 9, ts(3, 10))?;

    match ledger.suggest_next(push, bench)? {
        Suggestion::IncreaseWeight { next, .. } => assert_eq!(next, 52.5),
        other => panic!("expected IncreaseWeight, got {other:?}"),
    }

    Ok(())
}

#[test]
fn test_suggestion_keep_weight_after_low_reps() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    ledger.add_log(push, bench, 40.0, 3, ts(1, 10))?;

    match ledger.suggest_next(push, bench)? {
        Suggestion::KeepWeight { weight } => assert_eq!(weight, 40.0),
        other => panic!("expected KeepWeight, got {other:?}"),
    }

    Ok(())
}

#[test]
fn test_suggestion_beat_volume_otherwise() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    // Only one session at the current weight, reps neither low nor 8+ twice
    ledger.add_log(push, bench, 80.0, 6, ts(1, 10))?;

    match ledger.suggest_next(push, bench)? {
        Suggestion::BeatVolume {
            weight,
            reps,
            volume,
        } => {
            assert_eq!(weight, 80.0);
            assert_eq!(reps, 6);
            assert_eq!(volume, 480.0);
        }
        other => panic!("expected BeatVolume, got {other:?}"),
    }

    Ok(())
}

#[test]
fn test_suggestion_without_history_or_referents() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;

    assert_eq!(ledger.suggest_next(push, bench)?, Suggestion::NoHistory);

    let result = ledger.suggest_next(push, nil_exercise_id());
    assert!(matches!(result, Err(LedgerError::ExerciseNotFound(_))));

    Ok(())
}

#[test]
fn test_chart_series_is_date_ascending_per_metric() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;
    // Inserted out of date order on purpose
    ledger.add_log(push, bench, 50.0, 10, ts(2, 10))?;
    ledger.add_log(push, bench, 55.0, 5, ts(1, 10))?;

    let weights = ledger.chart_series(push, bench, ChartMetric::Weight)?;
    assert_eq!(weights, vec![(ts(1, 10), 55.0), (ts(2, 10), 50.0)]);

    let volumes = ledger.chart_series(push, bench, ChartMetric::Volume)?;
    assert_eq!(volumes, vec![(ts(1, 10), 275.0), (ts(2, 10), 500.0)]);

    Ok(())
}

#[test]
fn test_resolve_identifiers_by_id_and_name() -> Result<()> {
    let mut ledger = Ledger::new();
    let push = ledger.create_plan("Push Day")?;
    let bench = ledger.add_exercise(push, "Bench Press")?;

    assert_eq!(ledger.resolve_plan("push day").unwrap().id, push);
    assert_eq!(ledger.resolve_plan(&push.to_string()).unwrap().id, push);
    assert!(ledger.resolve_plan("leg day").is_none());

    let plan = ledger.plan(push).unwrap();
    assert_eq!(ledger.resolve_exercise(plan, "BENCH PRESS").unwrap().id, bench);
    assert_eq!(
        ledger.resolve_exercise(plan, &bench.to_string()).unwrap().id,
        bench
    );
    assert!(ledger.resolve_exercise(plan, "squat").is_none());

    Ok(())
}

#[test]
fn test_backup_round_trip() -> Result<()> {
    let (mut service, _dir) = create_test_service()?;
    let push = service.create_plan("Push Day")?;
    let pull = service.create_plan("Pull Day")?;
    let bench = service.add_exercise(push, "Bench Press")?;
    service.add_exercise(pull, "Barbell Row")?;
    service.add_log(push, bench, 60.0, 5)?;
    service.add_log(push, bench, 62.5, 5)?;

    let json = service.export_backup()?;

    let (mut other, _dir2) = create_test_service()?;
    other.import_backup(&json)?;
    assert_eq!(other.ledger.plans(), service.ledger.plans());
    assert_eq!(other.ledger.logs(), service.ledger.logs());

    Ok(())
}

#[test]
fn test_import_rejects_missing_fields() -> Result<()> {
    let (mut service, _dir) = create_test_service()?;
    let push = service.create_plan("Push Day")?;

    let result = service.import_backup(r#"{"plans": []}"#);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("malformed"));

    let result = service.import_backup("not json at all");
    assert!(result.is_err());

    // The ledger is untouched by a rejected import
    assert_eq!(service.ledger.plans().len(), 1);
    assert!(service.ledger.plan(push).is_some());

    Ok(())
}

#[test]
fn test_import_tolerates_missing_version_and_date() -> Result<()> {
    let (mut service, _dir) = create_test_service()?;
    service.import_backup(r#"{"plans": [], "logs": []}"#)?;
    assert!(service.ledger.plans().is_empty());
    assert!(service.ledger.logs().is_empty());
    Ok(())
}

#[test]
fn test_service_persists_across_reload() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = DocumentStore::open(dir.path())?;
    {
        let mut service = AppService {
            config: Config::default(),
            ledger: Ledger::new(),
            store: store.clone(),
            config_path: dir.path().join("config.toml"),
        };
        let push = service.create_plan("Push Day")?;
        let bench = service.add_exercise(push, "Bench Press")?;
        service.add_log(push, bench, 60.0, 5)?;
    }

    let reloaded = AppService::load_ledger(&store)?;
    assert_eq!(reloaded.plans().len(), 1);
    assert_eq!(reloaded.plans()[0].name, "Push Day");
    assert_eq!(reloaded.logs().len(), 1);
    assert_eq!(reloaded.logs()[0].exercise_name, "Bench Press");

    Ok(())
}

#[test]
fn test_load_defaults_to_empty_and_tolerates_garbage() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = DocumentStore::open(dir.path())?;

    // Nothing stored yet
    assert!(store.load_plans()?.is_empty());
    assert!(store.load_logs()?.is_empty());

    // A document that fails to parse surfaces as a decode error...
    store.write("plans", "{definitely not json")?;
    assert!(matches!(store.load_plans(), Err(StoreError::Decode(_))));

    // ...which the application layer maps to an empty ledger
    let ledger = AppService::load_ledger(&store)?;
    assert!(ledger.plans().is_empty());
    assert!(ledger.logs().is_empty());

    Ok(())
}

#[test]
fn test_reset_all_clears_ledger_and_documents() -> Result<()> {
    let (mut service, _dir) = create_test_service()?;
    let push = service.create_plan("Push Day")?;
    let bench = service.add_exercise(push, "Bench Press")?;
    service.add_log(push, bench, 60.0, 5)?;

    service.reset_all()?;
    assert!(service.ledger.plans().is_empty());
    assert!(service.ledger.logs().is_empty());

    // The documents are gone from the store as well
    assert!(service.store.read("plans")?.is_none());
    assert!(service.store.read("logs")?.is_none());

    Ok(())
}
