// src/main.rs
mod cli;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use std::fs;
use std::io::{self, stdin, stdout, Write};

use workout_planner_lib::{
    parse_color, AppService, ChartMetric, ExerciseId, LogEntry, LogFilters, LogId, LogStats, Plan,
    Suggestion, Units,
};

fn main() -> Result<()> {
    let cli_args = cli::parse_args();
    let export_csv = cli_args.export_csv;

    // Completion generation needs no service at all, handle it first
    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();
        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    // Initialize the application service (loads config and data documents)
    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;

    let header_color = parse_color(&service.config.theme.header_color)
        .map(Color::from)
        .unwrap_or(Color::Cyan);
    let units = service.config.units;

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }

        // --- Plan Commands ---
        cli::Commands::CreatePlan { name } => match service.create_plan(&name) {
            Ok(id) => println!("Successfully created plan: '{}' ID: {}", name.trim(), id),
            Err(e) => bail!("Error creating plan: {}", e),
        },
        cli::Commands::RenamePlan { plan, new_name } => {
            let plan_id = service.resolve_plan(&plan)?.id;
            match service.rename_plan(plan_id, &new_name) {
                Ok(()) => println!(
                    "Successfully renamed plan '{}' to '{}'. Its log entries were updated to match.",
                    plan,
                    new_name.trim()
                ),
                Err(e) => bail!("Error renaming plan '{}': {}", plan, e),
            }
        }
        cli::Commands::DeletePlan { plan } => {
            let (plan_id, plan_name) = {
                let resolved = service.resolve_plan(&plan)?;
                (resolved.id, resolved.name.clone())
            };
            match service.delete_plan(plan_id) {
                Ok(removed_logs) => println!(
                    "Successfully deleted plan '{plan_name}' ({removed_logs} log entr{} removed).",
                    if removed_logs == 1 { "y" } else { "ies" }
                ),
                Err(e) => bail!("Error deleting plan '{}': {}", plan, e),
            }
        }

        // --- Exercise Commands ---
        cli::Commands::AddExercise { plan, name } => {
            let plan_id = service.resolve_plan(&plan)?.id;
            match service.add_exercise(plan_id, &name) {
                Ok(id) => println!(
                    "Successfully added exercise '{}' to plan '{}' ID: {}",
                    name.trim(),
                    plan,
                    id
                ),
                Err(e) => bail!("Error adding exercise: {}", e),
            }
        }
        cli::Commands::RenameExercise {
            plan,
            exercise,
            new_name,
        } => {
            let plan_id = service.resolve_plan(&plan)?.id;
            let exercise_id = service.resolve_exercise(plan_id, &exercise)?.id;
            match service.rename_exercise(plan_id, exercise_id, &new_name) {
                Ok(()) => println!(
                    "Successfully renamed exercise '{}' to '{}'. Its log entries were updated to match.",
                    exercise,
                    new_name.trim()
                ),
                Err(e) => bail!("Error renaming exercise '{}': {}", exercise, e),
            }
        }
        cli::Commands::DeleteExercise { plan, exercise } => {
            let plan_id = service.resolve_plan(&plan)?.id;
            let (exercise_id, exercise_name) = {
                let resolved = service.resolve_exercise(plan_id, &exercise)?;
                (resolved.id, resolved.name.clone())
            };
            match service.delete_exercise(plan_id, exercise_id) {
                Ok(removed_logs) => println!(
                    "Successfully deleted exercise '{exercise_name}' ({removed_logs} log entr{} removed).",
                    if removed_logs == 1 { "y" } else { "ies" }
                ),
                Err(e) => bail!("Error deleting exercise '{}': {}", exercise, e),
            }
        }

        // --- Log Commands ---
        cli::Commands::Log {
            plan,
            exercise,
            weight,
            reps,
        } => {
            let plan_id = service.resolve_plan(&plan)?.id;
            let (exercise_id, exercise_name) = {
                let resolved = service.resolve_exercise(plan_id, &exercise)?;
                (resolved.id, resolved.name.clone())
            };
            match service.add_log(plan_id, exercise_id, weight, reps) {
                Ok(id) => println!(
                    "Successfully logged '{exercise_name}': {weight}{} x {reps} reps ID: {id}",
                    weight_unit(units)
                ),
                Err(e) => bail!("Error adding log entry: {}", e),
            }
        }
        cli::Commands::DeleteLog { id } => {
            let log_id: LogId = id
                .parse()
                .map_err(|_| anyhow!("Invalid log entry ID: '{}'", id))?;
            if service.delete_log(log_id)? {
                println!("Successfully deleted log entry ID {log_id}");
            } else {
                println!("No log entry found with ID {log_id}.");
            }
        }
        cli::Commands::ClearLogs => {
            if prompt_confirm("Clear ALL logs? Plans and exercises will stay.")? {
                let count = service.clear_logs()?;
                println!("Successfully cleared {count} log entr{}.", if count == 1 { "y" } else { "ies" });
            } else {
                println!("Aborted.");
            }
        }

        // --- Queries ---
        cli::Commands::List {
            plan,
            exercise,
            search,
        } => {
            let filters = build_filters(&service, plan, exercise, search)?;
            let mut logs = service.filter_logs(&filters);
            logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)); // newest first
            if logs.is_empty() {
                println!("No log entries match the criteria.");
            } else if export_csv {
                print_logs_csv(&logs, units)?;
            } else {
                print_logs_table(&logs, header_color, units);
            }
        }
        cli::Commands::ListPlans => {
            let plans = service.ledger.plans();
            if plans.is_empty() {
                println!("No plans defined yet.");
            } else if export_csv {
                print_plans_csv(plans)?;
            } else {
                print_plans_table(plans, header_color);
            }
        }
        cli::Commands::Stats {
            plan,
            exercise,
            search,
        } => {
            let filters = build_filters(&service, plan, exercise, search)?;
            let stats = service.stats(&filters);
            if export_csv {
                print_stats_csv(&stats, units)?;
            } else {
                print_stats_table(&stats, units);
            }
        }
        cli::Commands::Suggest { plan, exercise } => {
            let plan_id = service.resolve_plan(&plan)?.id;
            let (exercise_id, exercise_name) = {
                let resolved = service.resolve_exercise(plan_id, &exercise)?;
                (resolved.id, resolved.name.clone())
            };
            let suggestion = service.suggest_next(plan_id, exercise_id)?;
            println!("--- Suggestion for '{exercise_name}' ---");
            print_suggestion(&suggestion, units);
        }
        cli::Commands::Chart {
            plan,
            exercise,
            metric,
        } => {
            let plan_id = service.resolve_plan(&plan)?.id;
            let (exercise_id, exercise_name) = {
                let resolved = service.resolve_exercise(plan_id, &exercise)?;
                (resolved.id, resolved.name.clone())
            };
            let metric = metric
                .map(cli_metric_to_metric)
                .unwrap_or(service.config.default_chart_metric);
            let series = service.chart_series(plan_id, exercise_id, metric)?;
            if series.is_empty() {
                println!("No log entries for '{exercise_name}' yet.");
            } else if export_csv {
                print_chart_csv(&series, metric, units)?;
            } else {
                println!("--- {exercise_name} ({metric}) ---");
                print_chart_table(&series, metric, header_color, units);
            }
        }

        // --- Import/Export ---
        cli::Commands::Export { output } => {
            let path = output.unwrap_or_else(|| "workout_planner_export.json".into());
            let json = service.export_backup()?;
            fs::write(&path, json)
                .with_context(|| format!("Failed to write backup to {}", path.display()))?;
            println!(
                "Successfully exported {} plan(s) and {} log entr{} to {}",
                service.ledger.plans().len(),
                service.ledger.logs().len(),
                if service.ledger.logs().len() == 1 { "y" } else { "ies" },
                path.display()
            );
        }
        cli::Commands::Import { file } => {
            let contents = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read backup from {}", file.display()))?;
            match service.import_backup(&contents) {
                Ok(()) => println!(
                    "Successfully imported {} plan(s) and {} log entr{}.",
                    service.ledger.plans().len(),
                    service.ledger.logs().len(),
                    if service.ledger.logs().len() == 1 { "y" } else { "ies" }
                ),
                Err(e) => bail!("Error importing '{}': {}", file.display(), e),
            }
        }
        cli::Commands::Reset => {
            if prompt_confirm("Reset EVERYTHING? (Plans + Exercises + Logs)")? {
                service.reset_all()?;
                println!("Successfully reset all data.");
            } else {
                println!("Aborted.");
            }
        }

        // --- Config / Paths ---
        cli::Commands::DataPath => {
            println!("{}", service.get_data_dir().display());
        }
        cli::Commands::ConfigPath => {
            println!("{}", service.get_config_path().display());
        }
        cli::Commands::SetUnits { units } => {
            let units = cli_units_to_units(units);
            match service.set_units(units) {
                Ok(()) => println!("Successfully set units to {units:?}."),
                Err(e) => bail!("Error setting units: {}", e),
            }
        }
        cli::Commands::SetChartMetric { metric } => {
            let metric = cli_metric_to_metric(metric);
            match service.set_default_chart_metric(metric) {
                Ok(()) => println!("Successfully set default chart metric to {metric}."),
                Err(e) => bail!("Error setting chart metric: {}", e),
            }
        }
    }

    Ok(())
}

const fn cli_units_to_units(units: cli::UnitsCli) -> Units {
    match units {
        cli::UnitsCli::Metric => Units::Metric,
        cli::UnitsCli::Imperial => Units::Imperial,
    }
}

const fn cli_metric_to_metric(metric: cli::ChartMetricCli) -> ChartMetric {
    match metric {
        cli::ChartMetricCli::Weight => ChartMetric::Weight,
        cli::ChartMetricCli::Volume => ChartMetric::Volume,
    }
}

const fn weight_unit(units: Units) -> &'static str {
    match units {
        Units::Metric => "kg",
        Units::Imperial => "lbs",
    }
}

/// Resolves the optional plan/exercise/search arguments into log filters.
/// An exercise name only resolves within a plan; without `--plan` the
/// exercise filter must be an id.
fn build_filters(
    service: &AppService,
    plan: Option<String>,
    exercise: Option<String>,
    search: Option<String>,
) -> Result<LogFilters> {
    let plan_id = match &plan {
        Some(identifier) => Some(service.resolve_plan(identifier)?.id),
        None => None,
    };
    let exercise_id = match &exercise {
        Some(identifier) => Some(match plan_id {
            Some(plan_id) => service.resolve_exercise(plan_id, identifier)?.id,
            None => identifier.trim().parse::<ExerciseId>().map_err(|_| {
                anyhow!(
                    "Exercise filter '{}' needs --plan to resolve by name (or pass an exercise ID).",
                    identifier
                )
            })?,
        }),
        None => None,
    };
    Ok(LogFilters {
        plan_id,
        exercise_id,
        text: search,
    })
}

/// y/N prompt for the destructive bulk commands.
fn prompt_confirm(question: &str) -> Result<bool> {
    print!("{question} (y/N): ");
    stdout().flush()?;
    let mut input = String::new();
    stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn print_suggestion(suggestion: &Suggestion, units: Units) {
    let unit = weight_unit(units);
    let message = match suggestion {
        Suggestion::NoHistory => {
            "No previous logs for this exercise yet. Start with a comfortable weight.".to_string()
        }
        Suggestion::IncreaseWeight { current, next } => format!(
            "You're consistent at {current}{unit}. Try {next}{unit} next time (small progressive overload)."
        ),
        Suggestion::KeepWeight { weight } => {
            format!("Reps were low last time. Keep {weight}{unit} and aim for one more rep.")
        }
        Suggestion::BeatVolume {
            weight,
            reps,
            volume,
        } => format!(
            "Aim to beat last time: {weight}{unit} x {reps} (volume {volume}). Add a rep or improve form."
        ),
    };
    println!("{message}");
}

// --- Table Printing Functions ---

/// Prints log entries in a formatted table.
fn print_logs_table(logs: &[&LogEntry], header_color: Color, units: Units) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Timestamp (UTC)").fg(header_color),
            Cell::new("Plan").fg(header_color),
            Cell::new("Exercise").fg(header_color),
            Cell::new(format!("Weight ({})", weight_unit(units))).fg(header_color),
            Cell::new("Reps").fg(header_color),
            Cell::new("Volume").fg(header_color),
        ]);

    for log in logs {
        table.add_row(vec![
            Cell::new(log.id.to_string()),
            Cell::new(log.timestamp.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(&log.plan_name),
            Cell::new(&log.exercise_name),
            Cell::new(format!("{:.2}", log.weight)),
            Cell::new(log.reps.to_string()),
            Cell::new(format!("{:.2}", log.volume())),
        ]);
    }
    println!("{table}");
}

fn print_logs_csv(logs: &[&LogEntry], units: Units) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(&[
        "ID",
        "Timestamp_UTC",
        "Plan",
        "Exercise",
        &format!("Weight_{}", weight_unit(units)),
        "Reps",
        "Volume",
    ])?;
    for log in logs {
        writer.write_record(&[
            log.id.to_string(),
            log.timestamp.to_rfc3339(),
            log.plan_name.clone(),
            log.exercise_name.clone(),
            format!("{:.2}", log.weight),
            log.reps.to_string(),
            format!("{:.2}", log.volume()),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Prints plans and their exercises in a formatted table.
fn print_plans_table(plans: &[Plan], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Name").fg(header_color),
            Cell::new("Exercises").fg(header_color),
        ]);

    for plan in plans {
        let exercises = if plan.exercises.is_empty() {
            "-".to_string()
        } else {
            plan.exercises
                .iter()
                .map(|x| x.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        table.add_row(vec![
            Cell::new(plan.id.to_string()),
            Cell::new(&plan.name),
            Cell::new(exercises),
        ]);
    }
    println!("{table}");
}

fn print_plans_csv(plans: &[Plan]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(&["ID", "Name", "Exercises"])?;
    for plan in plans {
        let exercises = plan
            .exercises
            .iter()
            .map(|x| x.name.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        writer.write_record(&[plan.id.to_string(), plan.name.clone(), exercises])?;
    }
    writer.flush()?;
    Ok(())
}

/// Prints aggregate statistics as a key/value table.
fn print_stats_table(stats: &LogStats, units: Units) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Total Logs").add_attribute(Attribute::Bold),
        Cell::new(stats.total_logs),
    ]);
    table.add_row(vec![
        Cell::new(format!("Total Volume ({})", weight_unit(units))).add_attribute(Attribute::Bold),
        Cell::new(format!("{:.2}", stats.total_volume)),
    ]);
    table.add_row(vec![
        Cell::new("Unique Exercises").add_attribute(Attribute::Bold),
        Cell::new(stats.unique_exercises),
    ]);
    table.add_row(vec![
        Cell::new("Last Workout").add_attribute(Attribute::Bold),
        Cell::new(
            stats
                .last_workout
                .map_or("N/A".to_string(), |ts| {
                    ts.format("%Y-%m-%d %H:%M").to_string()
                }),
        ),
    ]);

    println!("{table}");
}

fn print_stats_csv(stats: &LogStats, units: Units) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(&[
        "Total_Logs",
        &format!("Total_Volume_{}", weight_unit(units)),
        "Unique_Exercises",
        "Last_Workout_UTC",
    ])?;
    writer.write_record(&[
        stats.total_logs.to_string(),
        format!("{:.2}", stats.total_volume),
        stats.unique_exercises.to_string(),
        stats
            .last_workout
            .map_or(String::new(), |ts| ts.to_rfc3339()),
    ])?;
    writer.flush()?;
    Ok(())
}

/// Prints a date-ascending metric series.
fn print_chart_table(
    series: &[(DateTime<Utc>, f64)],
    metric: ChartMetric,
    header_color: Color,
    units: Units,
) {
    let metric_header = match metric {
        ChartMetric::Weight => format!("Weight ({})", weight_unit(units)),
        ChartMetric::Volume => "Volume".to_string(),
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Date").fg(header_color),
            Cell::new(metric_header).fg(header_color),
        ]);

    for (timestamp, value) in series {
        table.add_row(vec![
            Cell::new(timestamp.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(format!("{value:.2}")),
        ]);
    }
    println!("{table}");
}

fn print_chart_csv(
    series: &[(DateTime<Utc>, f64)],
    metric: ChartMetric,
    units: Units,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    let metric_header = match metric {
        ChartMetric::Weight => format!("Weight_{}", weight_unit(units)),
        ChartMetric::Volume => "Volume".to_string(),
    };
    writer.write_record(&["Timestamp_UTC", &metric_header])?;
    for (timestamp, value) in series {
        writer.write_record(&[timestamp.to_rfc3339(), format!("{value:.2}")])?;
    }
    writer.flush()?;
    Ok(())
}
