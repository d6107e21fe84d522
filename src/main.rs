use anyhow::{Context, Result};
use release_runner::cli::commands::{ListCommand, NotesCommand, RunCommand, ValidateCommand};
use release_runner::cli::output::*;
use release_runner::cli::terminal_output::TerminalSink;
use release_runner::cli::{Cli, Command};
use release_runner::core::ReleaseConfig;
use release_runner::execution::ShellExecutor;
use release_runner::output::OutputSession;
use release_runner::release::{split_records, ReleaseError, ReleaseRequest, ReleaseWorkflow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let root = cli.root().context("Failed to resolve workspace root")?;
    let config_path = cli.config_path(&root);

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_task(cmd, &cli, &root, &config_path).await?,
        Command::Notes(cmd) => update_notes(cmd, &root, &config_path)?,
        Command::Validate(cmd) => validate_config(cmd, &config_path)?,
        Command::List(cmd) => list_tasks(cmd, &config_path)?,
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<ReleaseConfig> {
    ReleaseConfig::from_file(path)
        .with_context(|| format!("Failed to load release config {}", path.display()))
}

/// Records from repeated `--record` flags plus an optional records file
fn collect_records(records: &[String], records_file: Option<&PathBuf>) -> Result<Vec<String>> {
    let mut all = records.to_vec();
    if let Some(path) = records_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read records file {}", path.display()))?;
        all.extend(split_records(&text));
    }
    Ok(all)
}

async fn run_task(cmd: &RunCommand, cli: &Cli, root: &Path, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    for (task, step, name) in config.unbound_placeholders() {
        if !cmd.var.iter().any(|(key, _)| key == &name) {
            warn!("Task '{}' step '{}' uses unset variable ${{{}}}", task, step, name);
        }
    }

    let request = ReleaseRequest {
        task: cmd.task.clone(),
        version: cmd.version.clone(),
        records: collect_records(&cmd.record, cmd.records_file.as_ref())?,
        overrides: cmd.var.iter().cloned().collect(),
        skip_notes: cmd.no_notes,
    };

    for (key, value) in &request.overrides {
        println!(
            "{} Variable override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let session = OutputSession::open(Arc::new(TerminalSink::for_stdout()));
    let workflow = ReleaseWorkflow::new(config, root, ShellExecutor::new());

    if cli.verbose {
        workflow.runner().add_event_handler(|event| {
            eprintln!("{}", format_run_event(&event));
        });
    }

    session.activate(Some(&format!(
        "{} Release {} in {}\n",
        ROCKET,
        style(&request.version).bold(),
        style(root.display()).dim()
    )));

    // Steps run in their own process group, so Ctrl-C has to be forwarded by dropping the run
    let result = tokio::select! {
        result = workflow.release(&request, &session) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let Some(result) = result else {
        session.writeln(&format!("\n{} {}", CROSS, style("Interrupted").red()));
        warn!("Release interrupted; step processes killed");
        session.request_exit();
        std::process::exit(130);
    };

    let code = match result {
        Ok(report) => {
            session.writeln(&format!(
                "\n{} {} {} completed {}",
                CHECK,
                style(&report.outcome.task).bold(),
                style(&report.version).cyan(),
                style("successfully").green()
            ));
            0
        }
        Err(ReleaseError::StepFailure { outcome, .. }) => {
            let summary = match outcome.failure() {
                Some((index, step, reason)) => {
                    format!("step {} ({}) {}", index + 1, step, format_failure(reason))
                }
                None => format_status(outcome.status()),
            };
            session.writeln(&format!(
                "\n{} {} {}: {}",
                CROSS,
                style(&outcome.task).bold(),
                style("failed").red(),
                summary
            ));
            error!("Task {} failed: {}", outcome.task, summary);
            1
        }
        Err(e) => {
            session.writeln(&format!("\n{} {}", CROSS, style(&e).red()));
            error!("{}", e);
            1
        }
    };

    if cmd.hold {
        session.writeln(&format!("{} Press Enter to exit", INFO));
        let _ = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)
        })
        .await;
    }
    session.request_exit();

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn update_notes(cmd: &NotesCommand, root: &Path, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let records = release_runner::notes::clean_records(&collect_records(
        &cmd.record,
        cmd.records_file.as_ref(),
    )?);
    let workflow = ReleaseWorkflow::new(config, root, ShellExecutor::new());

    if cmd.dry_run {
        let (path, merged) = workflow.preview_notes(&cmd.version, &records)?;
        println!("{} Would write {}:\n", INFO, style(path.display()).dim());
        print!("{}", merged);
        return Ok(());
    }

    let path = workflow.write_notes(&cmd.version, &records)?;
    println!("{} Release notes updated: {}", CHECK, style(path.display()).bold());
    Ok(())
}

fn validate_config(cmd: &ValidateCommand, config_path: &Path) -> Result<()> {
    let result = ReleaseConfig::from_file(config_path);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&validation_json(&result))?);
        if result.is_err() {
            std::process::exit(1);
        }
        return Ok(());
    }

    println!("{} Validating {}...", INFO, style(config_path.display()).dim());

    match result {
        Ok(config) => {
            println!("{} Release configuration is valid!", CHECK);
            println!("  Tasks: {}", style(config.tasks.len()).cyan());
            println!("  Notes file: {}", style(&config.notes.file).bold());
            println!("  Testing notes file: {}", style(&config.notes.testing_file).bold());

            for (task, step, name) in config.unbound_placeholders() {
                println!(
                    "  {} {} / {}: ${{{}}} is not set (pass it with --var)",
                    WARN,
                    style(&task).bold(),
                    step,
                    style(&name).yellow()
                );
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

fn list_tasks(cmd: &ListCommand, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&tasks_json(&config))?);
        return Ok(());
    }

    if config.tasks.is_empty() {
        println!("{} No tasks configured", INFO);
        return Ok(());
    }

    println!("{} Tasks in {}:", INFO, style(config_path.display()).dim());
    for task in &config.tasks {
        println!("{}", format_task(task, cmd.steps));
    }
    Ok(())
}
