//! Release installer CLI entrypoint.
//!
//! This binary publishes the application, stages its files, and compiles the
//! NSIS installer. It exits with status 0 on success and 1 on any failure.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use release_installer::cli::{Cli, RunArgs};
use release_installer::config::{PipelineConfig, ReleaseSettings};
use release_installer::error::{PipelineError, Result};
use release_installer::interrupt::InterruptFlag;
use release_installer::output::{DryRunInfo, summary_text, write_stderr_line};
use release_installer::pipeline::{Pipeline, RunSummary};
use release_installer::process::SystemCommandExecutor;
use std::io::{IsTerminal, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.run);

    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let interrupted = matches!(run_result, Err(PipelineError::Interrupted { .. }));
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);

    if should_pause(&cli.run, std::io::stdin().is_terminal(), interrupted) {
        wait_for_enter(&mut stderr);
    }
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let root = resolve_root(cli.run.root.as_deref())?;
    let settings = ReleaseSettings::discover(&root, cli.run.config.as_deref())?;
    let config = PipelineConfig::new(&root, settings)?;
    let pipeline = Pipeline::for_kind(cli.kind());

    // Dry-run mode: show what would be done without side effects
    if cli.run.dry_run {
        let info = DryRunInfo {
            config: &config,
            pipeline: &pipeline,
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(());
    }

    let interrupt = InterruptFlag::install()?;
    let outcome = pipeline.run(
        &config,
        &SystemCommandExecutor,
        &interrupt,
        stderr,
        cli.run.quiet,
    );
    interrupt.finish();
    let summary = outcome?;

    report_summary(&summary, &cli.run, &mut std::io::stdout(), stderr)
}

/// Resolves the working root to an absolute path so child processes that run
/// in other directories still see the same paths.
fn resolve_root(requested: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    let candidate = match requested {
        Some(path) => path.as_std_path().to_path_buf(),
        None => std::env::current_dir()?,
    };
    let absolute = std::path::absolute(&candidate)?;
    let root = Utf8PathBuf::from_path_buf(absolute).map_err(|path| {
        PipelineError::InvalidConfig {
            reason: format!("working root is not valid UTF-8: {}", path.display()),
        }
    })?;

    if !root.is_dir() {
        return Err(PipelineError::InvalidConfig {
            reason: format!("working root {root} is not a directory"),
        });
    }
    Ok(root)
}

fn report_summary(
    summary: &RunSummary,
    args: &RunArgs,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    if args.json {
        let json = serde_json::to_string_pretty(summary).map_err(std::io::Error::from)?;
        writeln!(stdout, "{json}")?;
    } else if !args.quiet {
        write_stderr_line(stderr, summary_text(summary));
    }
    Ok(())
}

/// Default log filter when `RUST_LOG` is unset.
fn log_filter(args: &RunArgs) -> &'static str {
    match (args.quiet, args.verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    }
}

fn init_logging(args: &RunArgs) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(args)));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
    if installed.is_err() {
        // A global subscriber is already set; keep it.
    }
}

/// Interactive runs wait for Enter unless the operator already interrupted.
fn should_pause(args: &RunArgs, stdin_is_terminal: bool, interrupted: bool) -> bool {
    stdin_is_terminal && !interrupted && !args.no_pause && !args.json
}

fn wait_for_enter(stderr: &mut dyn Write) {
    write_stderr_line(stderr, "Press Enter to exit...");
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        // Nothing to wait for once stdin is gone.
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
