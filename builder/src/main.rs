//! libnode builder CLI entrypoint.
//!
//! Builds Node.js as a static library for the host's target, assembles the
//! libraries and bindings into `libnode/`, and zips the result. The archive
//! path is printed on stdout so CI scripts can upload it.

use camino::Utf8PathBuf;
use clap::Parser;
use env_logger::{Builder as LogBuilder, Env};
use libnode_builder::cli::{Cli, Command};
use libnode_builder::config::Settings;
use libnode_builder::error::Result;
use libnode_builder::exec::SystemCommandExecutor;
use libnode_builder::output::{
    dry_run_text, report_json, target_summary, write_stderr_line,
    write_stdout_line,
};
use libnode_builder::pipeline::{self, PipelineContext, RunReport, absolute_dir};
use libnode_builder::target::Host;
use log::LevelFilter;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// `RUST_LOG` wins when set; otherwise `-v` raises the level step by step.
fn init_logging(cli: &Cli) {
    let level = log_level(cli.global.verbosity, cli.global.quiet);
    LogBuilder::from_env(Env::default().default_filter_or(level.as_str()))
        .format_timestamp_secs()
        .init();
}

fn log_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let settings = cli.global.settings()?;
    let workdir = absolute_dir(cli.workdir())?;
    let context = PipelineContext {
        workdir: &workdir,
        settings: &settings,
        host: Host::current()?,
        quiet: cli.global.quiet,
    };

    match cli.command() {
        Command::Resolve => {
            let report = pipeline::describe(&context)?;
            emit(cli, &report, target_summary(&report), stdout)
        }
        Command::Test(args) => {
            let crate_dir = absolute_dir(&args.crate_dir)?;
            if cli.global.dry_run {
                let report = pipeline::describe(&context)?;
                write_stderr_line(stderr, dry_run_text(&report));
                write_stderr_line(
                    stderr,
                    format!("Would test {crate_dir} against {}", context.layout().result_dir),
                );
                return Ok(());
            }
            pipeline::test_consumer(&SystemCommandExecutor, &context, &crate_dir, stderr)
        }
        command => run_stages(cli, &context, &settings, &command, stdout, stderr),
    }
}

fn run_stages(
    cli: &Cli,
    context: &PipelineContext<'_>,
    settings: &Settings,
    command: &Command,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let stages = command.stages();

    if cli.global.dry_run {
        let report = pipeline::plan(context, &stages)?;
        if cli.global.json {
            write_stdout_line(stdout, report_json(&report)?);
        } else {
            write_stderr_line(stderr, dry_run_text(&report));
        }
        return Ok(());
    }

    log::info!(
        "node {} for {} on {}",
        settings.node_version,
        settings.architecture,
        context.host.os
    );
    let report = pipeline::run(&SystemCommandExecutor, context, &stages, stderr)?;
    let archive_path = report
        .archive
        .as_ref()
        .map(|output| output.archive_path.clone());
    emit(cli, &report, archive_line(archive_path), stdout)
}

fn archive_line(archive_path: Option<Utf8PathBuf>) -> String {
    archive_path.map(|path| path.to_string()).unwrap_or_default()
}

/// Print `text` on stdout, or the JSON report when `--json` is given.
fn emit(cli: &Cli, report: &RunReport, text: String, stdout: &mut dyn Write) -> Result<()> {
    let line = if cli.global.json {
        report_json(report)?
    } else {
        text
    };
    if !line.is_empty() {
        write_stdout_line(stdout, line);
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {}", error_chain(&err)));
            1
        }
    }
}

/// `err` followed by each of its causes, separated by `: `.
fn error_chain(err: &dyn std::error::Error) -> String {
    std::iter::successors(Some(err), |e| e.source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}
