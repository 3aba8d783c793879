//! Dockdash - Main entry point.
//!
//! A headless front end for the dashboard core: it polls the container
//! runtime and prints each snapshot, or runs one lifecycle operation.
//!
//! Usage: dockdash [OPTIONS] [COMMAND]
//!
//! Options:
//!   --once            Print the first snapshot and exit
//!   --json            Print snapshots and reports as JSON
//!   --config PATH     Use PATH instead of ~/.dockdash/config.toml
//!   --version, -v     Show version
//!   --help, -h        Show this help
//!
//! Commands:
//!   stop <id>         Stop one container
//!   stop-all          Stop every running container
//!   rm <id>           Remove a container
//!   rmi <id>          Remove an image
//!   volume-rm <name>  Remove a volume
//!   prune --yes       Remove all unused containers, images, volumes and cache

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::mpsc;

use dockdash::Config;
use dockdash::dashboard::{
    DashboardEvent, OperationReport, RefreshBundle, RefreshOrchestrator, spawn_poller,
};
use dockdash::docker::{DockerCli, Operation, ProcessExecutor};
use dockdash::logging;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status for a rejected command line.
const EXIT_USAGE: u8 = 2;

/// Exit status for an unavailable runtime or a failed operation.
const EXIT_FAILURE: u8 = 1;

const USAGE: &str = "Usage: dockdash [--once] [--json] [--config PATH] \
[stop <id> | stop-all | rm <id> | rmi <id> | volume-rm <name> | prune --yes]";

/// What the invocation asked for.
#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Watch,
    Run(Operation),
    Version,
    Help,
}

/// Parsed command line.
#[derive(Debug, PartialEq, Eq)]
struct Args {
    mode: Mode,
    once: bool,
    json: bool,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        mode: Mode::Watch,
        once: false,
        json: false,
        config: None,
    };
    let mut confirmed = false;
    let mut positional = Vec::new();

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-v" => return Ok(Args { mode: Mode::Version, ..parsed }),
            "--help" | "-h" => return Ok(Args { mode: Mode::Help, ..parsed }),
            "--once" => parsed.once = true,
            "--json" => parsed.json = true,
            "--yes" | "-y" => confirmed = true,
            "--config" => {
                let path = iter.next().ok_or("--config requires a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with('-') => return Err(format!("unknown option: {}", flag)),
            word => positional.push(word.to_string()),
        }
    }

    let mut words = positional.into_iter();
    let Some(command) = words.next() else {
        return Ok(parsed);
    };

    let mut target = |name: &str| {
        words
            .next()
            .ok_or_else(|| format!("{} requires an argument", name))
    };

    let operation = match command.as_str() {
        "stop" => Operation::Stop(target("stop")?),
        "stop-all" => Operation::StopAll,
        "rm" => Operation::RemoveContainer(target("rm")?),
        "rmi" => Operation::RemoveImage(target("rmi")?),
        "volume-rm" => Operation::RemoveVolume(target("volume-rm")?),
        "prune" if confirmed => Operation::PruneAll,
        "prune" => {
            return Err(
                "prune removes all unused containers, images, volumes and build cache; \
                 pass --yes to confirm"
                    .to_string(),
            );
        }
        other => return Err(format!("unknown command: {}", other)),
    };

    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument: {}", extra));
    }

    parsed.mode = Mode::Run(operation);
    Ok(parsed)
}

/// Process status for a finished operation.
fn operation_status(report: &OperationReport) -> u8 {
    if report.success { 0 } else { EXIT_FAILURE }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("dockdash: {}", e);
            eprintln!("{}", USAGE);
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };

    match args.mode {
        Mode::Version => {
            println!("dockdash v{}", VERSION);
            return Ok(ExitCode::SUCCESS);
        }
        Mode::Help => {
            println!("{}", USAGE);
            return Ok(ExitCode::SUCCESS);
        }
        Mode::Watch | Mode::Run(_) => {}
    }

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Every exit below returns from main so this guard drops and flushes.
    let _log_guard = match logging::init(&config.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: file logging disabled: {}", e);
            None
        }
    };

    let cli = Arc::new(DockerCli::new(
        Arc::new(ProcessExecutor),
        config.runtime_binary(),
    ));

    let availability = cli.check_availability();
    if !availability.is_available() {
        eprintln!("Runtime {}: {}", availability.label(), cli.binary().display());
        eprintln!("{}", availability.guidance());
        let diagnostic = cli.last_error();
        if !diagnostic.is_empty() {
            eprintln!("{}", diagnostic);
        }
        return Ok(ExitCode::from(EXIT_FAILURE));
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = Arc::new(RefreshOrchestrator::new(
        cli,
        config.refresh_plan(),
        tx,
        runtime.handle().clone(),
    ));

    if let Mode::Run(operation) = &args.mode {
        let report = orchestrator.run_operation(operation);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else if report.success {
            println!("{}: ok", report.operation);
        } else {
            println!(
                "{}: failed: {}",
                report.operation,
                report.error.as_deref().unwrap_or("unknown error")
            );
        }
        // Skip waiting on the follow-up refresh.
        runtime.shutdown_background();
        return Ok(ExitCode::from(operation_status(&report)));
    }

    let interval = config.refresh_interval();
    runtime.block_on(async move {
        let poller = spawn_poller(Arc::clone(&orchestrator), interval);

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(DashboardEvent::Refreshed(bundle)) => {
                        print_bundle(&bundle, args.json)?;
                        if args.once {
                            break;
                        }
                    }
                    Some(DashboardEvent::OperationCompleted(_)) => {}
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        poller.abort();
        Ok::<(), serde_json::Error>(())
    })?;

    runtime.shutdown_background();
    Ok(ExitCode::SUCCESS)
}

/// Prints one snapshot as a summary table or a JSON line.
fn print_bundle(bundle: &RefreshBundle, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(bundle)?);
        return Ok(());
    }

    let snapshot = &bundle.snapshot;
    println!(
        "[{}] CPU {:.1}% | Memory {} | {} container(s) polled",
        chrono::Local::now().format("%H:%M:%S"),
        snapshot.cpu_percent,
        snapshot.memory_usage,
        snapshot.container_count
    );

    let running: Vec<_> = bundle.running().collect();
    println!("  Running ({})", running.len());
    for c in running {
        println!("    {:<14} {:<24} {:<20} {}", short_id(&c.id), c.name, c.status, c.image);
    }

    let stopped: Vec<_> = bundle.stopped().collect();
    println!("  Stopped ({})", stopped.len());
    for c in stopped {
        println!("    {:<14} {:<24} {:<20} {}", short_id(&c.id), c.name, c.status, c.image);
    }

    println!("  Images ({})", bundle.images.len());
    for image in &bundle.images {
        println!("    {:<14} {:<40} {}", short_id(&image.id), image.full_name(), image.size);
    }

    println!("  Volumes ({})", bundle.volumes.len());
    for volume in &bundle.volumes {
        println!("    {:<40} {}", volume.name, volume.driver);
    }

    Ok(())
}

/// Shortens a runtime ID for display.
fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..12).unwrap_or(id)
}
