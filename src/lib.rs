pub mod cli;
pub mod error;
pub mod event_log;
pub mod flagger;
pub mod focus;
pub mod models;
pub mod monitor;
pub mod report;
pub mod scoring;
pub mod sensing;
pub mod settings;
pub mod utils;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use tokio::sync::broadcast::error::RecvError;

use cli::{Cli, Command, OutputArgs, ReplayArgs, ReportFormat, SimulateArgs};
use models::Session;
use monitor::{read_records, MonitorController, SessionReplay};
use report::Report;
use sensing::{SimulatedFaces, SimulatedObjects};
use settings::MonitorSettings;

pub use error::ObservationError;
pub use event_log::EventLog;
pub use focus::{FocusDebouncer, FocusState};
pub use models::{Detection, Event, EventKind, FaceObservation, ObjectObservation};
pub use report::build_report;
pub use scoring::{score, EventCounts};

/// Events shown by the live feed's "recent" view.
pub const RECENT_EVENTS: usize = 15;

pub async fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => MonitorSettings::load(path)?,
        None => MonitorSettings::default(),
    };

    match cli.command {
        Command::Replay(args) => replay(args, &settings),
        Command::Simulate(args) => simulate(args, settings).await,
        Command::InitConfig { path } => {
            MonitorSettings::default().save(&path)?;
            info!("wrote default settings to {}", path.display());
            Ok(())
        }
    }
}

fn replay(args: ReplayArgs, settings: &MonitorSettings) -> Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("failed to open recording {}", args.file.display()))?;
    let records = read_records(BufReader::new(file))?;

    let started_at = records
        .first()
        .map(|record| record.observed_at())
        .unwrap_or_else(Utc::now);
    let session = match &args.session_id {
        Some(id) => Session::with_id(id, args.subject.subject_id(), &args.subject.subject, started_at),
        None => Session::new(args.subject.subject_id(), &args.subject.subject, started_at),
    };

    let mut replay = SessionReplay::new(session, settings);
    let rejected = replay.run(&records);
    if rejected > 0 {
        log::warn!("{rejected} of {} observations were rejected", records.len());
    }

    let end = replay.clock();
    let (report, events) = replay.finish(end);
    if args.events {
        for event in &events {
            eprintln!("{}", event.describe(&settings.focus));
        }
    }

    write_report(&report, &args.output)
}

async fn simulate(args: SimulateArgs, settings: MonitorSettings) -> Result<()> {
    let focus = settings.focus.clone();
    let controller = MonitorController::new(settings);
    let session = controller
        .start_session(
            args.subject.subject_id(),
            &args.subject.subject,
            SimulatedFaces::new(args.seed),
            SimulatedObjects::new(args.seed.wrapping_add(1)),
        )
        .await?;

    let mut feed = controller.subscribe().await?;
    let feed_focus = focus.clone();
    let printer = tokio::spawn(async move {
        loop {
            match feed.recv().await {
                Ok(event) => eprintln!("{}", event.describe(&feed_focus)),
                Err(RecvError::Lagged(skipped)) => eprintln!("... {skipped} events not shown"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    info!(
        "simulating session {} for {}s (Ctrl-C to stop early)",
        session.id, args.seconds
    );
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.seconds)) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted; ending session"),
    }

    let recent = controller.recent_events(RECENT_EVENTS).await?;
    let state = controller.focus_state().await?;
    let report = controller.end_session().await?;
    let _ = printer.await;

    eprintln!("-- recent events --");
    for event in &recent {
        eprintln!("{}", event.describe(&focus));
    }
    for warning in state.warnings(&focus) {
        eprintln!("! {warning}");
    }

    write_report(&report, &args.output)
}

fn write_report(report: &Report, output: &OutputArgs) -> Result<()> {
    let rendered = match output.format {
        ReportFormat::Csv => report.to_csv(),
        ReportFormat::Json => report.to_json()?,
    };

    match &output.output {
        Some(path) => write_file(path, &rendered),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write report to {}", path.display()))
}
