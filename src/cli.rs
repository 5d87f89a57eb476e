use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "proctorwatch",
    version,
    about = "Turn face counts and object detections into a proctoring record and integrity score"
)]
pub struct Cli {
    /// JSON settings file (defaults are used for anything it leaves out)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a JSON-lines recording of observations on its own timestamps
    Replay(ReplayArgs),
    /// Run a live session against simulated detectors
    Simulate(SimulateArgs),
    /// Write the default settings to a file
    InitConfig {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Args)]
pub struct SubjectArgs {
    /// Display name printed on the report
    #[arg(long, default_value = "Candidate")]
    pub subject: String,

    /// Stable identifier stamped on every event (defaults to the display name)
    #[arg(long)]
    pub subject_id: Option<String>,
}

impl SubjectArgs {
    pub fn subject_id(&self) -> &str {
        self.subject_id.as_deref().unwrap_or(&self.subject)
    }
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = ReportFormat::Csv)]
    pub format: ReportFormat,

    /// Write the report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Recording with one `faces` or `objects` record per line
    pub file: PathBuf,

    #[command(flatten)]
    pub subject: SubjectArgs,

    #[arg(long)]
    pub session_id: Option<String>,

    /// Also print the recorded events to stderr
    #[arg(long)]
    pub events: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Session length in seconds
    #[arg(long, default_value_t = 60)]
    pub seconds: u64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub subject: SubjectArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}
