use clap::Parser;

use proctorwatch::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    proctorwatch::utils::init_logging();
    log::info!("proctorwatch starting up...");

    proctorwatch::run(Cli::parse()).await
}
