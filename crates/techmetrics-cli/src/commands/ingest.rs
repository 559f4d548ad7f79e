//! Ingest command: load an extraction batch file into snapshot history

use std::path::PathBuf;

use clap::{Args, Subcommand};
use techmetrics_core::model::GithubSnapshot;
use techmetrics_engine::commands::{
    ingest_downloads, ingest_github, read_batch, DownloadRecord, IngestReport,
};

use super::Session;

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[command(subcommand)]
    pub source: IngestSource,
}

#[derive(Debug, Subcommand)]
pub enum IngestSource {
    /// JSON array of repository snapshots
    Github { file: PathBuf },
    /// JSON array of registry download records
    Downloads { file: PathBuf },
}

pub fn execute(mut session: Session, args: IngestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let report = match args.source {
        IngestSource::Github { file } => {
            let batch: Vec<GithubSnapshot> = read_batch(&file)?;
            ingest_github(&mut session.conn, &batch)?
        }
        IngestSource::Downloads { file } => {
            let batch: Vec<DownloadRecord> = read_batch(&file)?;
            ingest_downloads(&mut session.conn, &session.config, batch)?
        }
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &IngestReport) {
    println!(
        "Ingest {} appended {} {} snapshots",
        report.run_id, report.rows_appended, report.source
    );
}
