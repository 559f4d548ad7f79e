//! Refresh command

use techmetrics_engine::commands::run_refresh;
use techmetrics_store::NoopPublishHook;

use super::Session;

pub fn execute(mut session: Session) -> Result<(), Box<dyn std::error::Error>> {
    let summary = run_refresh(&mut session.conn, &NoopPublishHook)?;

    println!(
        "Refresh {} published {} rows ({} with registry stats, {} registry-only dropped)",
        summary.run_id,
        summary.rows_published,
        summary.matched,
        summary.dropped.len()
    );
    Ok(())
}
