//! Show command: dump the published table

use std::io::Write;

use techmetrics_store::load_published;

use super::Session;

pub fn execute(session: Session) -> Result<(), Box<dyn std::error::Error>> {
    let records = load_published(&session.conn)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for record in &records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
