use std::io::Write;

use crate::collectors::runner::Report;

/// Write the report to `out` as pretty-printed JSON.
pub fn print(report: &Report, mut out: impl Write) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out)?;
    Ok(())
}
