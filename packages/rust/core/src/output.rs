//! CSV persistence for generated descriptions.

use std::fs::File;
use std::path::Path;

use copydesk_shared::{CopydeskError, OUTPUT_HEADERS, OutputRow, Result};

/// Write the header plus `rows` to `path`, replacing any existing file.
///
/// The file is truncated up front, so a crash mid-write leaves a partial
/// file behind.
pub fn write_results(path: &Path, rows: &[OutputRow]) -> Result<()> {
    let file = File::create(path).map_err(|e| CopydeskError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(file);

    writer
        .write_record(OUTPUT_HEADERS)
        .map_err(|e| CopydeskError::io(path, e.into()))?;
    for row in rows {
        writer
            .write_record(row.as_record())
            .map_err(|e| CopydeskError::io(path, e.into()))?;
    }
    writer.flush().map_err(|e| CopydeskError::io(path, e))?;

    Ok(())
}
