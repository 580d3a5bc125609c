//! CSV log of every upload attempt.
//!
//! Columns: `Index,FileName,Extension,Size,ResponseTime,Status,Message`.
//! Fields are quoted only when they need it, so names and messages containing
//! commas or quotes survive a round trip.

use csv::{Terminator, WriterBuilder};

use crate::harness::HarnessResult;
use crate::runner::RunResults;

pub const CSV_HEADERS: [&str; 7] = [
    "Index",
    "FileName",
    "Extension",
    "Size",
    "ResponseTime",
    "Status",
    "Message",
];

/// Render all records, successes first, as CSV text
pub fn render_csv(results: &RunResults) -> HarnessResult<String> {
    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(CSV_HEADERS)?;

    for (index, record) in results.iter().enumerate() {
        let position = (index + 1).to_string();
        let status = record.status_label();
        wtr.write_record([
            position.as_str(),
            record.image_name.as_str(),
            record.extension.as_str(),
            record.size.as_str(),
            record.response_time.as_str(),
            status.as_str(),
            record.message_label(),
        ])?;
    }

    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
