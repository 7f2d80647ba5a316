// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Block decoder: one segmented block becomes at most one printer record.
//
// Field rules:
//   is WORD            -> status = WORD, normalized through PrinterStatus
//   N job(s)           -> informational count, never a current job
//   now printing ID    -> status = printing, current_job = ID
//   disabled since     -> status = disabled, enabled = false
//   since TS           -> verbatim, never parsed
// Detail lines apply in order, last match per field wins:
//   Description: X     -> description
//   Location: X        -> location
//   contains "error" (any case) or starts with "/"  -> error

use druckwerk_core::{PrinterRecord, PrinterStatus};

use crate::classify::Header;
use crate::segment::Block;

/// Decode one block. Returns `None` instead of a partial record when the
/// header fails re-validation (empty printer name).
pub fn decode_block(block: Block) -> Option<PrinterRecord> {
    let Block { header, details } = block;
    let mut record = match header {
        Header::Enabled {
            name,
            status_word,
            job_count: _,
            since,
        } => {
            let mut record =
                PrinterRecord::new(name, PrinterStatus::from_word(&status_word), true);
            record.since = Some(since);
            record
        }
        Header::Printing { name, job_id, since } => {
            let mut record = PrinterRecord::new(name, PrinterStatus::Printing, true);
            record.current_job = Some(job_id);
            record.since = Some(since);
            record
        }
        Header::Disabled { name, since } => {
            let mut record = PrinterRecord::new(name, PrinterStatus::Disabled, false);
            record.since = Some(since);
            record
        }
    };

    if record.name.is_empty() {
        return None;
    }

    for detail in &details {
        apply_detail(&mut record, detail);
    }

    Some(record)
}

/// Apply one detail line to the record. A line feeds at most one field.
fn apply_detail(record: &mut PrinterRecord, line: &str) {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("Description:") {
        record.description = Some(rest.trim().to_string());
    } else if let Some(rest) = line.strip_prefix("Location:") {
        record.location = Some(rest.trim().to_string());
    } else if looks_like_error(line) {
        record.error = Some(line.to_string());
    }
}

/// Error heuristic: the server never labels failure text, but it either
/// mentions an error outright or names the backend path that failed.
fn looks_like_error(line: &str) -> bool {
    line.to_ascii_lowercase().contains("error") || line.starts_with('/')
}
