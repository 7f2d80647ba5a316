// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Queue text parser for `lpstat -o` listings.
//
// One job per line: `QUEUE-ID  USER  SIZE  SUBMITTED...`. The request id
// glues queue name and job number with a dash and queue names may contain
// dashes themselves, so the job number is the final numeric segment.
// Lines that do not fit the shape are skipped, same tolerance policy as
// the printer parser.

use regex::Regex;
use tracing::trace;

use druckwerk_core::{JobRecord, JobState};

/// Holds the compiled queue entry pattern. Build once, parse many.
#[derive(Debug)]
pub struct QueueParser {
    entry: Regex,
}

impl QueueParser {
    pub fn new() -> Self {
        Self {
            entry: Regex::new(
                r"^(?P<printer>\S+)-(?P<id>\d+)\s+(?P<user>\S+)\s+(?P<size>\d+)\s*(?P<when>.*)$",
            )
            .expect("pattern is valid"),
        }
    }

    /// Parse one queue listing. The queue tool lists outstanding work
    /// only, so every decoded record is pending.
    pub fn parse(&self, text: &str) -> Vec<JobRecord> {
        text.lines()
            .filter_map(|raw| self.decode_line(raw.trim()))
            .collect()
    }

    fn decode_line(&self, line: &str) -> Option<JobRecord> {
        if line.is_empty() {
            return None;
        }
        let Some(caps) = self.entry.captures(line) else {
            trace!(line, "skipping unrecognized queue line");
            return None;
        };
        let id = caps["id"].parse().ok()?;
        let when = caps["when"].trim();
        Some(JobRecord {
            id,
            printer: caps["printer"].to_string(),
            user: Some(caps["user"].to_string()),
            name: None,
            state: JobState::Pending,
            size_bytes: caps["size"].parse().ok(),
            pages: None,
            submitted: (!when.is_empty()).then(|| when.to_string()),
        })
    }
}

impl Default for QueueParser {
    fn default() -> Self {
        Self::new()
    }
}
