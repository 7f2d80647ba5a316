// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status parser orchestrator: raw lpstat text in, printer map out.
//
// The pipeline is classify -> segment -> decode -> correlate, one pass,
// no lookahead. Malformed input never fails the parse; unrecognized
// lines contribute nothing and an input without a single header line
// yields an empty map, which is a valid outcome.

use std::collections::HashMap;

use tracing::{debug, trace};

use druckwerk_core::PrinterRecord;

use crate::classify::LineClassifier;
use crate::decode::decode_block;
use crate::segment::Segmenter;

/// Reusable parser holding the compiled line patterns.
///
/// Stateless across calls: each `parse` invocation works on its own
/// accumulator, so one instance may serve any number of threads.
#[derive(Debug, Default)]
pub struct StatusParser {
    classifier: LineClassifier,
}

impl StatusParser {
    pub fn new() -> Self {
        Self {
            classifier: LineClassifier::new(),
        }
    }

    /// Parse one status listing into a map keyed by printer name.
    ///
    /// When the same name heads more than one block, the later block
    /// wins the slot.
    pub fn parse(&self, text: &str) -> HashMap<String, PrinterRecord> {
        let mut segmenter = Segmenter::new();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            segmenter.push(self.classifier.classify(line), line);
        }
        let (blocks, devices) = segmenter.finish();

        let mut printers = HashMap::with_capacity(blocks.len());
        for block in blocks {
            let Some(mut record) = decode_block(block) else {
                continue;
            };
            if let Some(uri) = devices.get(&record.name) {
                record.device_uri = Some(uri.clone());
            }
            trace!(printer = %record.name, status = %record.status, "decoded printer block");
            printers.insert(record.name.clone(), record);
        }

        debug!(
            printers = printers.len(),
            devices = devices.len(),
            "parsed status listing"
        );
        printers
    }
}

/// One-shot convenience over [`StatusParser`].
pub fn parse_status(text: &str) -> HashMap<String, PrinterRecord> {
    StatusParser::new().parse(text)
}
