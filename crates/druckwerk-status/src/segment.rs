// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Block segmenter: groups classified lines into per-printer blocks.
//
// Header lines are the only block boundaries. Device lines feed the
// name-to-URI side channel without touching block state, so interleaved
// `lpstat -v` output and a separate device listing segment identically.

use std::collections::HashMap;

use crate::classify::{Header, LineClass};

/// One printer's slice of the status text: its header plus every detail
/// line up to the next header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub details: Vec<String>,
}

/// Single-pass accumulator over classified lines.
#[derive(Debug, Default)]
pub struct Segmenter {
    blocks: Vec<Block>,
    devices: HashMap<String, String>,
    open: Option<Block>,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one classified line. `line` is the trimmed raw text, kept
    /// for the Detail case.
    pub fn push(&mut self, class: LineClass, line: &str) {
        match class {
            LineClass::Device { name, uri } => {
                self.devices.insert(name, uri);
            }
            LineClass::Header(header) => {
                self.close_open();
                self.open = Some(Block {
                    header,
                    details: Vec::new(),
                });
            }
            LineClass::Detail => {
                // A detail with no open block belongs to nothing; drop it.
                if let Some(block) = self.open.as_mut() {
                    block.details.push(line.to_string());
                }
            }
        }
    }

    /// End of input. Closes the trailing block and hands back every block
    /// plus the device map.
    pub fn finish(mut self) -> (Vec<Block>, HashMap<String, String>) {
        self.close_open();
        (self.blocks, self.devices)
    }

    fn close_open(&mut self) {
        if let Some(block) = self.open.take() {
            self.blocks.push(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::LineClassifier;

    fn segment(text: &str) -> (Vec<Block>, HashMap<String, String>) {
        let classifier = LineClassifier::new();
        let mut segmenter = Segmenter::new();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            segmenter.push(classifier.classify(line), line);
        }
        segmenter.finish()
    }

    #[test]
    fn header_closes_previous_block() {
        let (blocks, _) = segment(
            "printer maria is idle. enabled since Mon 01 Jan 2024\n\
             \tDescription: Front office\n\
             printer lab1 disabled since Wed 03 Jan 2024 -\n\
             \treason unknown\n",
        );
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].header.name(), "maria");
        assert_eq!(blocks[0].details, vec!["Description: Front office"]);
        assert_eq!(blocks[1].header.name(), "lab1");
        assert_eq!(blocks[1].details, vec!["reason unknown"]);
    }

    #[test]
    fn eof_closes_open_block() {
        let (blocks, _) = segment("printer maria is idle. enabled since Mon 01 Jan 2024");
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].details.is_empty());
    }

    #[test]
    fn details_before_any_header_are_dropped() {
        let (blocks, _) = segment(
            "scheduler is running\n\
             system default destination: maria\n\
             printer maria is idle. enabled since Mon 01 Jan 2024\n",
        );
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].details.is_empty());
    }

    #[test]
    fn device_lines_never_open_or_close_blocks() {
        let (blocks, devices) = segment(
            "printer maria is idle. enabled since Mon 01 Jan 2024\n\
             \tDescription: Front office\n\
             device for maria: socket://10.0.0.42:9100\n\
             \tLocation: Reception\n",
        );
        // the device line sits mid-block; both details land in maria's block
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0].details,
            vec!["Description: Front office", "Location: Reception"]
        );
        assert_eq!(devices.get("maria").map(String::as_str), Some("socket://10.0.0.42:9100"));
    }

    #[test]
    fn device_only_input_yields_no_blocks() {
        let (blocks, devices) = segment(
            "device for maria: socket://10.0.0.42:9100\n\
             device for lab1: lpd://10.0.0.43/queue\n",
        );
        assert!(blocks.is_empty());
        assert_eq!(devices.len(), 2);
    }

    #[test]
    fn later_device_line_wins_the_map_slot() {
        let (_, devices) = segment(
            "device for maria: socket://10.0.0.42:9100\n\
             device for maria: ipp://10.0.0.99/printers/maria\n",
        );
        assert_eq!(
            devices.get("maria").map(String::as_str),
            Some("ipp://10.0.0.99/printers/maria")
        );
    }
}
