// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line classifier for lpstat status text.
//
// lpstat output is line oriented with a handful of known shapes; every
// shape the server version or locale can mangle is funnelled into the
// Detail catch-all rather than rejected. Shapes, in match priority:
//
//   device for NAME: URI
//   [printer ]NAME is WORD[ N job(s)]. enabled since TS
//   [printer ]NAME now printing ID. enabled since TS
//   [printer ]NAME disabled since TS -
//   anything else (detail, owned by the block decoder)

use regex::Regex;

/// A status header line. Opens a printer block in the segmenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    /// `[printer ]NAME is WORD[ N job(s)]. enabled since TS`.
    /// The job count is informational; it never names a current job.
    Enabled {
        name: String,
        status_word: String,
        job_count: Option<u32>,
        since: String,
    },
    /// `[printer ]NAME now printing ID. enabled since TS`.
    Printing {
        name: String,
        job_id: String,
        since: String,
    },
    /// `[printer ]NAME disabled since TS -`. The trailing dash is part
    /// of the shape, not of the timestamp.
    Disabled { name: String, since: String },
}

impl Header {
    pub fn name(&self) -> &str {
        match self {
            Self::Enabled { name, .. } => name,
            Self::Printing { name, .. } => name,
            Self::Disabled { name, .. } => name,
        }
    }
}

/// What one trimmed, non-empty line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// `device for NAME: URI` association, side channel to the device map.
    Device { name: String, uri: String },
    Header(Header),
    /// Unrecognized text. Belongs to whichever block is open.
    Detail,
}

/// Holds the compiled shape patterns. Build once, classify many.
#[derive(Debug)]
pub struct LineClassifier {
    device: Regex,
    enabled: Regex,
    printing: Regex,
    disabled: Regex,
}

impl LineClassifier {
    pub fn new() -> Self {
        Self {
            device: Regex::new(r"^device for (\S+)\s*:\s*(.+)$").expect("pattern is valid"),
            enabled: Regex::new(r"^(?:printer )?(\S+) is (\w+)(?: (\d+) jobs?)?\.\s+enabled since (.+)$")
                .expect("pattern is valid"),
            printing: Regex::new(r"^(?:printer )?(\S+) now printing (\S+?)\.\s+enabled since (.+)$")
                .expect("pattern is valid"),
            disabled: Regex::new(r"^(?:printer )?(\S+) disabled since (.+) -$")
                .expect("pattern is valid"),
        }
    }

    /// Classify one line. `line` must already be trimmed and non-empty;
    /// shapes are tried in fixed priority order and the first match wins.
    pub fn classify(&self, line: &str) -> LineClass {
        if let Some(caps) = self.device.captures(line) {
            return LineClass::Device {
                name: caps[1].to_string(),
                uri: caps[2].trim().to_string(),
            };
        }
        if let Some(caps) = self.enabled.captures(line) {
            return LineClass::Header(Header::Enabled {
                name: caps[1].to_string(),
                status_word: caps[2].to_string(),
                job_count: caps.get(3).and_then(|m| m.as_str().parse().ok()),
                since: caps[4].trim().to_string(),
            });
        }
        if let Some(caps) = self.printing.captures(line) {
            return LineClass::Header(Header::Printing {
                name: caps[1].to_string(),
                job_id: caps[2].to_string(),
                since: caps[3].trim().to_string(),
            });
        }
        if let Some(caps) = self.disabled.captures(line) {
            return LineClass::Header(Header::Disabled {
                name: caps[1].to_string(),
                since: caps[2].trim().to_string(),
            });
        }
        LineClass::Detail
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}
