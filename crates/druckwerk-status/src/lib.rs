// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Druckwerk — parser for CUPS lpstat status and queue text.
//
// The status text has no formal grammar: shapes drift across server
// versions and locales, and encodings are mixed upstream. The pipeline
// here (classify lines, segment into per-printer blocks, decode fields,
// correlate device URIs) degrades gracefully instead of failing: lines
// it does not recognize contribute nothing.

pub mod classify;
pub mod decode;
pub mod jobs;
pub mod parse;
pub mod segment;

pub use classify::{Header, LineClass, LineClassifier};
pub use jobs::QueueParser;
pub use parse::{StatusParser, parse_status};
pub use segment::{Block, Segmenter};
