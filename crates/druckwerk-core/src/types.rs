// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Druckwerk print broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Printer status as derived from a status header.
///
/// CUPS reports an open-ended status vocabulary; the three words every
/// server emits get canonical variants and everything else is carried
/// through verbatim in `Reported`. Serializes as the plain word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum PrinterStatus {
    Idle,
    Printing,
    Disabled,
    /// Any other status word the server reported, unaltered.
    Reported(String),
}

impl PrinterStatus {
    /// Normalize a server-reported status word.
    pub fn from_word(word: &str) -> Self {
        match word.to_ascii_lowercase().as_str() {
            "idle" => Self::Idle,
            "printing" => Self::Printing,
            "disabled" => Self::Disabled,
            _ => Self::Reported(word.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Printing => "printing",
            Self::Disabled => "disabled",
            Self::Reported(word) => word,
        }
    }
}

impl From<PrinterStatus> for String {
    fn from(status: PrinterStatus) -> Self {
        status.as_str().to_string()
    }
}

impl From<String> for PrinterStatus {
    fn from(word: String) -> Self {
        Self::from_word(&word)
    }
}

impl std::fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One printer queue as known to the server.
///
/// Built either from parsed `lpstat` text or from IPP attributes; fields
/// the source does not report stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterRecord {
    /// Queue name, unique within one listing.
    pub name: String,
    pub status: PrinterStatus,
    /// Whether the queue accepts work. Derived from the header shape,
    /// not from the status word.
    pub enabled: bool,
    /// Job identifier currently on the press, for `now printing` headers.
    pub current_job: Option<String>,
    /// Verbatim timestamp text from the header. Never parsed.
    pub since: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Most recent error text attributed to this queue.
    pub error: Option<String>,
    /// Backend device URI, when the server disclosed one.
    pub device_uri: Option<String>,
}

impl PrinterRecord {
    pub fn new(name: impl Into<String>, status: PrinterStatus, enabled: bool) -> Self {
        Self {
            name: name.into(),
            status,
            enabled,
            current_job: None,
            since: None,
            description: None,
            location: None,
            error: None,
            device_uri: None,
        }
    }
}

/// Lifecycle states of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Held,
    Processing,
    Stopped,
    Canceled,
    Aborted,
    Completed,
    /// State code outside the RFC 8011 range.
    Unknown,
}

impl JobState {
    /// Map an IPP `job-state` enum value (RFC 8011 §5.3.7).
    pub fn from_ipp_code(code: i32) -> Self {
        match code {
            3 => Self::Pending,
            4 => Self::Held,
            5 => Self::Processing,
            6 => Self::Stopped,
            7 => Self::Canceled,
            8 => Self::Aborted,
            9 => Self::Completed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Held => "held",
            Self::Processing => "processing",
            Self::Stopped => "stopped",
            Self::Canceled => "canceled",
            Self::Aborted => "aborted",
            Self::Completed => "completed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job on a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Numeric CUPS job id (the N in `queue-N`).
    pub id: i32,
    /// Queue the job is bound to.
    pub printer: String,
    pub user: Option<String>,
    /// Document title, when the source reports one.
    pub name: Option<String>,
    pub state: JobState,
    pub size_bytes: Option<u64>,
    /// Sheets put out so far, when the source reports progress.
    pub pages: Option<u32>,
    /// Verbatim submission timestamp text. Never parsed.
    pub submitted: Option<String>,
}

/// What to put on paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintPayload {
    /// Literal text, handed to the dispatcher on stdin.
    Text(String),
    /// Path to an existing file on disk.
    File(PathBuf),
}

impl PrintPayload {
    /// Short label for logs and receipts.
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => format!("text ({} bytes)", text.len()),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Per-dispatch options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOptions {
    pub copies: u32,
    /// Requesting user recorded against the job.
    pub user: Option<String>,
    /// Job title shown in the queue.
    pub title: Option<String>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            copies: 1,
            user: None,
            title: None,
        }
    }
}

/// Acknowledgement for a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    /// CUPS job identifier, e.g. `maria-42`, when the backend reported one.
    pub job_id: Option<String>,
    /// Raw acknowledgement text from the backend.
    pub message: String,
    pub submitted_at: DateTime<Utc>,
}

impl DispatchReceipt {
    pub fn new(job_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            job_id,
            message: message.into(),
            submitted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_words_normalize() {
        assert_eq!(PrinterStatus::from_word("idle"), PrinterStatus::Idle);
        assert_eq!(PrinterStatus::from_word("Idle"), PrinterStatus::Idle);
        assert_eq!(PrinterStatus::from_word("printing"), PrinterStatus::Printing);
        assert_eq!(PrinterStatus::from_word("disabled"), PrinterStatus::Disabled);
        assert_eq!(
            PrinterStatus::from_word("busy"),
            PrinterStatus::Reported("busy".to_string())
        );
    }

    #[test]
    fn status_serializes_as_plain_word() {
        let json = serde_json::to_string(&PrinterStatus::Printing).unwrap();
        assert_eq!(json, "\"printing\"");
        let back: PrinterStatus = serde_json::from_str("\"busy\"").unwrap();
        assert_eq!(back, PrinterStatus::Reported("busy".to_string()));
    }

    #[test]
    fn job_state_codes_map_per_rfc() {
        assert_eq!(JobState::from_ipp_code(3), JobState::Pending);
        assert_eq!(JobState::from_ipp_code(5), JobState::Processing);
        assert_eq!(JobState::from_ipp_code(9), JobState::Completed);
        assert_eq!(JobState::from_ipp_code(0), JobState::Unknown);
        assert_eq!(JobState::from_ipp_code(42), JobState::Unknown);
    }

    #[test]
    fn record_constructor_leaves_optionals_empty() {
        let record = PrinterRecord::new("maria", PrinterStatus::Idle, true);
        assert_eq!(record.name, "maria");
        assert!(record.enabled);
        assert!(record.current_job.is_none());
        assert!(record.device_uri.is_none());
    }
}
