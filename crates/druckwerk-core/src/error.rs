// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Druckwerk.

use thiserror::Error;

/// Top-level error type for all Druckwerk operations.
#[derive(Debug, Error)]
pub enum DruckwerkError {
    // -- Status query --
    #[error("status command failed: {0}")]
    Command(String),

    // -- Dispatch --
    #[error("print dispatch failed: {0}")]
    Dispatch(String),

    // -- IPP backend --
    #[error("IPP request failed: {0}")]
    IppRequest(String),

    // -- Reachability --
    #[error("unusable device URI {uri}: {reason}")]
    DeviceUri { uri: String, reason: String },

    // -- I/O and serialization --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DruckwerkError>;
