// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print server endpoint configuration.

use serde::{Deserialize, Serialize};

/// Which CUPS server to talk to, shared by both backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server hostname, no scheme.
    pub host: String,
    /// IPP port (default 631).
    pub port: u16,
    /// Optional IPP dialect pin, e.g. `1.1`. Some legacy servers refuse
    /// requests in newer dialects; the CUPS tools accept the pin as a
    /// `/version=X` suffix on the host argument.
    pub ipp_version: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 631,
            ipp_version: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ipp_version: None,
        }
    }

    /// Host argument for the CUPS command-line tools (`-h`),
    /// e.g. `hopper.example.org:631/version=1.1`.
    pub fn host_spec(&self) -> String {
        match &self.ipp_version {
            Some(version) => format!("{}:{}/version={version}", self.host, self.port),
            None => format!("{}:{}", self.host, self.port),
        }
    }

    /// Base IPP URI of the server.
    pub fn server_uri(&self) -> String {
        format!("ipp://{}:{}", self.host, self.port)
    }

    /// IPP URI of one named queue on the server.
    pub fn printer_uri(&self, printer: &str) -> String {
        format!("ipp://{}:{}/printers/{printer}", self.host, self.port)
    }
}
