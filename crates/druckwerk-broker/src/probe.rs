// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reachability probing against printer device URIs.
//
// A probe opens one short-lived TCP connection to the device address and
// reports up/down within a fixed timeout. Probes never retry; callers
// decide what a refusal means. Fleet probing fans out under a bounded
// worker count so a rack of dead printers cannot pile up sockets.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use druckwerk_core::PrinterRecord;
use druckwerk_core::error::{DruckwerkError, Result};

/// Device URI schemes a TCP probe can reach, with their default ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceScheme {
    /// Raw JetDirect socket (port 9100).
    Socket,
    /// IPP plain (port 631).
    Ipp,
    /// IPP over TLS (port 631).
    Ipps,
    /// LPD (RFC 1179, port 515).
    Lpd,
}

impl DeviceScheme {
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "socket" => Some(Self::Socket),
            "ipp" | "http" => Some(Self::Ipp),
            "ipps" | "https" => Some(Self::Ipps),
            "lpd" => Some(Self::Lpd),
            _ => None,
        }
    }

    /// Port to probe when the URI names none.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Socket => 9100,
            Self::Ipp | Self::Ipps => 631,
            Self::Lpd => 515,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Socket => "socket",
            Self::Ipp => "ipp",
            Self::Ipps => "ipps",
            Self::Lpd => "lpd",
        }
    }
}

/// Where a device URI says the hardware lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub scheme: DeviceScheme,
    pub host: String,
    pub port: u16,
}

/// Tuning for fleet probes.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Per-probe connect timeout.
    pub timeout: Duration,
    /// Upper bound on concurrent probes.
    pub concurrency: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            concurrency: 8,
        }
    }
}

/// Resolve a device URI into a probeable target.
///
/// Schemes without a TCP listener semantics (usb, dnssd, file) are
/// refused here rather than reported as unreachable hardware.
pub fn parse_device_uri(uri: &str) -> Result<ProbeTarget> {
    let parsed = Url::parse(uri).map_err(|e| DruckwerkError::DeviceUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = DeviceScheme::from_scheme(parsed.scheme()).ok_or_else(|| {
        DruckwerkError::DeviceUri {
            uri: uri.to_string(),
            reason: format!("scheme {} is not probeable", parsed.scheme()),
        }
    })?;

    let host = parsed
        .host_str()
        .ok_or_else(|| DruckwerkError::DeviceUri {
            uri: uri.to_string(),
            reason: "missing host".to_string(),
        })?
        .to_string();

    let port = parsed.port().unwrap_or_else(|| scheme.default_port());

    Ok(ProbeTarget { scheme, host, port })
}

/// Probe one device URI. `Ok(false)` covers refusal and timeout alike;
/// `Err` is reserved for URIs that cannot be probed at all.
pub async fn probe_device(uri: &str, timeout: Duration) -> Result<bool> {
    let target = parse_device_uri(uri)?;
    Ok(probe_target(&target, timeout).await)
}

/// Probe every record that carries a device URI, returning name to
/// reachability. Records without a URI are skipped; records whose URI
/// cannot be parsed report `false`.
pub async fn probe_printers(
    printers: &HashMap<String, PrinterRecord>,
    config: &ProbeConfig,
) -> HashMap<String, bool> {
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut handles = Vec::new();

    for (name, record) in printers {
        let Some(uri) = record.device_uri.clone() else {
            continue;
        };
        let name = name.clone();
        let timeout = config.timeout;
        let semaphore = Arc::clone(&semaphore);

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("probe semaphore never closed");
            let reachable = match parse_device_uri(&uri) {
                Ok(target) => probe_target(&target, timeout).await,
                Err(e) => {
                    warn!(printer = %name, %uri, error = %e, "device URI not probeable");
                    false
                }
            };
            (name, reachable)
        }));
    }

    let mut results = HashMap::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok((name, reachable)) => {
                results.insert(name, reachable);
            }
            Err(e) => warn!(error = %e, "probe task failed"),
        }
    }
    results
}

async fn probe_target(target: &ProbeTarget, timeout: Duration) -> bool {
    let address = (target.host.as_str(), target.port);
    match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
        Ok(Ok(_stream)) => {
            debug!(host = %target.host, port = target.port, "probe connected");
            true
        }
        Ok(Err(e)) => {
            debug!(host = %target.host, port = target.port, error = %e, "probe refused");
            false
        }
        Err(_) => {
            debug!(
                host = %target.host,
                port = target.port,
                timeout_ms = timeout.as_millis() as u64,
                "probe timed out"
            );
            false
        }
    }
}
