// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Druckwerk Broker — print-server access and device probing.
//
// Two interchangeable backends implement [`PrintBackend`]: `LpstatBackend`
// shells out to the CUPS command-line tools and parses their output with
// druckwerk-status, `IppBackend` speaks IPP to the server directly. The
// probe module checks device reachability over TCP independently of
// either backend.

pub mod backend;
pub mod cli_backend;
pub mod command;
pub mod ipp_backend;
pub mod probe;

pub use backend::PrintBackend;
pub use cli_backend::LpstatBackend;
pub use command::{decode_console_bytes, CommandOutput, CommandRunner, ProcessRunner};
pub use ipp_backend::IppBackend;
pub use probe::{probe_device, probe_printers, DeviceScheme, ProbeConfig, ProbeTarget};
