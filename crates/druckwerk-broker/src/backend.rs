// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The capability seam both backends implement.
//
// Callers hold a `dyn PrintBackend` and stay agnostic to whether a
// record came from parsed lpstat text or from IPP attributes.

use std::collections::HashMap;

use async_trait::async_trait;

use druckwerk_core::error::Result;
use druckwerk_core::{DispatchOptions, DispatchReceipt, JobRecord, PrintPayload, PrinterRecord};

/// Unified print-server capability interface.
#[async_trait]
pub trait PrintBackend: Send + Sync {
    /// Short identifier for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Every queue the server knows, keyed by name.
    async fn list_printers(&self) -> Result<HashMap<String, PrinterRecord>>;

    /// One queue by exact name.
    async fn get_printer(&self, name: &str) -> Result<Option<PrinterRecord>> {
        let mut printers = self.list_printers().await?;
        Ok(printers.remove(name))
    }

    /// Submit a payload for printing.
    async fn dispatch_print(
        &self,
        printer: &str,
        payload: &PrintPayload,
        options: &DispatchOptions,
    ) -> Result<DispatchReceipt>;

    /// Outstanding jobs, optionally narrowed to one queue.
    async fn list_jobs(&self, printer: Option<&str>) -> Result<Vec<JobRecord>>;

    /// Cancel one job on a queue.
    async fn cancel_job(&self, printer: &str, job_id: i32) -> Result<()>;
}
