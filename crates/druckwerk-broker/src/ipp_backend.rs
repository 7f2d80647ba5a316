// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP backend: talks to the print server in its native protocol.
//
// No text parsing involved; records are built from IPP attribute groups.
// Operations used:
//   CUPS-Get-Printers        server-wide queue listing (CUPS extension)
//   Print-Job                (RFC 8011 §4.2.1)
//   Get-Jobs                 (RFC 8011 §4.2.6)
//   Cancel-Job               (RFC 8011 §4.2.8)
//   Pause-/Resume-Printer    (RFC 8011 §4.2.7-8 admin counterparts)

use std::collections::HashMap;
use std::io::Cursor;

use async_trait::async_trait;
use ipp::prelude::*;
use tracing::{debug, error, info, instrument};

use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::{
    DispatchOptions, DispatchReceipt, JobRecord, JobState, PrintPayload, PrinterRecord,
    PrinterStatus, ServerConfig,
};

use crate::backend::PrintBackend;

/// Job attributes requested from Get-Jobs. Without this the server
/// returns job-id and job-uri only.
const JOB_ATTRIBUTES: [&str; 7] = [
    "job-id",
    "job-name",
    "job-originating-user-name",
    "job-printer-uri",
    "job-state",
    "job-k-octets",
    "job-media-sheets-completed",
];

/// Print-server access over IPP.
pub struct IppBackend {
    server: ServerConfig,
}

impl IppBackend {
    pub fn new(server: ServerConfig) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// Resume a paused queue (Resume-Printer).
    pub async fn resume_printer(&self, printer: &str) -> Result<()> {
        self.printer_operation(printer, Operation::ResumePrinter, "Resume-Printer")
            .await
    }

    /// Pause a queue (Pause-Printer).
    pub async fn pause_printer(&self, printer: &str) -> Result<()> {
        self.printer_operation(printer, Operation::PausePrinter, "Pause-Printer")
            .await
    }

    // -- internal helpers ---------------------------------------------------

    fn server_uri(&self) -> Result<Uri> {
        parse_uri(self.server.server_uri())
    }

    fn printer_uri(&self, printer: &str) -> Result<Uri> {
        parse_uri(self.server.printer_uri(printer))
    }

    async fn printer_operation(&self, printer: &str, op: Operation, label: &str) -> Result<()> {
        let uri = self.printer_uri(printer)?;
        let request = IppRequestResponse::new(IppVersion::v1_1(), op, Some(uri.clone()));
        let client = AsyncIppClient::new(uri);

        info!(printer, operation = label, "sending printer operation");
        let response = client
            .send(request)
            .await
            .map_err(|e| DruckwerkError::IppRequest(format!("{label}: {e}")))?;

        check_status(&response, label)?;
        Ok(())
    }
}

#[async_trait]
impl PrintBackend for IppBackend {
    fn name(&self) -> &'static str {
        "ipp"
    }

    #[instrument(skip(self), fields(server = %self.server.server_uri()))]
    async fn list_printers(&self) -> Result<HashMap<String, PrinterRecord>> {
        let uri = self.server_uri()?;
        let request =
            IppRequestResponse::new(IppVersion::v1_1(), Operation::CupsGetPrinters, Some(uri.clone()));
        let client = AsyncIppClient::new(uri);

        debug!("sending CUPS-Get-Printers");
        let response = client
            .send(request)
            .await
            .map_err(|e| DruckwerkError::IppRequest(format!("CUPS-Get-Printers: {e}")))?;
        check_status(&response, "CUPS-Get-Printers")?;

        let mut printers = HashMap::new();
        for group in response.attributes().groups_of(DelimiterTag::PrinterAttributes) {
            if let Some(record) = decode_printer_group(group.attributes()) {
                printers.insert(record.name.clone(), record);
            }
        }
        debug!(count = printers.len(), "received printer list");
        Ok(printers)
    }

    #[instrument(skip(self, payload, options), fields(payload = %payload.describe()))]
    async fn dispatch_print(
        &self,
        printer: &str,
        payload: &PrintPayload,
        options: &DispatchOptions,
    ) -> Result<DispatchReceipt> {
        let uri = self.printer_uri(printer)?;

        let bytes = match payload {
            PrintPayload::Text(text) => text.clone().into_bytes(),
            PrintPayload::File(path) => tokio::fs::read(path).await.map_err(|e| {
                DruckwerkError::Dispatch(format!("read {}: {e}", path.display()))
            })?,
        };
        let size = bytes.len();

        let title = options
            .title
            .clone()
            .unwrap_or_else(|| default_title(payload));
        let mut builder = IppOperationBuilder::print_job(uri.clone(), IppPayload::new(Cursor::new(bytes)))
            .job_title(title.as_str());
        if let Some(user) = &options.user {
            builder = builder.user_name(user.as_str());
        }
        if options.copies > 1 {
            builder = builder.attribute(IppAttribute::new(
                IppAttribute::COPIES,
                IppValue::Integer(options.copies as i32),
            ));
        }

        let client = AsyncIppClient::new(uri);
        info!(printer, bytes = size, "sending Print-Job");
        let response = client
            .send(builder.build())
            .await
            .map_err(|e| DruckwerkError::IppRequest(format!("Print-Job: {e}")))?;
        check_status(&response, "Print-Job")?;

        let job_id = extract_job_id(response.attributes());
        let message = match job_id {
            Some(id) => format!("job {id} accepted by {printer}"),
            None => format!("job accepted by {printer}"),
        };
        info!(printer, job_id, "print job accepted");
        Ok(DispatchReceipt::new(
            job_id.map(|id| format!("{printer}-{id}")),
            message,
        ))
    }

    #[instrument(skip(self), fields(server = %self.server.server_uri()))]
    async fn list_jobs(&self, printer: Option<&str>) -> Result<Vec<JobRecord>> {
        let uri = match printer {
            Some(name) => self.printer_uri(name)?,
            None => self.server_uri()?,
        };

        let mut request =
            IppRequestResponse::new(IppVersion::v1_1(), Operation::GetJobs, Some(uri.clone()));
        request.attributes_mut().add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(
                "requested-attributes",
                IppValue::Array(
                    JOB_ATTRIBUTES
                        .iter()
                        .map(|name| IppValue::Keyword(name.to_string()))
                        .collect(),
                ),
            ),
        );

        let client = AsyncIppClient::new(uri);
        debug!("sending Get-Jobs");
        let response = client
            .send(request)
            .await
            .map_err(|e| DruckwerkError::IppRequest(format!("Get-Jobs: {e}")))?;
        check_status(&response, "Get-Jobs")?;

        let mut jobs = Vec::new();
        for group in response.attributes().groups_of(DelimiterTag::JobAttributes) {
            if let Some(job) = decode_job_group(group.attributes(), printer) {
                jobs.push(job);
            }
        }
        debug!(count = jobs.len(), "received job list");
        Ok(jobs)
    }

    #[instrument(skip(self))]
    async fn cancel_job(&self, printer: &str, job_id: i32) -> Result<()> {
        let uri = self.printer_uri(printer)?;
        let operation = IppOperationBuilder::cancel_job(uri.clone(), job_id).build();
        let client = AsyncIppClient::new(uri);

        info!(printer, job_id, "sending Cancel-Job");
        let response = client
            .send(operation)
            .await
            .map_err(|e| DruckwerkError::IppRequest(format!("Cancel-Job({job_id}): {e}")))?;
        check_status(&response, "Cancel-Job")?;

        info!(job_id, "job cancelled");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helper functions for building requests and decoding responses
// ---------------------------------------------------------------------------

fn parse_uri(uri: String) -> Result<Uri> {
    uri.parse()
        .map_err(|e| DruckwerkError::IppRequest(format!("invalid URI '{uri}': {e}")))
}

fn check_status(response: &IppRequestResponse, label: &str) -> Result<()> {
    let code = response.header().status_code();
    if code.is_success() {
        return Ok(());
    }
    error!(status = ?code, "{label} failed");
    Err(DruckwerkError::IppRequest(format!(
        "{label} returned status {code:?}"
    )))
}

/// Build one record from a Printer Attributes group.
///
/// printer-state is 3 idle, 4 processing, 5 stopped (RFC 8011 §5.4.11);
/// a stopped queue maps to disabled. The structured source reports no
/// `since` text and no current job id in this form, so those stay absent.
fn decode_printer_group(attributes: &HashMap<String, IppAttribute>) -> Option<PrinterRecord> {
    let name = attributes
        .get("printer-name")
        .map(|a| a.value().to_string())?;
    if name.is_empty() {
        return None;
    }

    let state = attributes
        .get("printer-state")
        .and_then(|a| enum_or_integer(a.value()));
    let (status, enabled) = match state {
        Some(4) => (PrinterStatus::Printing, true),
        Some(5) => (PrinterStatus::Disabled, false),
        _ => (PrinterStatus::Idle, true),
    };

    let mut record = PrinterRecord::new(name, status, enabled);
    record.description = non_empty(attributes.get("printer-info"));
    record.location = non_empty(attributes.get("printer-location"));
    record.error = non_empty(attributes.get("printer-state-message"));
    record.device_uri = non_empty(attributes.get("device-uri"));
    Some(record)
}

/// Build one record from a Job Attributes group. Jobs without a job-id
/// are dropped.
fn decode_job_group(
    attributes: &HashMap<String, IppAttribute>,
    fallback_printer: Option<&str>,
) -> Option<JobRecord> {
    let id = attributes
        .get("job-id")
        .and_then(|a| a.value().as_integer().copied())?;

    let printer = attributes
        .get("job-printer-uri")
        .and_then(|a| queue_from_uri(&a.value().to_string()))
        .or_else(|| fallback_printer.map(str::to_string))
        .unwrap_or_default();

    let state = attributes
        .get("job-state")
        .and_then(|a| enum_or_integer(a.value()))
        .map(JobState::from_ipp_code)
        .unwrap_or(JobState::Unknown);

    let size_bytes = attributes
        .get("job-k-octets")
        .and_then(|a| a.value().as_integer().copied())
        .map(|k| k.max(0) as u64 * 1024);

    let pages = attributes
        .get("job-media-sheets-completed")
        .and_then(|a| a.value().as_integer().copied())
        .and_then(|n| u32::try_from(n).ok());

    Some(JobRecord {
        id,
        printer,
        user: non_empty(attributes.get("job-originating-user-name")),
        name: non_empty(attributes.get("job-name")),
        state,
        size_bytes,
        pages,
        submitted: None,
    })
}

/// Last path segment of a job-printer-uri, i.e. the queue name.
fn queue_from_uri(uri: &str) -> Option<String> {
    let segment = uri.trim_end_matches('/').rsplit('/').next()?;
    if segment.is_empty() || segment.contains(':') {
        return None;
    }
    Some(segment.to_string())
}

fn enum_or_integer(value: &IppValue) -> Option<i32> {
    value
        .as_enum()
        .copied()
        .or_else(|| value.as_integer().copied())
}

fn non_empty(attribute: Option<&IppAttribute>) -> Option<String> {
    let text = attribute.map(|a| a.value().to_string())?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn default_title(payload: &PrintPayload) -> String {
    match payload {
        PrintPayload::Text(_) => "druckwerk text job".to_string(),
        PrintPayload::File(path) => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "druckwerk file job".to_string()),
    }
}

/// Extract the job-id from a Print-Job response's Job Attributes group.
fn extract_job_id(attrs: &IppAttributes) -> Option<i32> {
    for group in attrs.groups_of(DelimiterTag::JobAttributes) {
        if let Some(attr) = group.attributes().get("job-id")
            && let IppValue::Integer(id) = attr.value()
        {
            return Some(*id);
        }
    }
    None
}
