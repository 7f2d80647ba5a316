// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Druckwerk — resilient CUPS status parsing and print brokering
//
// Entry point. Initialises logging, builds the selected backend, and runs
// one subcommand against the print server.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use druckwerk_broker::{
    probe_device, probe_printers, IppBackend, LpstatBackend, PrintBackend, ProbeConfig,
};
use druckwerk_core::{
    DispatchOptions, JobRecord, PrintPayload, PrinterRecord, ServerConfig,
};

#[derive(Parser)]
#[command(name = "druckwerk")]
#[command(about = "Query and drive a CUPS print server over lpstat or IPP", long_about = None)]
struct Cli {
    /// Print server host
    #[arg(short = 'H', long, default_value = "localhost", global = true)]
    host: String,

    /// Print server port
    #[arg(short, long, default_value = "631", global = true)]
    port: u16,

    /// Pin the IPP version the command-line tools negotiate (e.g. 1.1)
    #[arg(long, global = true)]
    ipp_version: Option<String>,

    /// Backend: cli (lpstat/lp) or ipp
    #[arg(short, long, default_value = "cli", global = true)]
    backend: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List printers known to the server
    Printers {
        /// Emit JSON instead of plain text
        #[arg(long)]
        json: bool,

        /// Probe each printer's device for TCP reachability
        #[arg(long)]
        probe: bool,
    },

    /// List queued jobs, for one printer or all of them
    Jobs {
        /// Queue name; all queues when omitted
        printer: Option<String>,

        /// Emit JSON instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Submit a payload for printing
    Print {
        /// Destination queue
        printer: String,

        /// File to print
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Literal text to print
        #[arg(long)]
        text: Option<String>,

        /// Number of copies
        #[arg(short = 'n', long, default_value = "1")]
        copies: u32,

        /// Submit on behalf of this user
        #[arg(short = 'U', long)]
        user: Option<String>,

        /// Job title shown in the queue
        #[arg(short = 't', long)]
        title: Option<String>,
    },

    /// Cancel a queued job
    Cancel {
        /// Queue holding the job
        printer: String,

        /// Numeric job id
        job_id: i32,
    },

    /// Check TCP reachability of a printer's device
    Probe {
        /// Queue whose device URI should be probed
        printer: Option<String>,

        /// Probe this device URI directly
        #[arg(long, conflicts_with = "printer")]
        uri: Option<String>,
    },
}

/// Printer record plus optional probe result, for output.
#[derive(serde::Serialize)]
struct PrinterView {
    #[serde(flatten)]
    record: PrinterRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    reachable: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logs go to stderr so stdout stays pipeable (--json)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut server = ServerConfig::new(cli.host.clone(), cli.port);
    server.ipp_version = cli.ipp_version.clone();
    let backend = make_backend(&cli.backend, server)?;
    debug!(backend = backend.name(), host = %cli.host, "backend selected");

    match cli.command {
        Commands::Printers { json, probe } => cmd_printers(backend.as_ref(), json, probe).await,
        Commands::Jobs { printer, json } => {
            cmd_jobs(backend.as_ref(), printer.as_deref(), json).await
        }
        Commands::Print {
            printer,
            file,
            text,
            copies,
            user,
            title,
        } => {
            let payload = match (file, text) {
                (Some(path), None) => PrintPayload::File(path),
                (None, Some(text)) => PrintPayload::Text(text),
                _ => bail!("exactly one of --file or --text is required"),
            };
            let options = DispatchOptions {
                copies,
                user,
                title,
            };
            cmd_print(backend.as_ref(), &printer, &payload, &options).await
        }
        Commands::Cancel { printer, job_id } => {
            cmd_cancel(backend.as_ref(), &printer, job_id).await
        }
        Commands::Probe { printer, uri } => {
            cmd_probe(backend.as_ref(), printer.as_deref(), uri.as_deref()).await
        }
    }
}

fn make_backend(kind: &str, server: ServerConfig) -> Result<Box<dyn PrintBackend>> {
    match kind {
        "cli" => Ok(Box::new(LpstatBackend::new(server))),
        "ipp" => Ok(Box::new(IppBackend::new(server))),
        other => bail!("unknown backend '{other}', expected cli or ipp"),
    }
}

async fn cmd_printers(backend: &dyn PrintBackend, json: bool, probe: bool) -> Result<()> {
    let printers = backend.list_printers().await?;
    let reachability = if probe {
        probe_printers(&printers, &ProbeConfig::default()).await
    } else {
        HashMap::new()
    };

    // BTreeMap keeps output ordering stable across runs.
    let mut views = BTreeMap::new();
    for (name, record) in printers {
        let reachable = reachability.get(&name).copied();
        views.insert(name, PrinterView { record, reachable });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }
    if views.is_empty() {
        println!("no printers found");
        return Ok(());
    }
    for view in views.values() {
        print_printer(view);
    }
    Ok(())
}

fn print_printer(view: &PrinterView) {
    let record = &view.record;
    let enabled = if record.enabled { "enabled" } else { "disabled" };
    println!("{}: {}, {}", record.name, record.status, enabled);
    if let Some(job) = &record.current_job {
        println!("  printing job {job}");
    }
    if let Some(since) = &record.since {
        println!("  since {since}");
    }
    if let Some(description) = &record.description {
        println!("  description: {description}");
    }
    if let Some(location) = &record.location {
        println!("  location: {location}");
    }
    if let Some(uri) = &record.device_uri {
        println!("  device: {uri}");
    }
    if let Some(error) = &record.error {
        println!("  error: {error}");
    }
    if let Some(reachable) = view.reachable {
        println!("  reachable: {}", if reachable { "yes" } else { "no" });
    }
}

async fn cmd_jobs(backend: &dyn PrintBackend, printer: Option<&str>, json: bool) -> Result<()> {
    let mut jobs = backend.list_jobs(printer).await?;
    jobs.sort_by(|a, b| a.printer.cmp(&b.printer).then(a.id.cmp(&b.id)));

    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }
    if jobs.is_empty() {
        println!("no jobs queued");
        return Ok(());
    }
    for job in &jobs {
        print_job(job);
    }
    Ok(())
}

fn print_job(job: &JobRecord) {
    let user = job.user.as_deref().unwrap_or("-");
    let size = job
        .size_bytes
        .map(|b| format!("{b} bytes"))
        .unwrap_or_else(|| "-".to_string());
    let title = job.name.as_deref().unwrap_or("-");
    println!(
        "{}-{}  {}  {}  {}  {}",
        job.printer, job.id, job.state, user, size, title
    );
    if let Some(submitted) = &job.submitted {
        println!("  submitted {submitted}");
    }
}

async fn cmd_print(
    backend: &dyn PrintBackend,
    printer: &str,
    payload: &PrintPayload,
    options: &DispatchOptions,
) -> Result<()> {
    let receipt = backend.dispatch_print(printer, payload, options).await?;
    println!("{}", receipt.message);
    if let Some(id) = &receipt.job_id {
        println!("job id: {id}");
    }
    Ok(())
}

async fn cmd_cancel(backend: &dyn PrintBackend, printer: &str, job_id: i32) -> Result<()> {
    backend.cancel_job(printer, job_id).await?;
    println!("cancelled {printer}-{job_id}");
    Ok(())
}

async fn cmd_probe(
    backend: &dyn PrintBackend,
    printer: Option<&str>,
    uri: Option<&str>,
) -> Result<()> {
    let (label, uri) = match (printer, uri) {
        (Some(name), None) => {
            let record = backend
                .get_printer(name)
                .await?
                .with_context(|| format!("no such printer '{name}'"))?;
            let uri = record
                .device_uri
                .with_context(|| format!("printer '{name}' reports no device URI"))?;
            (name.to_string(), uri)
        }
        (None, Some(uri)) => (uri.to_string(), uri.to_string()),
        _ => bail!("exactly one of PRINTER or --uri is required"),
    };

    let reachable = probe_device(&uri, ProbeConfig::default().timeout).await?;
    println!(
        "{label}: {} ({uri})",
        if reachable { "reachable" } else { "unreachable" }
    );
    if !reachable {
        std::process::exit(1);
    }
    Ok(())
}
