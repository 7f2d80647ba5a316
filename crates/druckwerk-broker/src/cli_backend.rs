// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CLI backend: drives the CUPS command-line tools and parses their text.
//
// Tools used per operation:
//   lpstat -h HOST -l -p -v   printer listing with details and devices
//   lpstat -h HOST -o [DEST]  outstanding jobs
//   lp -h HOST -d DEST ...    dispatch (file argument or stdin pipe)
//   cancel -h HOST DEST-ID    cancel one job
//   cupsenable / cupsdisable  queue administration
// HOST is host:port with an optional /version=X pin for legacy servers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::{
    DispatchOptions, DispatchReceipt, JobRecord, PrintPayload, PrinterRecord, ServerConfig,
};
use druckwerk_status::{QueueParser, StatusParser};

use crate::backend::PrintBackend;
use crate::command::{CommandRunner, ProcessRunner};

/// Print-server access through the CUPS command-line tools.
pub struct LpstatBackend {
    server: ServerConfig,
    runner: Arc<dyn CommandRunner>,
    status_parser: StatusParser,
    queue_parser: QueueParser,
}

impl LpstatBackend {
    pub fn new(server: ServerConfig) -> Self {
        Self::with_runner(server, Arc::new(ProcessRunner::new()))
    }

    /// Construct with a custom runner. Tests script the runner to replay
    /// captured tool output.
    pub fn with_runner(server: ServerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            server,
            runner,
            status_parser: StatusParser::new(),
            queue_parser: QueueParser::new(),
        }
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// Re-enable a paused queue via `cupsenable`.
    pub async fn enable_printer(&self, printer: &str) -> Result<()> {
        self.admin_tool("cupsenable", printer).await
    }

    /// Pause a queue via `cupsdisable`.
    pub async fn disable_printer(&self, printer: &str) -> Result<()> {
        self.admin_tool("cupsdisable", printer).await
    }

    // -- internal helpers ---------------------------------------------------

    fn host_args(&self) -> Vec<String> {
        vec!["-h".to_string(), self.server.host_spec()]
    }

    async fn admin_tool(&self, tool: &str, printer: &str) -> Result<()> {
        let mut args = self.host_args();
        args.push(printer.to_string());
        let output = self.runner.run(tool, &args).await?;
        if !output.status_ok {
            return Err(DruckwerkError::Command(format!(
                "{tool} {}",
                output.failure_summary()
            )));
        }
        info!(printer, tool, "queue state changed");
        Ok(())
    }
}

#[async_trait]
impl PrintBackend for LpstatBackend {
    fn name(&self) -> &'static str {
        "cli"
    }

    #[instrument(skip(self), fields(server = %self.server.host_spec()))]
    async fn list_printers(&self) -> Result<HashMap<String, PrinterRecord>> {
        let mut args = self.host_args();
        args.extend(["-l", "-p", "-v"].map(String::from));

        let output = self.runner.run("lpstat", &args).await?;
        if !output.status_ok {
            return Err(DruckwerkError::Command(format!(
                "lpstat {}",
                output.failure_summary()
            )));
        }

        let text = output.stdout_text();
        let printers = self.status_parser.parse(&text);
        debug!(count = printers.len(), "listed printers");
        Ok(printers)
    }

    #[instrument(skip(self, payload, options), fields(payload = %payload.describe()))]
    async fn dispatch_print(
        &self,
        printer: &str,
        payload: &PrintPayload,
        options: &DispatchOptions,
    ) -> Result<DispatchReceipt> {
        let mut args = self.host_args();
        args.extend(["-d".to_string(), printer.to_string()]);
        if options.copies > 1 {
            args.extend(["-n".to_string(), options.copies.to_string()]);
        }
        if let Some(user) = &options.user {
            args.extend(["-U".to_string(), user.clone()]);
        }
        if let Some(title) = &options.title {
            args.extend(["-t".to_string(), title.clone()]);
        }

        let output = match payload {
            PrintPayload::File(path) => {
                if tokio::fs::metadata(path).await.is_err() {
                    return Err(DruckwerkError::Dispatch(format!(
                        "file not found: {}",
                        path.display()
                    )));
                }
                args.push(path.display().to_string());
                self.runner.run("lp", &args).await?
            }
            PrintPayload::Text(text) => {
                self.runner
                    .run_with_stdin("lp", &args, text.as_bytes())
                    .await?
            }
        };

        if !output.status_ok {
            return Err(DruckwerkError::Dispatch(format!(
                "lp {}",
                output.failure_summary()
            )));
        }

        let message = output.stdout_text().trim().to_string();
        let job_id = extract_request_id(&message);
        info!(printer, job_id = job_id.as_deref().unwrap_or("-"), "dispatched");
        Ok(DispatchReceipt::new(job_id, message))
    }

    #[instrument(skip(self), fields(server = %self.server.host_spec()))]
    async fn list_jobs(&self, printer: Option<&str>) -> Result<Vec<JobRecord>> {
        let mut args = self.host_args();
        args.push("-o".to_string());
        if let Some(printer) = printer {
            args.push(printer.to_string());
        }

        let output = self.runner.run("lpstat", &args).await?;
        if !output.status_ok {
            return Err(DruckwerkError::Command(format!(
                "lpstat {}",
                output.failure_summary()
            )));
        }

        let jobs = self.queue_parser.parse(&output.stdout_text());
        debug!(count = jobs.len(), "listed jobs");
        Ok(jobs)
    }

    #[instrument(skip(self))]
    async fn cancel_job(&self, printer: &str, job_id: i32) -> Result<()> {
        let mut args = self.host_args();
        args.push(format!("{printer}-{job_id}"));

        let output = self.runner.run("cancel", &args).await?;
        if !output.status_ok {
            return Err(DruckwerkError::Command(format!(
                "cancel {}",
                output.failure_summary()
            )));
        }
        info!(printer, job_id, "job cancelled");
        Ok(())
    }
}

/// Pull the request id out of the `lp` acknowledgement, which reads
/// `request id is maria-42 (1 file(s))`.
fn extract_request_id(message: &str) -> Option<String> {
    let rest = message.split("request id is ").nth(1)?;
    let id = rest.split_whitespace().next()?;
    (!id.is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned outputs and records every invocation.
    struct ScriptedRunner {
        responses: Mutex<VecDeque<CommandOutput>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct RecordedCall {
        program: String,
        args: Vec<String>,
        stdin: Option<Vec<u8>>,
    }

    impl ScriptedRunner {
        fn replaying(outputs: Vec<CommandOutput>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(outputs.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn ok(stdout: &str) -> CommandOutput {
            CommandOutput {
                status_ok: true,
                code: Some(0),
                stdout: stdout.as_bytes().to_vec(),
                stderr: Vec::new(),
            }
        }

        fn ok_bytes(stdout: Vec<u8>) -> CommandOutput {
            CommandOutput {
                status_ok: true,
                code: Some(0),
                stdout,
                stderr: Vec::new(),
            }
        }

        fn fail(stderr: &str) -> CommandOutput {
            CommandOutput {
                status_ok: false,
                code: Some(1),
                stdout: Vec::new(),
                stderr: stderr.as_bytes().to_vec(),
            }
        }

        fn next(&self) -> CommandOutput {
            self.responses
                .lock()
                .expect("responses lock poisoned")
                .pop_front()
                .expect("runner called more times than scripted")
        }

        fn record(&self, program: &str, args: &[String], stdin: Option<&[u8]>) {
            self.calls.lock().expect("calls lock poisoned").push(RecordedCall {
                program: program.to_string(),
                args: args.to_vec(),
                stdin: stdin.map(|b| b.to_vec()),
            });
        }

        fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().expect("calls lock poisoned").clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
            self.record(program, args, None);
            Ok(self.next())
        }

        async fn run_with_stdin(
            &self,
            program: &str,
            args: &[String],
            input: &[u8],
        ) -> Result<CommandOutput> {
            self.record(program, args, Some(input));
            Ok(self.next())
        }
    }

    fn backend_with(runner: Arc<ScriptedRunner>) -> LpstatBackend {
        LpstatBackend::with_runner(ServerConfig::default(), runner)
    }

    #[tokio::test]
    async fn list_printers_invokes_lpstat_and_parses() {
        let listing = "printer maria is idle. enabled since Mon 01 Jan 2024\n\
                       \tDescription: Front office\n\
                       device for maria: socket://10.0.0.5:9100\n";
        let runner = ScriptedRunner::replaying(vec![ScriptedRunner::ok(listing)]);
        let backend = backend_with(Arc::clone(&runner));

        let printers = backend.list_printers().await.unwrap();
        assert_eq!(printers.len(), 1);
        assert_eq!(
            printers["maria"].device_uri.as_deref(),
            Some("socket://10.0.0.5:9100")
        );

        let calls = runner.calls();
        assert_eq!(calls[0].program, "lpstat");
        assert_eq!(
            calls[0].args,
            vec!["-h", "localhost:631", "-l", "-p", "-v"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn host_spec_carries_version_pin() {
        let server = ServerConfig {
            host: "hopper.example.org".to_string(),
            port: 631,
            ipp_version: Some("1.1".to_string()),
        };
        let runner = ScriptedRunner::replaying(vec![ScriptedRunner::ok("")]);
        let backend = LpstatBackend::with_runner(server, runner.clone());

        backend.list_printers().await.unwrap();
        assert_eq!(runner.calls()[0].args[1], "hopper.example.org:631/version=1.1");
    }

    #[tokio::test]
    async fn latin1_listing_still_parses() {
        // "Kælderen" as Latin-1 bytes inside an otherwise ASCII listing
        let mut listing = b"printer maria is idle. enabled since Mon 01 Jan 2024\n\tLocation: K".to_vec();
        listing.push(0xe6);
        listing.extend_from_slice(b"lderen\n");
        let runner = ScriptedRunner::replaying(vec![ScriptedRunner::ok_bytes(listing)]);
        let backend = backend_with(runner);

        let printers = backend.list_printers().await.unwrap();
        assert_eq!(printers["maria"].location.as_deref(), Some("Kælderen"));
    }

    #[tokio::test]
    async fn failed_listing_surfaces_stderr() {
        let runner =
            ScriptedRunner::replaying(vec![ScriptedRunner::fail("lpstat: Connection refused")]);
        let backend = backend_with(runner);

        let error = backend.list_printers().await.unwrap_err();
        match error {
            DruckwerkError::Command(message) => {
                assert!(message.contains("Connection refused"), "got: {message}");
            }
            other => panic!("expected Command error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn text_dispatch_pipes_stdin() {
        let runner = ScriptedRunner::replaying(vec![ScriptedRunner::ok(
            "request id is maria-42 (1 file(s))",
        )]);
        let backend = backend_with(Arc::clone(&runner));

        let receipt = backend
            .dispatch_print(
                "maria",
                &PrintPayload::Text("hello press".to_string()),
                &DispatchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(receipt.job_id.as_deref(), Some("maria-42"));
        let calls = runner.calls();
        assert_eq!(calls[0].program, "lp");
        assert_eq!(calls[0].stdin.as_deref(), Some("hello press".as_bytes()));
        assert_eq!(
            calls[0].args,
            vec!["-h", "localhost:631", "-d", "maria"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn file_dispatch_passes_options_and_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let runner = ScriptedRunner::replaying(vec![ScriptedRunner::ok(
            "request id is maria-43 (1 file(s))",
        )]);
        let backend = backend_with(Arc::clone(&runner));

        let options = DispatchOptions {
            copies: 3,
            user: Some("mathias".to_string()),
            title: Some("quarterly report".to_string()),
        };
        let receipt = backend
            .dispatch_print("maria", &PrintPayload::File(path.clone()), &options)
            .await
            .unwrap();
        assert_eq!(receipt.job_id.as_deref(), Some("maria-43"));

        let call = &runner.calls()[0];
        assert_eq!(call.stdin, None);
        let expected: Vec<String> = vec![
            "-h".to_string(),
            "localhost:631".to_string(),
            "-d".to_string(),
            "maria".to_string(),
            "-n".to_string(),
            "3".to_string(),
            "-U".to_string(),
            "mathias".to_string(),
            "-t".to_string(),
            "quarterly report".to_string(),
            path.display().to_string(),
        ];
        assert_eq!(call.args, expected);
    }

    #[tokio::test]
    async fn missing_file_fails_before_spawning() {
        let runner = ScriptedRunner::replaying(vec![]);
        let backend = backend_with(Arc::clone(&runner));

        let result = backend
            .dispatch_print(
                "maria",
                &PrintPayload::File("/no/such/file.ps".into()),
                &DispatchOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(DruckwerkError::Dispatch(_))));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn dispatch_failure_carries_tool_stderr() {
        let runner = ScriptedRunner::replaying(vec![ScriptedRunner::fail(
            "lp: The printer or class does not exist.",
        )]);
        let backend = backend_with(runner);

        let error = backend
            .dispatch_print(
                "ghost",
                &PrintPayload::Text("x".to_string()),
                &DispatchOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, DruckwerkError::Dispatch(_)));
    }

    #[tokio::test]
    async fn list_jobs_narrows_to_queue() {
        let runner = ScriptedRunner::replaying(vec![ScriptedRunner::ok(
            "maria-42  mathias  1024  Tue 02 Jan 2024\n",
        )]);
        let backend = backend_with(Arc::clone(&runner));

        let jobs = backend.list_jobs(Some("maria")).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].printer, "maria");

        let call = &runner.calls()[0];
        assert_eq!(call.program, "lpstat");
        assert_eq!(call.args.last().map(String::as_str), Some("maria"));
    }

    #[tokio::test]
    async fn cancel_builds_request_id() {
        let runner = ScriptedRunner::replaying(vec![ScriptedRunner::ok("")]);
        let backend = backend_with(Arc::clone(&runner));

        backend.cancel_job("maria", 42).await.unwrap();
        let call = &runner.calls()[0];
        assert_eq!(call.program, "cancel");
        assert_eq!(call.args.last().map(String::as_str), Some("maria-42"));
    }

    #[tokio::test]
    async fn enable_and_disable_use_cups_tools() {
        let runner = ScriptedRunner::replaying(vec![
            ScriptedRunner::ok(""),
            ScriptedRunner::ok(""),
        ]);
        let backend = backend_with(Arc::clone(&runner));

        backend.enable_printer("maria").await.unwrap();
        backend.disable_printer("maria").await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].program, "cupsenable");
        assert_eq!(calls[1].program, "cupsdisable");
        assert_eq!(calls[0].args.last().map(String::as_str), Some("maria"));
    }

    #[test]
    fn request_id_extraction() {
        assert_eq!(
            extract_request_id("request id is maria-42 (1 file(s))").as_deref(),
            Some("maria-42")
        );
        assert_eq!(extract_request_id("request id is lab-3-7"), Some("lab-3-7".to_string()));
        assert_eq!(extract_request_id("no id here"), None);
    }
}
