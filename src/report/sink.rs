//! Report sinks and detached delivery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::FinalReport;
use crate::error::ReportError;

/// Destination for final reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Deliver one report. Called at most once per report; never retried.
    async fn deliver(&self, report: &FinalReport) -> Result<(), ReportError>;
}

/// POSTs the report as JSON to a fixed URL.
pub struct HttpReportSink {
    url: String,
    client: reqwest::Client,
}

impl HttpReportSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ReportSink for HttpReportSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn deliver(&self, report: &FinalReport) -> Result<(), ReportError> {
        let resp = self
            .client
            .post(&self.url)
            .json(report)
            .send()
            .await
            .map_err(|e| ReportError::Transport {
                sink: self.name().into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ReportError::Rejected {
                sink: self.name().into(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Writes the report to the log. Used when no collaborator URL is configured.
#[derive(Debug, Default)]
pub struct LogReportSink;

#[async_trait]
impl ReportSink for LogReportSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, report: &FinalReport) -> Result<(), ReportError> {
        let payload = serde_json::to_string(report)?;
        info!(session_id = %report.session_id, payload = %payload, "Final report");
        Ok(())
    }
}

/// Deliver `report` on a background task, bounded by `timeout`.
/// Failures are logged; the handle resolves to the outcome but callers on the
/// request path never wait on it.
pub fn dispatch_detached(
    sink: Arc<dyn ReportSink>,
    report: FinalReport,
    timeout: Duration,
) -> tokio::task::JoinHandle<Result<(), ReportError>> {
    tokio::spawn(async move {
        let session_id = report.session_id.clone();
        let result = match tokio::time::timeout(timeout, sink.deliver(&report)).await {
            Ok(result) => result,
            Err(_) => Err(ReportError::Timeout {
                sink: sink.name().into(),
                timeout,
            }),
        };

        match &result {
            Ok(()) => info!(session_id = %session_id, sink = sink.name(), "Report delivered"),
            Err(e) => warn!(session_id = %session_id, error = %e, "Report delivery failed"),
        }
        result
    })
}
