//! Run notifications
//!
//! One event is sent per run, after retention. The event kind follows the
//! run outcome. Delivery problems are reported through [`NotificationResult`]
//! and never fail the run.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::summary::{Outcome, RunSummary};
use crate::config::WebhookConfig;
use crate::targets::BackupResult;

/// Event names understood by the receiving side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BackupSuccess,
    BackupPartialFailure,
    BackupCriticalFailure,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BackupSuccess => "backup_success",
            EventKind::BackupPartialFailure => "backup_partial_failure",
            EventKind::BackupCriticalFailure => "backup_critical_failure",
        }
    }
}

impl From<Outcome> for EventKind {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::AllSucceeded => EventKind::BackupSuccess,
            Outcome::PartialFailure => EventKind::BackupPartialFailure,
            Outcome::AllFailed => EventKind::BackupCriticalFailure,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a notifier gets to see about a finished run
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub timestamp: DateTime<Local>,
    pub dry_run: bool,
    pub results: Vec<BackupResult>,
}

impl NotificationEvent {
    /// `None` for an empty run, which has no outcome
    pub fn from_summary(summary: &RunSummary) -> Option<Self> {
        let outcome = summary.outcome()?;
        Some(Self {
            kind: outcome.into(),
            timestamp: Local::now(),
            dry_run: summary.dry_run,
            results: summary.results.clone(),
        })
    }
}

/// Delivery report of one notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResult {
    pub notifier_type: String,
    pub success: bool,
    pub message: Option<String>,
    pub error_message: Option<String>,
}

impl NotificationResult {
    pub fn delivered(notifier_type: &str, message: String) -> Self {
        Self {
            notifier_type: notifier_type.to_string(),
            success: true,
            message: Some(message),
            error_message: None,
        }
    }

    pub fn failed(notifier_type: &str, error: String) -> Self {
        Self {
            notifier_type: notifier_type.to_string(),
            success: false,
            message: None,
            error_message: Some(error),
        }
    }
}

/// A destination for run events
pub trait Notifier: Send + Sync {
    fn notifier_type(&self) -> &str;

    /// Deliver the event; failures are returned, never raised
    fn notify(&self, event: &NotificationEvent) -> NotificationResult;
}

/// JSON body posted to the webhook
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub event: &'static str,
    pub data: WebhookData<'a>,
}

#[derive(Debug, Serialize)]
pub struct WebhookData<'a> {
    pub timestamp: String,
    pub dry_run: bool,
    pub backups: Vec<WebhookBackup<'a>>,
}

#[derive(Debug, Serialize)]
pub struct WebhookBackup<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub target_type: &'static str,
    pub success: bool,
    /// Whole seconds, truncated
    pub duration_seconds: u64,
    pub size_mb: f64,
    pub error: Option<&'a str>,
}

/// Build the webhook body for an event
pub fn build_payload(event: &NotificationEvent) -> WebhookPayload<'_> {
    let backups = event
        .results
        .iter()
        .map(|r| WebhookBackup {
            name: &r.name,
            target_type: r.target_type.as_str(),
            success: r.success,
            duration_seconds: r.duration_seconds() as u64,
            size_mb: r.size_mb(),
            error: r.error_message.as_deref(),
        })
        .collect();

    WebhookPayload {
        event: event.kind.as_str(),
        data: WebhookData {
            timestamp: event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
            dry_run: event.dry_run,
            backups,
        },
    }
}

/// Posts events as JSON to a webhook (n8n or similar)
pub struct WebhookNotifier {
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig) -> Self {
        Self {
            url: config.url.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    fn send_webhook(&self, payload: &WebhookPayload<'_>) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let response = client
            .post(&self.url)
            .json(payload)
            .send()
            .context("Webhook request failed")?;

        let status = response.status();
        if status.is_success() {
            debug!("Webhook accepted with status {}", status);
            Ok(())
        } else {
            let body = response.text().unwrap_or_default();
            anyhow::bail!("Webhook returned status {}: {}", status, body.trim())
        }
    }
}

impl Notifier for WebhookNotifier {
    fn notifier_type(&self) -> &str {
        "webhook"
    }

    fn notify(&self, event: &NotificationEvent) -> NotificationResult {
        let payload = build_payload(event);
        match self.send_webhook(&payload) {
            Ok(()) => NotificationResult::delivered(
                self.notifier_type(),
                format!("Webhook sent successfully to {}", self.url),
            ),
            Err(e) => NotificationResult::failed(self.notifier_type(), format!("{:#}", e)),
        }
    }
}

/// Notifier that keeps events in memory
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct RecordingNotifier {
        pub events: Arc<Mutex<Vec<NotificationEvent>>>,
        failure: Option<String>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// Record events but report every delivery as failed
        pub fn failing(message: &str) -> Self {
            Self {
                events: Arc::default(),
                failure: Some(message.to_string()),
            }
        }

        pub fn events(&self) -> Vec<NotificationEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn last_kind(&self) -> Option<EventKind> {
            self.events.lock().unwrap().last().map(|e| e.kind)
        }
    }

    impl Notifier for RecordingNotifier {
        fn notifier_type(&self) -> &str {
            "recording"
        }

        fn notify(&self, event: &NotificationEvent) -> NotificationResult {
            self.events.lock().unwrap().push(event.clone());
            match &self.failure {
                Some(message) => NotificationResult::failed(self.notifier_type(), message.clone()),
                None => NotificationResult::delivered(self.notifier_type(), "recorded".to_string()),
            }
        }
    }
}
