//! Backup manager - orchestrates a backup run
//!
//! A run is a single pass through
//! `Init -> ExecutingTargets -> Retaining -> Notifying -> Done`.
//! Retaining is skipped under dry-run; nothing is retried.
//!
//! Targets run sequentially in configuration order. A failing target is
//! recorded and the run moves on to the next one. Retention and notification
//! problems are logged as warnings and never change the run's exit status.

use crate::config::{Config, TargetKind};
use crate::managers::notification::{NotificationEvent, NotificationResult, Notifier, WebhookNotifier};
use crate::managers::summary::{Outcome, RunSummary};
use crate::targets::{BackupResult, BackupTarget, TargetContext};
use crate::utils::checksum::sidecar_path;
use crate::utils::executor::{CommandExecutor, RealExecutor};
use crate::utils::remote::upload_via_rsync;
use crate::utils::retention::{self, RetentionReport, ARTIFACT_PATTERN};
use crate::utils::snapshot_api::{HttpSnapshotApi, SnapshotApi};
use chrono::Local;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, error, info, info_span, warn};

/// Phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    ExecutingTargets,
    Retaining,
    Notifying,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything a run produced
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    /// One entry per target type present in the run; empty under dry-run
    pub retention: BTreeMap<TargetKind, RetentionReport>,
    /// `None` when no notifier is configured
    pub notification: Option<NotificationResult>,
    pub process_exit_ok: bool,
}

impl RunReport {
    pub fn outcome(&self) -> Option<Outcome> {
        self.summary.outcome()
    }
}

pub struct BackupManager<'a> {
    config: &'a Config,
    dry_run: bool,
    executor: Box<dyn CommandExecutor>,
    snapshot_api: Box<dyn SnapshotApi>,
    notifier: Option<Box<dyn Notifier>>,
}

impl<'a> BackupManager<'a> {
    /// Create a manager wired to real processes, HTTP and the configured webhook
    pub fn new(config: &'a Config, dry_run: bool) -> Self {
        let notifier = config
            .notifications
            .webhook
            .as_ref()
            .map(|webhook| Box::new(WebhookNotifier::new(webhook)) as Box<dyn Notifier>);

        Self {
            config,
            dry_run,
            executor: Box::new(RealExecutor::new()),
            snapshot_api: Box::new(HttpSnapshotApi::new()),
            notifier,
        }
    }

    pub fn with_executor(mut self, executor: impl CommandExecutor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    pub fn with_snapshot_api(mut self, snapshot_api: impl SnapshotApi + 'static) -> Self {
        self.snapshot_api = Box::new(snapshot_api);
        self
    }

    /// Replace the configured notifier
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn without_notifier(mut self) -> Self {
        self.notifier = None;
        self
    }

    /// Execute the whole run
    pub fn run(&self) -> RunReport {
        let mut state = RunState::Init;
        info!("Starting backup run (dry_run={})", self.dry_run);
        if self.dry_run {
            info!("DRY RUN MODE - No backups will be performed");
        }

        advance(&mut state, RunState::ExecutingTargets);
        let results = self.execute_targets();
        let summary = RunSummary::new(results, self.dry_run);

        let retention = if self.dry_run {
            info!("[DRY RUN] Would clean up old backups");
            BTreeMap::new()
        } else {
            advance(&mut state, RunState::Retaining);
            self.execute_retention(&summary)
        };

        advance(&mut state, RunState::Notifying);
        let notification = self.send_notification(&summary);

        for line in summary_lines(&summary) {
            info!("{}", line);
        }

        let process_exit_ok = summary.process_exit_ok();
        advance(&mut state, RunState::Done);
        info!(
            total = summary.total(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Backup run finished: {}",
            summary
                .outcome()
                .map(|o| o.to_string())
                .unwrap_or_else(|| "no targets".to_string())
        );

        RunReport {
            summary,
            retention,
            notification,
            process_exit_ok,
        }
    }

    fn execute_targets(&self) -> Vec<BackupResult> {
        let ctx = TargetContext::new(self.executor.as_ref(), self.snapshot_api.as_ref(), self.dry_run);

        self.config
            .backups
            .iter()
            .map(|target_config| {
                let target = BackupTarget::from_config(target_config);
                let span = info_span!("target", name = %target.name(), kind = %target.kind());
                let _enter = span.enter();
                self.execute_target(&target, &ctx)
            })
            .collect()
    }

    /// Validate, execute and (optionally) upload one target
    fn execute_target(&self, target: &BackupTarget<'_>, ctx: &TargetContext<'_>) -> BackupResult {
        let name = target.name();
        let kind = target.kind();
        info!("Executing backup: {} (type: {})", name, kind);

        let started_at = Local::now();
        let validation = target.validate_config();

        let mut result = match validation {
            Err(e) if !self.dry_run => {
                error!("Invalid configuration for {}: {}", name, e);
                BackupResult::failed(name, kind, started_at, e.to_string())
            }
            validation => {
                let mut result = target.execute(&self.config.type_dir(kind), ctx);
                if let Err(e) = validation {
                    warn!("[DRY RUN] {} would fail validation: {}", name, e);
                    result
                        .metadata
                        .insert("validation_error".to_string(), Value::String(e.to_string()));
                }
                result
            }
        };

        if result.success && !self.dry_run {
            self.upload_artifact(&mut result);
        }

        if result.success {
            info!("Backup successful: {} ({:.2} MB)", name, result.size_mb());
        } else {
            error!(
                "Backup failed: {} - {}",
                name,
                result.error_message.as_deref().unwrap_or("unknown error")
            );
        }

        result
    }

    /// Mirror the artifact and its sidecar; failures are recorded, never fatal
    fn upload_artifact(&self, result: &mut BackupResult) {
        let (Some(remote), Some(artifact)) = (&self.config.remote_upload, &result.artifact_path) else {
            return;
        };

        let mut errors = Vec::new();
        let mut bytes = 0;
        for file in [artifact.clone(), sidecar_path(artifact)] {
            let upload = upload_via_rsync(self.executor.as_ref(), remote, &file);
            if upload.success {
                bytes += upload.bytes_transferred;
            } else {
                errors.push(upload.error_message.unwrap_or_default());
            }
        }

        let status = if errors.is_empty() {
            info!("Uploaded {} to {}", result.name, remote.host);
            "ok".to_string()
        } else {
            warn!("Remote upload failed for {}: {}", result.name, errors.join("; "));
            format!("failed: {}", errors.join("; "))
        };

        result
            .metadata
            .insert("remote_upload".to_string(), Value::String(status));
        result
            .metadata
            .insert("remote_bytes_transferred".to_string(), Value::from(bytes));
    }

    /// Sweep each target type present in the run
    fn execute_retention(&self, summary: &RunSummary) -> BTreeMap<TargetKind, RetentionReport> {
        let mut reports = BTreeMap::new();

        for kind in present_kinds(summary) {
            let Some(days) = self.config.retention_days(kind) else {
                debug!("No retention policy for {}", kind);
                reports.insert(kind, RetentionReport::default());
                continue;
            };

            let dir = self.config.type_dir(kind);
            match retention::sweep(&dir, ARTIFACT_PATTERN, days) {
                Ok(report) => {
                    info!(
                        "Retention cleanup ({}): deleted {} files, freed {:.2} MB",
                        kind,
                        report.deleted_count,
                        report.freed_mb()
                    );
                    for (path, reason) in &report.failures {
                        warn!("Retention could not delete {:?}: {}", path, reason);
                    }
                    reports.insert(kind, report);
                }
                Err(e) => {
                    warn!("Retention cleanup failed for {}: {}", kind, e);
                    reports.insert(kind, RetentionReport::default());
                }
            }
        }

        reports
    }

    fn send_notification(&self, summary: &RunSummary) -> Option<NotificationResult> {
        let Some(notifier) = self.notifier.as_ref() else {
            debug!("No notifier configured");
            return None;
        };

        let event = NotificationEvent::from_summary(summary)?;
        info!("Sending {} notification", event.kind);

        let result = notifier.notify(&event);
        if result.success {
            info!("Notification sent successfully");
        } else {
            warn!(
                "Notification failed: {}",
                result.error_message.as_deref().unwrap_or("unknown error")
            );
        }
        Some(result)
    }
}

fn advance(state: &mut RunState, next: RunState) {
    debug!("Run state {} -> {}", state, next);
    *state = next;
}

/// Target types in order of first appearance
fn present_kinds(summary: &RunSummary) -> Vec<TargetKind> {
    let mut kinds = Vec::new();
    for result in &summary.results {
        if !kinds.contains(&result.target_type) {
            kinds.push(result.target_type);
        }
    }
    kinds
}

/// Human-readable summary block logged at the end of a run
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let rule = "=".repeat(60);
    vec![
        rule.clone(),
        "BACKUP SUMMARY".to_string(),
        rule.clone(),
        format!("Total backups: {}", summary.total()),
        format!("Successful: {}", summary.succeeded()),
        format!("Failed: {}", summary.failed()),
        format!("Total size: {:.2} MB", summary.total_size_mb()),
        format!("Total duration: {:.2} seconds", summary.total_duration_seconds()),
        rule,
    ]
}
