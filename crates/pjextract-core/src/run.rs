//! Sequential multi-instance run: authenticate, collect, merge.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::collect::{self, PageSource};
use crate::error::AuthError;
use crate::model::{AuthSession, Category, Credentials, ExtractionMode, InstanceId, InstanceSelection, ResultSet};
use crate::progress::Progress;
use crate::settings::Settings;

/// Logs into one instance and hands back its session material.
///
/// Implementations report step-level status (such as the login flow they
/// detected) through `progress`; the outcome itself is reported by the
/// orchestrator.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        instance: InstanceId,
        credentials: &Credentials,
        progress: &mut dyn Progress,
    ) -> Result<AuthSession, AuthError>;
}

/// Everything the caller chooses for a run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub credentials: Credentials,
    pub instances: InstanceSelection,
    pub mode: ExtractionMode,
}

/// Per-category tally of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTally {
    pub category: Category,
    pub records: usize,
    /// False when pagination stopped on an error or the page cap.
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceOutcome {
    Collected {
        instance: InstanceId,
        tallies: Vec<CategoryTally>,
    },
    LoginFailed {
        instance: InstanceId,
        reason: String,
    },
}

impl InstanceOutcome {
    pub fn instance(&self) -> InstanceId {
        match self {
            Self::Collected { instance, .. } | Self::LoginFailed { instance, .. } => *instance,
        }
    }
}

/// Result of a run: the merged records and what happened per instance.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: ResultSet,
    pub instances: Vec<InstanceOutcome>,
}

impl RunReport {
    pub fn failed_instances(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.instances
            .iter()
            .filter(|o| matches!(o, InstanceOutcome::LoginFailed { .. }))
            .map(InstanceOutcome::instance)
    }
}

/// Drives a run over a set of instances, one at a time.
pub struct Orchestrator<A, S> {
    authenticator: A,
    source: S,
    settings: Settings,
}

impl<A: Authenticator, S: PageSource> Orchestrator<A, S> {
    pub fn new(authenticator: A, source: S, settings: Settings) -> Self {
        Self {
            authenticator,
            source,
            settings,
        }
    }

    /// Hand back the capabilities, e.g. to shut the browser down.
    pub fn into_parts(self) -> (A, S) {
        (self.authenticator, self.source)
    }

    /// Process every selected instance in order. No per-instance or per-page
    /// failure aborts the run.
    pub async fn run(&self, request: &RunRequest, progress: &mut dyn Progress) -> RunReport {
        let instances = request.instances.as_slice();
        let total = instances.len();
        let mut report = RunReport::default();

        info!(total, mode = ?request.mode, "starting run");
        progress.run_started(total);

        for (i, &instance) in instances.iter().enumerate() {
            progress.instance_started(instance, i + 1, total);

            let outcome = self
                .process_instance(instance, request, &mut report.results, progress)
                .await;
            report.instances.push(outcome);

            progress.instance_finished(instance, (i + 1) as f32 / total as f32);

            if i + 1 < total && !self.settings.instance_delay.is_zero() {
                tokio::time::sleep(self.settings.instance_delay).await;
            }
        }

        let collected = report.results.len();
        info!(
            collected,
            general = report.results.general.len(),
            archived = report.results.archived.len(),
            failed = report.failed_instances().count(),
            "run finished"
        );
        progress.run_finished(collected);
        report
    }

    async fn process_instance(
        &self,
        instance: InstanceId,
        request: &RunRequest,
        results: &mut ResultSet,
        progress: &mut dyn Progress,
    ) -> InstanceOutcome {
        let session = match self
            .authenticator
            .authenticate(instance, &request.credentials, progress)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                let reason = e.to_string();
                warn!(%instance, error = %reason, "authentication failed, skipping instance");
                progress.login_failed(instance, &reason);
                return InstanceOutcome::LoginFailed { instance, reason };
            }
        };

        info!(%instance, panel_id = %session.panel_id, "authenticated");
        progress.login_succeeded(instance);

        let mut tallies = Vec::new();
        for &category in request.mode.categories() {
            let collected = collect::collect(
                &self.source,
                &session,
                instance,
                category,
                &self.settings,
                progress,
            )
            .await;

            let complete = collected.is_complete();
            let count = collected.records.len();
            results.extend(
                category,
                collected.records.into_iter().map(|mut record| {
                    record.tag_instance(instance);
                    record
                }),
            );
            tallies.push(CategoryTally {
                category,
                records: count,
                complete,
            });
        }

        InstanceOutcome::Collected { instance, tallies }
    }
}
