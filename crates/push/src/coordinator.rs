//! Push coordinator.
//!
//! Drives one application push through its stages, reports progress
//! events, and supports cancellation:
//!
//! `ResolvingApplication → ResolvingRoutes → DiffingResources → Uploading
//! → TrackingJob → Done | Failed`

use cloudpush_cc::{CcError, JobSource, JobTracker, PollingConfig};
use cloudpush_protocol::{Job, Outcome, Warnings};
use cloudpush_transfer::{ResourceSet, TransferError, diff};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::actor::{BoxFuture, PushActor};
use crate::error::PushError;
use crate::types::{DiffSummary, PushEvent, PushOptions, PushResult, PushState};

/// Runs pushes against a [`PushActor`].
pub struct PushCoordinator {
    tracker: JobTracker,
    events_tx: mpsc::Sender<PushEvent>,
    events_rx: Option<mpsc::Receiver<PushEvent>>,
    cancel: CancellationToken,
}

impl Default for PushCoordinator {
    fn default() -> Self {
        Self::new(PollingConfig::default())
    }
}

/// Progress of one push. Never outlives it.
struct PushAttempt<'o> {
    options: &'o PushOptions,
    state: PushState,
    app_guid: Option<String>,
    job_guid: Option<String>,
    warnings: Warnings,
}

impl<'o> PushAttempt<'o> {
    fn new(options: &'o PushOptions) -> Self {
        Self {
            options,
            state: PushState::ResolvingApplication,
            app_guid: None,
            job_guid: None,
            warnings: Warnings::new(),
        }
    }
}

/// Polls jobs through the actor.
struct ActorJobs<'a>(&'a dyn PushActor);

impl JobSource for ActorJobs<'_> {
    fn fetch_job<'b>(&'b self, guid: &'b str) -> BoxFuture<'b, Outcome<Job, CcError>> {
        self.0.fetch_job(guid)
    }
}

impl PushCoordinator {
    /// Creates a coordinator polling staging jobs with `polling`.
    pub fn new(polling: PollingConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            tracker: JobTracker::new(polling),
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<PushEvent>> {
        self.events_rx.take()
    }

    /// Returns the cancellation token shared by every push of this
    /// coordinator.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Pushes one application.
    ///
    /// The returned warnings hold everything the control plane reported
    /// up to the end of the push, whether it succeeded or not.
    pub async fn push(
        &self,
        actor: &dyn PushActor,
        options: &PushOptions,
    ) -> Outcome<PushResult, PushError> {
        let mut attempt = PushAttempt::new(options);
        let result = self.run(actor, &mut attempt).await;

        let app_name = options.app_name.clone();
        match &result {
            Ok(pushed) => {
                attempt.state = PushState::Done;
                self.emit(PushEvent::StateChanged {
                    app_name: app_name.clone(),
                    state: PushState::Done,
                });
                self.emit(PushEvent::Completed {
                    app_name: app_name.clone(),
                    app_guid: pushed.application.guid.clone(),
                });
                info!(
                    app = %app_name,
                    app_guid = %pushed.application.guid,
                    kept = pushed.diff.kept,
                    uploaded = pushed.diff.uploaded,
                    warnings = attempt.warnings.len(),
                    "push completed"
                );
            }
            Err(e) => {
                let failed_in = attempt.state;
                attempt.state = PushState::Failed;
                self.emit(PushEvent::StateChanged {
                    app_name: app_name.clone(),
                    state: PushState::Failed,
                });
                self.emit(PushEvent::Failed {
                    app_name: app_name.clone(),
                    error: e.to_string(),
                });
                error!(
                    app = %app_name,
                    app_guid = ?attempt.app_guid,
                    job_guid = ?attempt.job_guid,
                    state = %failed_in,
                    error = %e,
                    "push failed"
                );
            }
        }

        Outcome::new(result, attempt.warnings)
    }

    /// Pushes several applications one after another. A failed push does
    /// not stop the next one; cancellation stops all that remain.
    pub async fn push_many(
        &self,
        actor: &dyn PushActor,
        pushes: &[PushOptions],
    ) -> Vec<Outcome<PushResult, PushError>> {
        let mut outcomes = Vec::with_capacity(pushes.len());
        for options in pushes {
            outcomes.push(self.push(actor, options).await);
        }
        outcomes
    }

    async fn run(
        &self,
        actor: &dyn PushActor,
        attempt: &mut PushAttempt<'_>,
    ) -> Result<PushResult, PushError> {
        let options = attempt.options;

        self.enter(attempt, PushState::ResolvingApplication)?;
        let application = actor
            .find_or_create_application(&options.app_name, &options.space_guid)
            .await
            .merge_into(&mut attempt.warnings)?;
        attempt.app_guid = Some(application.guid.clone());

        self.enter(attempt, PushState::ResolvingRoutes)?;
        let route = actor
            .ensure_route(&application, &options.route)
            .await
            .merge_into(&mut attempt.warnings)?;

        self.enter(attempt, PushState::DiffingResources)?;
        let scanned = actor.scan_local_source(&options.path).await?;
        self.check_cancelled()?;
        let candidates = resolve_duplicates(scanned, options.strict_resources)?;
        let existing: ResourceSet = actor
            .list_application_resources(&application.guid, candidates.as_slice())
            .await
            .merge_into(&mut attempt.warnings)?
            .into();
        let resource_diff = diff(&existing, &candidates);
        let summary = DiffSummary::from(&resource_diff);
        debug!(
            app = %options.app_name,
            kept = summary.kept,
            uploaded = summary.uploaded,
            uploaded_bytes = summary.uploaded_bytes,
            "resources diffed"
        );

        self.enter(attempt, PushState::Uploading)?;
        let archive = actor
            .archive_resources(&options.path, resource_diff.to_upload.as_slice())
            .await?;
        self.check_cancelled()?;
        let content = archive.open().await.map_err(TransferError::Io)?;
        let job = actor
            .submit_upload(
                &application.guid,
                resource_diff.to_keep.as_slice(),
                Box::new(content),
                archive.len(),
            )
            .await
            .merge_into(&mut attempt.warnings)?;
        drop(archive);
        attempt.job_guid = Some(job.guid.clone());
        let job_guid = job.guid.clone();

        self.enter(attempt, PushState::TrackingJob)?;
        self.tracker
            .track(&ActorJobs(actor), job, &self.cancel)
            .await
            .merge_into(&mut attempt.warnings)?;

        Ok(PushResult {
            application,
            route,
            diff: summary,
            job_guid,
        })
    }

    fn check_cancelled(&self) -> Result<(), PushError> {
        if self.cancel.is_cancelled() {
            return Err(PushError::Cancelled);
        }
        Ok(())
    }

    fn enter(&self, attempt: &mut PushAttempt<'_>, state: PushState) -> Result<(), PushError> {
        self.check_cancelled()?;
        attempt.state = state;
        debug!(app = %attempt.options.app_name, state = %state, "push state changed");
        self.emit(PushEvent::StateChanged {
            app_name: attempt.options.app_name.clone(),
            state,
        });
        Ok(())
    }

    fn emit(&self, event: PushEvent) {
        let _ = self.events_tx.try_send(event);
    }
}

/// Applies the duplicate path policy: conflicting duplicates are an error
/// when `strict`, otherwise the last occurrence of each path wins.
fn resolve_duplicates(scanned: ResourceSet, strict: bool) -> Result<ResourceSet, PushError> {
    let conflicts = scanned.conflicting_paths();
    if !conflicts.is_empty() {
        if strict {
            return Err(PushError::DiffInconsistency { paths: conflicts });
        }
        warn!(paths = ?conflicts, "duplicate resource paths, keeping last occurrence");
    }
    Ok(scanned.dedup_last_wins())
}
