//! The control plane operations a push needs.
//!
//! `PushActor` keeps the push state machine independent of transport:
//! [`CcActor`](crate::cc_actor::CcActor) implements it over the Cloud
//! Controller client, tests substitute scripted mocks.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use cloudpush_cc::{CcError, JobSource};
use cloudpush_protocol::{Application, Job, Outcome, Resource, Route, Warnings};
use cloudpush_transfer::{Archive, ResourceSet, TransferError, scan_resources, zip_resources};
use tokio::io::AsyncRead;
use tracing::debug;

use crate::types::RouteHints;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Archive content handed to [`PushActor::submit_upload`].
pub type UploadContent = Box<dyn AsyncRead + Send + Unpin>;

/// Abstract control plane used by the push coordinator.
///
/// Every remote operation returns an [`Outcome`] so warnings survive
/// failures. Job polling comes from the [`JobSource`] supertrait.
pub trait PushActor: JobSource {
    /// Looks up an application by name within a space.
    /// No match is [`CcError::ResourceNotFound`].
    fn get_application_by_name_and_space<'a>(
        &'a self,
        name: &'a str,
        space_guid: &'a str,
    ) -> BoxFuture<'a, Outcome<Application, CcError>>;

    fn create_application<'a>(
        &'a self,
        app: &'a Application,
    ) -> BoxFuture<'a, Outcome<Application, CcError>>;

    /// Makes sure `app` is reachable through a route and returns it.
    fn ensure_route<'a>(
        &'a self,
        app: &'a Application,
        hints: &'a RouteHints,
    ) -> BoxFuture<'a, Outcome<Route, CcError>>;

    /// Resources of the application bundle the control plane already
    /// holds. `candidates` are the local resources about to be pushed.
    fn list_application_resources<'a>(
        &'a self,
        app_guid: &'a str,
        candidates: &'a [Resource],
    ) -> BoxFuture<'a, Outcome<Vec<Resource>, CcError>>;

    /// Uploads `len` bytes of archive `content` plus the manifest of
    /// `existing` resources. Returns the staging job.
    fn submit_upload<'a>(
        &'a self,
        app_guid: &'a str,
        existing: &'a [Resource],
        content: UploadContent,
        len: u64,
    ) -> BoxFuture<'a, Outcome<Job, CcError>>;

    /// Returns the application named `name` in `space_guid`, creating it
    /// when it does not exist yet.
    fn find_or_create_application<'a>(
        &'a self,
        name: &'a str,
        space_guid: &'a str,
    ) -> BoxFuture<'a, Outcome<Application, CcError>> {
        Box::pin(async move {
            let mut warnings = Warnings::new();
            match self
                .get_application_by_name_and_space(name, space_guid)
                .await
                .merge_into(&mut warnings)
            {
                Ok(app) => Outcome::ok(app, warnings),
                Err(CcError::ResourceNotFound(_)) => {
                    debug!(name, space_guid, "application not found, creating it");
                    let wanted = Application {
                        name: name.to_string(),
                        space_guid: space_guid.to_string(),
                        ..Application::default()
                    };
                    let created = self.create_application(&wanted).await.merge_into(&mut warnings);
                    Outcome::new(created, warnings)
                }
                Err(e) => Outcome::err(e, warnings),
            }
        })
    }

    /// Walks the local application directory on the blocking pool.
    fn scan_local_source<'a>(
        &'a self,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<ResourceSet, TransferError>> {
        let path = path.to_path_buf();
        Box::pin(run_blocking(move || scan_resources(&path)))
    }

    /// Zips `resources` from `path` into a temporary archive on the
    /// blocking pool.
    fn archive_resources<'a>(
        &'a self,
        path: &'a Path,
        resources: &'a [Resource],
    ) -> BoxFuture<'a, Result<Archive, TransferError>> {
        let path = path.to_path_buf();
        let resources = resources.to_vec();
        Box::pin(run_blocking(move || zip_resources(&path, &resources)))
    }
}

/// Runs filesystem work with `spawn_blocking` so hashing and zipping
/// never stall the runtime.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, TransferError>
where
    F: FnOnce() -> Result<T, TransferError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(format!("task join error: {e}"))))?
}
