//! Push configuration, progress events and results.

use std::fmt;
use std::path::PathBuf;

use cloudpush_protocol::{Application, Route};
use cloudpush_transfer::ResourceDiff;

/// Stage of a single push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    ResolvingApplication,
    ResolvingRoutes,
    DiffingResources,
    Uploading,
    TrackingJob,
    Done,
    Failed,
}

impl PushState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResolvingApplication => "resolving application",
            Self::ResolvingRoutes => "resolving routes",
            Self::DiffingResources => "diffing resources",
            Self::Uploading => "uploading",
            Self::TrackingJob => "tracking job",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PushState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitted while pushing.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// The push entered a new stage.
    StateChanged { app_name: String, state: PushState },
    /// The push finished and the staging job succeeded.
    Completed { app_name: String, app_guid: String },
    /// The push stopped on an error.
    Failed { app_name: String, error: String },
}

/// Preferred route for an application. Unset fields fall back to the
/// application name and the first available domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteHints {
    pub host: Option<String>,
    /// Domain name, e.g. `apps.example.com`.
    pub domain: Option<String>,
}

impl RouteHints {
    pub fn is_empty(&self) -> bool {
        self.host.is_none() && self.domain.is_none()
    }
}

/// What to push and where.
#[derive(Debug, Clone)]
pub struct PushOptions {
    pub app_name: String,
    pub space_guid: String,
    /// Local application directory.
    pub path: PathBuf,
    pub route: RouteHints,
    /// Reject duplicate paths with differing content instead of keeping
    /// the last occurrence.
    pub strict_resources: bool,
}

impl PushOptions {
    pub fn new(
        app_name: impl Into<String>,
        space_guid: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            space_guid: space_guid.into(),
            path: path.into(),
            route: RouteHints::default(),
            strict_resources: false,
        }
    }
}

/// Counts of a resource diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Resources already held by the control plane.
    pub kept: usize,
    /// Resources sent in the archive.
    pub uploaded: usize,
    /// Uncompressed size of the uploaded resources.
    pub uploaded_bytes: u64,
}

impl From<&ResourceDiff> for DiffSummary {
    fn from(diff: &ResourceDiff) -> Self {
        Self {
            kept: diff.to_keep.len(),
            uploaded: diff.to_upload.len(),
            uploaded_bytes: diff.to_upload.total_size(),
        }
    }
}

/// Result of a successful push.
#[derive(Debug, Clone)]
pub struct PushResult {
    pub application: Application,
    pub route: Route,
    pub diff: DiffSummary,
    /// Guid of the staging job that finished.
    pub job_guid: String,
}
