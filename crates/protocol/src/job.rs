//! Asynchronous Cloud Controller jobs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;

/// Current state of a job.
///
/// Transitions are monotonic: `queued → running → finished | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be run.
    Queued,
    /// Running on the control plane.
    Running,
    /// Terminated successfully.
    Finished,
    /// Terminated with a failure.
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when the control plane reports a status outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status: {0:?}")]
pub struct UnknownJobStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownJobStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownJobStatus(other.to_string())),
        }
    }
}

/// A Cloud Controller job.
///
/// Decoded from the v2 envelope; the status string is validated at the
/// boundary so an unrecognized value fails deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Envelope<JobEntity>")]
pub struct Job {
    pub guid: String,
    pub status: JobStatus,
    /// Failure detail, populated only when `status` is `failed`.
    pub error: String,
}

/// Raw `entity` block of a job response, before status validation.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEntity {
    #[serde(default)]
    pub guid: String,
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl TryFrom<Envelope<JobEntity>> for Job {
    type Error = UnknownJobStatus;

    fn try_from(env: Envelope<JobEntity>) -> Result<Self, Self::Error> {
        let status = env.entity.status.parse::<JobStatus>()?;
        // Older control planes only fill the metadata guid.
        let guid = if env.entity.guid.is_empty() {
            env.metadata.guid
        } else {
            env.entity.guid
        };
        Ok(Self {
            guid,
            status,
            error: env.entity.error.unwrap_or_default(),
        })
    }
}

impl Job {
    pub fn new(guid: impl Into<String>, status: JobStatus) -> Self {
        Self {
            guid: guid.into(),
            status,
            error: String::new(),
        }
    }

    /// Builds a failed job carrying the given failure detail.
    pub fn failed_with(guid: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            status: JobStatus::Failed,
            error: error.into(),
        }
    }

    /// Returns true when the job has completed successfully.
    pub fn finished(&self) -> bool {
        self.status == JobStatus::Finished
    }

    /// Returns true when the job has completed with a failure.
    pub fn failed(&self) -> bool {
        self.status == JobStatus::Failed
    }
}
