//! Wire types shared by the cloudpush crates.
//!
//! Mirrors the JSON shapes of the Cloud Controller v2 API: resource
//! envelopes, jobs, applications, routes and domains, plus the
//! [`Warnings`] / [`Outcome`] pair every remote call returns.

pub mod envelope;
pub mod job;
pub mod resource;
pub mod types;
pub mod warnings;

// Re-export primary types for convenience.
pub use envelope::{CcErrorBody, Envelope, Metadata, Page};
pub use job::{Job, JobEntity, JobStatus, UnknownJobStatus};
pub use resource::Resource;
pub use types::{
    Application, ApplicationState, CreateApplicationRequest, CreateRouteRequest, Domain,
    PackageState, Route,
};
pub use warnings::{Outcome, Warnings};
