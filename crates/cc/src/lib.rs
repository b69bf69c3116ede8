//! Async client for the Cloud Controller v2 API.
//!
//! Every operation returns an [`Outcome`](cloudpush_protocol::Outcome)
//! carrying the advisory warnings the control plane attached to the
//! response, even when the call fails.

pub mod application;
pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod resource_match;
pub mod route;
pub mod upload;

#[cfg(any(test, feature = "mock"))]
#[doc(hidden)]
pub mod mock;

pub use client::{Client, WARNINGS_HEADER, parse_warnings};
pub use config::{ClientConfig, PollingConfig};
pub use error::CcError;
pub use job::{JobSource, JobTracker};
