//! Application push flow: resolve the application and its route, diff
//! local resources against the control plane, upload the rest and wait
//! for the staging job.
//!
//! This crate holds the push **business logic** only. Transport comes
//! from a [`PushActor`]: [`CcActor`] talks to a Cloud Controller, tests
//! plug in scripted mocks.
//!
//! # Pipeline
//!
//! 1. **Application**: find it by name and space, or create it
//! 2. **Route**: reuse, find or create one and bind it
//! 3. **Diff**: scan the source and keep what the control plane holds
//! 4. **Upload**: zip the rest and stream it with the kept manifest
//! 5. **Track**: poll the staging job until it finishes

pub mod actor;
pub mod cc_actor;
pub mod coordinator;
pub mod error;
pub mod types;

pub use actor::{PushActor, UploadContent};
pub use cc_actor::CcActor;
pub use coordinator::PushCoordinator;
pub use error::PushError;
pub use types::{DiffSummary, PushEvent, PushOptions, PushResult, PushState, RouteHints};
