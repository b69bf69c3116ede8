//! Resource matching: asks the control plane which file contents it
//! already caches, so only the rest has to be uploaded.

use std::collections::HashSet;

use cloudpush_protocol::{Outcome, Resource};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::Client;
use crate::error::CcError;

/// One entry of a resource match request or response. Content is
/// identified by fingerprint and size; paths are not part of the match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct MatchEntry {
    fingerprint: String,
    size: u64,
}

impl Client {
    /// `PUT /v2/resource_match`
    ///
    /// Returns the subset of `candidates` whose content the control plane
    /// already holds, in candidate order.
    pub async fn resource_match(&self, candidates: &[Resource]) -> Outcome<Vec<Resource>, CcError> {
        let entries: Vec<MatchEntry> = candidates
            .iter()
            .map(|r| MatchEntry {
                fingerprint: r.fingerprint.clone(),
                size: r.size,
            })
            .collect();

        let req = self
            .http()
            .put(self.url("/v2/resource_match"))
            .json(&entries);

        self.make::<Vec<MatchEntry>>(req).await.map(|known| {
            let known: HashSet<MatchEntry> = known.into_iter().collect();
            let matched: Vec<Resource> = candidates
                .iter()
                .filter(|r| {
                    known.contains(&MatchEntry {
                        fingerprint: r.fingerprint.clone(),
                        size: r.size,
                    })
                })
                .cloned()
                .collect();
            debug!(
                candidates = candidates.len(),
                matched = matched.len(),
                "resource match complete"
            );
            matched
        })
    }
}
