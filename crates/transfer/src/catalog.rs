//! Resource catalog: ordered resource sets and the keep/upload diff.
//!
//! Pure data, no I/O.

use std::collections::{HashMap, HashSet};

use cloudpush_protocol::Resource;

/// Ordered sequence of resources making up an application bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet(Vec<Resource>);

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: Resource) {
        self.0.push(resource);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Resource] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Resource> {
        self.0
    }

    /// Sum of all resource sizes in bytes.
    pub fn total_size(&self) -> u64 {
        self.0.iter().map(|r| r.size).sum()
    }

    /// Returns true if a resource with the same path and fingerprint exists.
    pub fn contains_key(&self, path: &str, fingerprint: &str) -> bool {
        self.0
            .iter()
            .any(|r| r.path == path && r.fingerprint == fingerprint)
    }

    /// Paths that occur more than once with differing fingerprints,
    /// in order of first occurrence.
    pub fn conflicting_paths(&self) -> Vec<String> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        let mut conflicts: Vec<String> = Vec::new();
        for r in &self.0 {
            match seen.get(r.path.as_str()) {
                Some(fp) if *fp != r.fingerprint => {
                    if !conflicts.iter().any(|c| c == &r.path) {
                        conflicts.push(r.path.clone());
                    }
                }
                Some(_) => {}
                None => {
                    seen.insert(&r.path, &r.fingerprint);
                }
            }
        }
        conflicts
    }

    /// Collapses duplicate paths, keeping the last occurrence of each at
    /// the position where that last occurrence appears.
    pub fn dedup_last_wins(self) -> Self {
        let mut last: HashMap<String, usize> = HashMap::new();
        for (i, r) in self.0.iter().enumerate() {
            last.insert(r.path.clone(), i);
        }
        Self(
            self.0
                .into_iter()
                .enumerate()
                .filter(|(i, r)| last.get(&r.path) == Some(i))
                .map(|(_, r)| r)
                .collect(),
        )
    }
}

impl From<Vec<Resource>> for ResourceSet {
    fn from(v: Vec<Resource>) -> Self {
        Self(v)
    }
}

impl FromIterator<Resource> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ResourceSet {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Partition of a candidate set against the resources the control plane
/// already holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDiff {
    /// Already known server-side; referenced by manifest only.
    pub to_keep: ResourceSet,
    /// Must be transmitted in the archive.
    pub to_upload: ResourceSet,
}

/// Splits `candidate` into resources to keep and resources to upload.
///
/// A candidate is kept when its `(path, fingerprint)` pair appears in
/// `existing`. Both outputs preserve candidate order, and together they
/// contain every candidate exactly once.
pub fn diff(existing: &ResourceSet, candidate: &ResourceSet) -> ResourceDiff {
    let known: HashSet<(&str, &str)> = existing.iter().map(Resource::key).collect();

    let (keep, upload): (Vec<Resource>, Vec<Resource>) = candidate
        .iter()
        .cloned()
        .partition(|r| known.contains(&r.key()));

    ResourceDiff {
        to_keep: keep.into(),
        to_upload: upload.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn res(path: &str, fp: &str) -> Resource {
        Resource::new(path, fp, fp.len() as u64, 0o644)
    }

    fn set(items: &[(&str, &str)]) -> ResourceSet {
        items.iter().map(|(p, f)| res(p, f)).collect()
    }

    #[test]
    fn empty_existing_uploads_everything() {
        let candidate = set(&[("a", "1"), ("b", "2")]);
        let d = diff(&ResourceSet::new(), &candidate);
        assert!(d.to_keep.is_empty());
        assert_eq!(d.to_upload, candidate);
    }

    #[test]
    fn empty_candidate_yields_nothing() {
        let d = diff(&set(&[("a", "1")]), &ResourceSet::new());
        assert!(d.to_keep.is_empty());
        assert!(d.to_upload.is_empty());
    }

    #[test]
    fn matches_on_path_and_fingerprint() {
        let existing = set(&[("a", "1"), ("b", "old"), ("elsewhere", "3")]);
        let candidate = set(&[("a", "1"), ("b", "new"), ("c", "3")]);

        let d = diff(&existing, &candidate);
        assert_eq!(d.to_keep, set(&[("a", "1")]));
        // Same path with a new fingerprint, and same fingerprint at a new
        // path, both upload.
        assert_eq!(d.to_upload, set(&[("b", "new"), ("c", "3")]));
    }

    #[test]
    fn preserves_candidate_order() {
        let existing = set(&[("b", "2"), ("d", "4")]);
        let candidate = set(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4"), ("e", "5")]);
        let d = diff(&existing, &candidate);
        assert_eq!(d.to_keep, set(&[("b", "2"), ("d", "4")]));
        assert_eq!(d.to_upload, set(&[("a", "1"), ("c", "3"), ("e", "5")]));
    }

    #[test]
    fn conflicting_paths_reported_once() {
        let s = set(&[("a", "1"), ("b", "2"), ("a", "9"), ("a", "8"), ("b", "2")]);
        assert_eq!(s.conflicting_paths(), vec!["a".to_string()]);
    }

    #[test]
    fn dedup_keeps_last_occurrence() {
        let s = set(&[("a", "1"), ("b", "2"), ("a", "9"), ("c", "3")]);
        let d = s.dedup_last_wins();
        assert_eq!(d, set(&[("b", "2"), ("a", "9"), ("c", "3")]));
        assert!(d.conflicting_paths().is_empty());
    }

    #[test]
    fn total_size_sums() {
        let s = set(&[("a", "123"), ("b", "45")]);
        assert_eq!(s.total_size(), 5);
    }

    fn arb_set() -> impl Strategy<Value = ResourceSet> {
        prop::collection::vec((0u8..6, 0u8..3), 0..12).prop_map(|items| {
            items
                .into_iter()
                .map(|(p, f)| res(&format!("file{p}"), &format!("fp{f}")))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn diff_partitions_candidate(existing in arb_set(), candidate in arb_set()) {
            let d = diff(&existing, &candidate);

            // Every candidate lands in exactly one side.
            prop_assert_eq!(d.to_keep.len() + d.to_upload.len(), candidate.len());

            for r in &d.to_keep {
                prop_assert!(existing.contains_key(&r.path, &r.fingerprint));
            }
            for r in &d.to_upload {
                prop_assert!(!existing.contains_key(&r.path, &r.fingerprint));
            }

            // Interleaving both sides by candidate order reproduces it.
            let mut keep = d.to_keep.iter();
            let mut upload = d.to_upload.iter();
            for r in &candidate {
                let side = if existing.contains_key(&r.path, &r.fingerprint) {
                    keep.next()
                } else {
                    upload.next()
                };
                prop_assert_eq!(side, Some(r));
            }
        }
    }
}
