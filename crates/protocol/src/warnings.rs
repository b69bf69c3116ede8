//! Advisory warnings and the per-call [`Outcome`].
//!
//! Every remote call yields its primary result together with the warnings
//! the control plane attached to the response. Callers merge those warnings
//! into a running [`Warnings`] *before* looking at the error, so a failing
//! call still contributes its warnings (e.g. a deprecation notice that
//! accompanies a failure).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered, append-only list of advisory messages.
///
/// Never deduplicated: order reflects the order calls were issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Warnings(Vec<String>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: impl Into<String>) {
        self.0.push(warning.into());
    }

    /// Appends all of `other`, preserving its order.
    pub fn append(&mut self, other: Warnings) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Warnings {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for Warnings {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for Warnings {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Warnings {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<String>> for Warnings {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}

impl fmt::Display for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, w) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(w)?;
        }
        Ok(())
    }
}

/// Result of one remote call: the value (or error) plus its warnings.
#[derive(Debug)]
#[must_use = "an Outcome carries warnings that must be merged"]
pub struct Outcome<T, E> {
    pub value: Result<T, E>,
    pub warnings: Warnings,
}

impl<T, E> Outcome<T, E> {
    pub fn new(value: Result<T, E>, warnings: Warnings) -> Self {
        Self { value, warnings }
    }

    pub fn ok(value: T, warnings: Warnings) -> Self {
        Self::new(Ok(value), warnings)
    }

    pub fn err(error: E, warnings: Warnings) -> Self {
        Self::new(Err(error), warnings)
    }

    /// Appends this call's warnings to `acc`, then yields the result.
    pub fn merge_into(self, acc: &mut Warnings) -> Result<T, E> {
        acc.append(self.warnings);
        self.value
    }

    /// Maps the success value, keeping the warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U, E> {
        Outcome::new(self.value.map(f), self.warnings)
    }

    /// Maps the error, keeping the warnings.
    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Outcome<T, F> {
        Outcome::new(self.value.map_err(f), self.warnings)
    }

    /// Splits into `(result, warnings)`.
    pub fn into_parts(self) -> (Result<T, E>, Warnings) {
        (self.value, self.warnings)
    }

    pub fn is_ok(&self) -> bool {
        self.value.is_ok()
    }

    pub fn is_err(&self) -> bool {
        self.value.is_err()
    }
}
