use serde::{Deserialize, Serialize};

/// Default permission bits for files whose mode cannot be read.
pub const DEFAULT_MODE: u32 = 0o644;

/// One file of an application bundle.
///
/// Two resources with the same `path` and `fingerprint` are
/// interchangeable: the fingerprint is a pure function of the content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    /// Relative path inside the bundle, forward slashes.
    pub path: String,
    /// Lowercase hex SHA-256 of the file content.
    pub fingerprint: String,
    /// Size in bytes.
    pub size: u64,
    /// Permission bits, serialized as an octal string (`"644"`).
    #[serde(with = "octal_mode", default = "default_mode")]
    pub mode: u32,
}

fn default_mode() -> u32 {
    DEFAULT_MODE
}

impl Resource {
    pub fn new(
        path: impl Into<String>,
        fingerprint: impl Into<String>,
        size: u64,
        mode: u32,
    ) -> Self {
        Self {
            path: path.into(),
            fingerprint: fingerprint.into(),
            size,
            mode,
        }
    }

    /// Identity used for diffing: `(path, fingerprint)`.
    pub fn key(&self) -> (&str, &str) {
        (&self.path, &self.fingerprint)
    }
}

/// Serializes permission bits as an octal string, matching what the
/// control plane sends and expects (`"755"`, `"644"`).
mod octal_mode {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(mode: &u32, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("{:o}", mode & 0o7777))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let s = String::deserialize(d)?;
        u32::from_str_radix(&s, 8).map_err(serde::de::Error::custom)
    }
}
