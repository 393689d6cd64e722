//! Key Module
//!
//! Hierarchical key paths and the namespaced storage keys derived from them.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::driver::KEY_DELIMITER;

// == Key Path ==
/// An ordered sequence of key segments, like a filesystem path.
///
/// The empty path is the root and addresses every key in a namespace.
/// Segments are assumed not to contain [`KEY_DELIMITER`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    // == Constructor ==
    /// Creates a path from any sequence of string-like segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    // == Parse ==
    /// Parses a slash separated path such as `users/42/profile`.
    ///
    /// Empty pieces are dropped, so `""` and `"/"` both parse to the root.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split('/').filter(|piece| !piece.is_empty()))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl<S: Into<String>> FromIterator<S> for KeyPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// == Key Builder ==
/// Derives storage keys from key paths for one driver instance.
///
/// A key reads `prefix::namespace::seg1::...::segN::`. The prefix is a digest
/// of the install id and the driver tag, so two deployments or two driver
/// types sharing one physical store never collide. The trailing delimiter
/// makes every key double as the scan prefix of its own subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: String,
    namespace: String,
}

impl KeyBuilder {
    // == Constructor ==
    pub fn new(install_id: &str, driver_tag: &str, namespace: impl Into<String>) -> Self {
        Self {
            prefix: install_prefix(install_id, driver_tag),
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // == Build ==
    /// Builds the canonical storage key for `path`.
    pub fn build(&self, path: &KeyPath) -> String {
        let mut key = String::with_capacity(self.prefix.len() + self.namespace.len() + 16);
        for part in self.components(path) {
            key.push_str(part);
            key.push_str(KEY_DELIMITER);
        }
        key
    }

    /// Prefix matched by every key stored at or below `path`.
    pub fn prefix_of(&self, path: &KeyPath) -> String {
        self.build(path)
    }

    // == Components ==
    /// The ordered parts of a storage key, for tree-shaped backends.
    pub fn components<'a>(&'a self, path: &'a KeyPath) -> impl Iterator<Item = &'a str> + 'a {
        [self.prefix.as_str(), self.namespace.as_str()]
            .into_iter()
            .chain(path.segments().iter().map(String::as_str))
    }
}

/// Short hex digest of `install_id:driver_tag`.
pub fn install_prefix(install_id: &str, driver_tag: &str) -> String {
    let digest = hex_digest(&format!("{}:{}", install_id, driver_tag));
    digest[..16].to_string()
}

/// Full lowercase hex SHA-256 of `input`.
pub fn hex_digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
