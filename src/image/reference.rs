//! Image reference and registry base types

use crate::{DragError, Result};
use std::fmt;

/// A `repository[:tag][@digest]` image reference
///
/// The repository keeps its registry host verbatim (`asia.gcr.io/proj/web`),
/// since that is the form both the registry listing and the engine expect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    /// Repository including registry host
    pub repository: String,
    /// Tag, `latest` when the reference names none
    pub tag: String,
    /// Digest (optional, e.g., "sha256:...")
    pub digest: Option<String>,
}

impl ImageReference {
    /// Build a reference from its parts
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
            digest: None,
        }
    }

    /// Parse an image reference string
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(DragError::InvalidImageRef(
                "Empty image reference".to_string(),
            ));
        }

        let (without_digest, digest) = match reference.split_once('@') {
            Some((_, "")) => return Err(DragError::InvalidImageRef(reference.to_string())),
            Some((name, digest)) => (name, Some(digest.to_string())),
            None => (reference, None),
        };

        // A colon followed by a slash belongs to a registry port, not a tag
        let (repository, tag) = match without_digest.rsplit_once(':') {
            Some((repo, tag)) if !tag.contains('/') => (repo, tag),
            _ => (without_digest, "latest"),
        };

        if repository.is_empty() || tag.is_empty() {
            return Err(DragError::InvalidImageRef(reference.to_string()));
        }

        Ok(Self {
            repository: repository.to_string(),
            tag: tag.to_string(),
            digest,
        })
    }

    /// Name the engine and registry know the image by.
    ///
    /// A digest pins the content, so it replaces the tag: `repo@sha256:...`.
    pub fn full_name(&self) -> String {
        match &self.digest {
            Some(digest) => format!("{}@{}", self.repository, digest),
            None => format!("{}:{}", self.repository, self.tag),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Registry root under which every service repository is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryBase(String);

impl RegistryBase {
    pub fn parse(base: &str) -> Result<Self> {
        let base = base.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(DragError::Config(
                "--repo must be a docker repository base url".to_string(),
            ));
        }
        if base.contains('@') || base.contains(char::is_whitespace) {
            return Err(DragError::Config(format!(
                "--repo is not a valid repository base: {}",
                base
            )));
        }
        Ok(Self(base.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Repository path for a service repository under this base
    pub fn repository(&self, repo_name: &str) -> String {
        format!("{}/{}", self.0, repo_name)
    }
}

impl fmt::Display for RegistryBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
