//! Registry tag listing through the gcloud CLI

use crate::image::reference::ImageReference;
use crate::{DragError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Answers which tags a registry repository currently publishes
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Every `repository:tag` and `repository@digest` published under `repository`
    async fn list_tags(&self, repository: &str) -> Result<BTreeSet<String>>;

    /// Whether `reference` is published; one listing per call
    async fn exists(&self, reference: &ImageReference) -> Result<bool> {
        let tags = self.list_tags(&reference.repository).await?;
        Ok(tags.contains(&reference.full_name()))
    }
}

/// One entry of `gcloud container images list-tags --format=json`
#[derive(Debug, Deserialize)]
struct ListedImage {
    digest: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Lists tags of Google Container/Artifact Registry repositories
pub struct GcloudRegistry {
    gcloud: PathBuf,
}

impl GcloudRegistry {
    pub fn new() -> Self {
        Self::with_binary("gcloud")
    }

    pub fn with_binary(gcloud: impl Into<PathBuf>) -> Self {
        Self {
            gcloud: gcloud.into(),
        }
    }
}

impl Default for GcloudRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryClient for GcloudRegistry {
    async fn list_tags(&self, repository: &str) -> Result<BTreeSet<String>> {
        let failed = |reason: String| DragError::RegistryQueryFailed {
            repository: repository.to_string(),
            reason,
        };

        debug!("Listing tags of {}", repository);
        let output = Command::new(&self.gcloud)
            .args(["container", "images", "list-tags", repository, "--format=json"])
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| failed(format!("cannot run {}: {}", self.gcloud.display(), e)))?;

        if !output.status.success() {
            return Err(failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_listing(repository, &output.stdout).map_err(|e| failed(e.to_string()))
    }
}

/// Flatten a JSON listing into `repository:tag` and `repository@digest` names
fn parse_listing(repository: &str, json: &[u8]) -> serde_json::Result<BTreeSet<String>> {
    let images: Vec<ListedImage> = serde_json::from_slice(json)?;
    let mut names = BTreeSet::new();
    for image in images {
        if let Some(digest) = image.digest {
            names.insert(format!("{}@{}", repository, digest));
        }
        names.extend(image.tags.into_iter().map(|tag| format!("{}:{}", repository, tag)));
    }
    Ok(names)
}
