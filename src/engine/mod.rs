//! Container engine abstraction: build, pull, push and tag primitives

pub mod docker;

use crate::image::reference::ImageReference;
use crate::project::ServiceDescriptor;
use crate::{DragError, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

pub use docker::DockerCli;

/// Oldest engine API that accepts platform-targeted pulls
pub const MIN_PLATFORM_PULL_API: ApiVersion = ApiVersion { major: 1, minor: 35 };

/// Operations drag needs from the container engine
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Engine API version (e.g. 1.41)
    async fn api_version(&self) -> Result<ApiVersion>;

    /// Build `service` from its local context, tagged as `image`
    async fn build(&self, service: &ServiceDescriptor, image: &ImageReference) -> Result<()>;

    async fn pull(&self, image: &ImageReference, platform: Option<&str>) -> Result<()>;

    async fn push(&self, image: &ImageReference) -> Result<()>;

    /// Add `target` as another name for the local image `source`
    async fn tag(&self, source: &ImageReference, target: &str) -> Result<()>;
}

/// Engine API version, compared numerically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub fn supports_platform_pull(&self) -> bool {
        *self >= MIN_PLATFORM_PULL_API
    }
}

impl FromStr for ApiVersion {
    type Err = DragError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DragError::Engine(format!("Invalid API version: {:?}", s));
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
