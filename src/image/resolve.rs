//! Derives the content-addressed image reference of a service

use crate::image::hash::ContentHasher;
use crate::image::reference::{ImageReference, RegistryBase};
use crate::project::{absolutize, Project, ServiceDescriptor};
use crate::{DragError, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Dependency whose content hash is folded into its dependents' tags
pub const COMMON_SERVICE: &str = "common";

/// Image name computed for a service, never written back to the descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub service: String,
    pub reference: ImageReference,
}

/// Builds `registry/repo:subtree[-common]` references
pub struct ImageResolver {
    hasher: Arc<dyn ContentHasher>,
    registry: RegistryBase,
    working_dir: PathBuf,
    common_path: PathBuf,
}

impl ImageResolver {
    pub fn new(hasher: Arc<dyn ContentHasher>, registry: RegistryBase, project: &Project) -> Self {
        let working_dir = project.working_dir.clone();
        let common_path = project
            .service(COMMON_SERVICE)
            .and_then(|s| s.context())
            .map(|ctx| relative_context(&working_dir, ctx))
            .unwrap_or_else(|| PathBuf::from(COMMON_SERVICE));

        Self {
            hasher,
            registry,
            working_dir,
            common_path,
        }
    }

    /// Repository name of a buildable service: last segment of its context
    pub fn repository_name(&self, service: &ServiceDescriptor) -> Result<String> {
        let context = service.context().map(|ctx| absolutize(&self.working_dir, ctx));
        context.as_deref().and_then(repository_name).ok_or_else(|| {
            DragError::Config(format!(
                "Service '{}' has a build context without a directory name",
                service.name
            ))
        })
    }

    /// Target image of a service: its pinned `image:` when set, resolved otherwise
    pub async fn target(&self, service: &ServiceDescriptor) -> Result<ResolvedImage> {
        match &service.image {
            Some(pinned) => Ok(ResolvedImage {
                service: service.name.clone(),
                reference: ImageReference::parse(pinned)?,
            }),
            None => self.resolve(service).await,
        }
    }

    /// Resolve the image reference for a buildable service
    pub async fn resolve(&self, service: &ServiceDescriptor) -> Result<ResolvedImage> {
        let context = self.context_of(service)?;
        let repo_name = self.repository_name(service)?;
        let subtree_hash = self.hasher.hash(&context).await?;

        let tag = if service.dependencies.contains(COMMON_SERVICE) {
            let common_hash = self.hasher.hash(&self.common_path).await?;
            format!("{}-{}", subtree_hash, common_hash)
        } else {
            subtree_hash
        };

        Ok(ResolvedImage {
            service: service.name.clone(),
            reference: ImageReference::new(self.registry.repository(&repo_name), tag),
        })
    }

    fn context_of(&self, service: &ServiceDescriptor) -> Result<PathBuf> {
        service
            .context()
            .map(|ctx| relative_context(&self.working_dir, ctx))
            .ok_or_else(|| {
                DragError::Config(format!("Service '{}' has no build context", service.name))
            })
    }
}

/// Context path relative to the working directory, climbing with `..` when
/// the context lives outside it. Mixed relative/absolute input is returned as is.
pub fn relative_context(working_dir: &Path, context: &Path) -> PathBuf {
    if working_dir.is_absolute() != context.is_absolute() {
        return context.to_path_buf();
    }

    let mut base = working_dir.components().filter(|c| *c != Component::CurDir).peekable();
    let mut target = context.components().filter(|c| *c != Component::CurDir).peekable();
    loop {
        match (base.peek(), target.peek()) {
            (Some(a), Some(b)) if a == b => {}
            _ => break,
        }
        base.next();
        target.next();
    }

    let mut relative: PathBuf = base.map(|_| Component::ParentDir).collect();
    relative.extend(target);
    relative
}

fn repository_name(context: &Path) -> Option<String> {
    context
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
}
