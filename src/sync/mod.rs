//! Sync orchestration: pull content-addressed images or build and push them
//!
//! For every buildable service the target image is resolved from git
//! content hashes. If the registry already publishes that tag the image is
//! pulled, otherwise it is built locally and optionally pushed. Either way
//! the local image is then tagged `<service>:latest` and `<project>:latest`.
//!
//! Services are independent: one failing never stops the others, and all
//! failures are collected into the returned [`SyncReport`].

pub mod observer;
pub mod pool;
pub mod report;

use crate::engine::{ContainerEngine, MIN_PLATFORM_PULL_API};
use crate::image::hash::ContentHasher;
use crate::image::reference::{ImageReference, RegistryBase};
use crate::image::registry::RegistryClient;
use crate::image::resolve::ImageResolver;
use crate::project::{Project, ServiceDescriptor};
use crate::{DragError, Result};
use observer::{LogObserver, SyncEvent, SyncObserver};
use pool::WorkerPool;
use report::{SyncOutcome, SyncReport};
use std::sync::Arc;
use tracing::debug;

pub use pool::DEFAULT_LIMIT;

/// Knobs for one sync invocation
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub registry: RegistryBase,
    /// Push images that had to be built
    pub push: bool,
    /// Use the worker pool; `false` processes services one by one in order
    pub parallel: bool,
    /// Worker pool size
    pub limit: usize,
}

/// Orchestrates pull-or-build across a set of services
pub struct Synchronizer {
    engine: Arc<dyn ContainerEngine>,
    registry: Arc<dyn RegistryClient>,
    hasher: Arc<dyn ContentHasher>,
    observer: Arc<dyn SyncObserver>,
    options: SyncOptions,
}

impl Synchronizer {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        registry: Arc<dyn RegistryClient>,
        hasher: Arc<dyn ContentHasher>,
        options: SyncOptions,
    ) -> Self {
        Self {
            engine,
            registry,
            hasher,
            observer: Arc::new(LogObserver),
            options,
        }
    }

    /// Replace the default logging observer
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sync `services` of `project`.
    ///
    /// Per-service failures are recorded in the report, not returned; use
    /// [`SyncReport::into_result`] to turn them into one `SyncFailure`.
    pub async fn sync(
        &self,
        project: &Project,
        services: &[ServiceDescriptor],
    ) -> Result<SyncReport> {
        let mut report = SyncReport::new();
        let mut syncable = Vec::with_capacity(services.len());
        for service in services {
            if service.can_be_built() {
                syncable.push(service.clone());
            } else {
                self.observer.notify(SyncEvent::Skipped {
                    service: &service.name,
                });
                report.record(&service.name, SyncOutcome::Skipped);
            }
        }

        let context = Arc::new(ServiceSync {
            resolver: ImageResolver::new(
                self.hasher.clone(),
                self.options.registry.clone(),
                project,
            ),
            engine: self.engine.clone(),
            registry: self.registry.clone(),
            observer: self.observer.clone(),
            push: self.options.push,
            project_tag: project_tag(&project.name)?,
        });

        if self.options.parallel {
            let pool = WorkerPool::new(self.options.limit);
            debug!(
                "Syncing {} services with {} workers",
                syncable.len(),
                pool.limit()
            );
            let results = pool
                .run(syncable, move |service| sync_isolated(context.clone(), service))
                .await?;
            for (name, outcome) in results {
                report.record(name, outcome);
            }
        } else {
            for service in syncable {
                let (name, outcome) = sync_isolated(context.clone(), service).await;
                report.record(name, outcome);
            }
        }

        Ok(report)
    }
}

/// `<project>:latest` with leading `_`/`-` stripped from the project name
pub fn project_tag(project_name: &str) -> Result<String> {
    let name = project_name.trim_start_matches(|c: char| c == '_' || c == '-');
    if name.is_empty() {
        return Err(DragError::Config(format!(
            "Project name {:?} cannot be used as an image tag",
            project_name
        )));
    }
    Ok(format!("{}:latest", name))
}

/// Sync one service on its own task so a panic fails only that service
async fn sync_isolated(context: Arc<ServiceSync>, service: ServiceDescriptor) -> (String, SyncOutcome) {
    let name = service.name.clone();
    let outcome = match tokio::spawn(async move { context.sync_service(&service).await }).await {
        Ok(outcome) => outcome,
        Err(e) => SyncOutcome::Failed(format!("Sync of service '{}' aborted: {}", name, e)),
    };
    (name, outcome)
}

/// Everything a worker needs to sync one service
struct ServiceSync {
    resolver: ImageResolver,
    engine: Arc<dyn ContainerEngine>,
    registry: Arc<dyn RegistryClient>,
    observer: Arc<dyn SyncObserver>,
    push: bool,
    project_tag: String,
}

impl ServiceSync {
    async fn sync_service(&self, service: &ServiceDescriptor) -> SyncOutcome {
        let outcome = self
            .process_service(service)
            .await
            .unwrap_or_else(|e| SyncOutcome::Failed(e.to_string()));
        self.observer.notify(SyncEvent::Finished {
            service: &service.name,
            outcome: &outcome,
        });
        outcome
    }

    async fn process_service(&self, service: &ServiceDescriptor) -> Result<SyncOutcome> {
        let resolved = self.resolver.target(service).await?;
        self.observer.notify(SyncEvent::Resolved {
            resolved: &resolved,
        });
        let image = resolved.reference;

        let platform = service.platform.as_deref();
        if platform.is_some() {
            let version = self.engine.api_version().await?;
            if !version.supports_platform_pull() {
                return Err(DragError::UnsupportedOperation(format!(
                    "Impossible to perform platform-targeted pulls for API version < {} (engine reports {})",
                    MIN_PLATFORM_PULL_API, version
                )));
            }
        }

        let outcome = if self.registry.exists(&image).await? {
            self.observer.notify(SyncEvent::Pulling {
                service: &service.name,
                image: &image,
                platform,
            });
            self.engine.pull(&image, platform).await?;
            SyncOutcome::Pulled
        } else if image.digest.is_some() {
            return Err(DragError::Config(format!(
                "Service '{}' pins {} by digest, which the registry does not publish",
                service.name, image
            )));
        } else {
            self.observer.notify(SyncEvent::Building {
                service: &service.name,
                image: &image,
            });
            self.engine.build(service, &image).await?;
            if self.push {
                self.observer.notify(SyncEvent::Pushing {
                    service: &service.name,
                    image: &image,
                });
                self.engine.push(&image).await?;
                SyncOutcome::BuiltAndPushed
            } else {
                SyncOutcome::Built
            }
        };

        self.tag_with_latest(service, &image).await?;
        Ok(outcome)
    }

    async fn tag_with_latest(&self, service: &ServiceDescriptor, image: &ImageReference) -> Result<()> {
        let service_tag = format!("{}:latest", service.name);
        for tag in [service_tag.as_str(), self.project_tag.as_str()] {
            self.observer.notify(SyncEvent::Tagging {
                service: &service.name,
                image,
                tag,
            });
            self.engine.tag(image, tag).await?;
        }
        Ok(())
    }
}
