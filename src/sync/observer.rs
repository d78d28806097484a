//! Progress reporting for sync runs

use crate::image::reference::ImageReference;
use crate::image::resolve::ResolvedImage;
use crate::sync::report::SyncOutcome;
use tracing::{error, info};

/// Something that happened while syncing a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent<'a> {
    /// Service uses a pre-built image and is left alone
    Skipped { service: &'a str },
    /// Target image computed (or taken from the pinned reference)
    Resolved { resolved: &'a ResolvedImage },
    /// Image found in the registry, pulling it
    Pulling {
        service: &'a str,
        image: &'a ImageReference,
        platform: Option<&'a str>,
    },
    /// Image missing from the registry, building it
    Building {
        service: &'a str,
        image: &'a ImageReference,
    },
    Pushing {
        service: &'a str,
        image: &'a ImageReference,
    },
    Tagging {
        service: &'a str,
        image: &'a ImageReference,
        tag: &'a str,
    },
    Finished {
        service: &'a str,
        outcome: &'a SyncOutcome,
    },
}

/// Receives sync progress; shared between workers
pub trait SyncObserver: Send + Sync {
    fn notify(&self, event: SyncEvent<'_>);
}

/// Writes sync progress as `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl SyncObserver for LogObserver {
    fn notify(&self, event: SyncEvent<'_>) {
        match event {
            SyncEvent::Skipped { service } => info!("{} uses an image, skipping", service),
            SyncEvent::Resolved { resolved } => info!(
                "Service ({}) docker image should be ({})",
                resolved.service, resolved.reference
            ),
            SyncEvent::Pulling {
                service,
                image,
                platform,
            } => match platform {
                Some(platform) => info!(
                    "Found {} already present, pulling {} for {}",
                    image, service, platform
                ),
                None => info!("Found {} already present, pulling {}", image, service),
            },
            SyncEvent::Building { service, image } => {
                info!("Image not found {}, building {} on the fly", image, service)
            }
            SyncEvent::Pushing { image, .. } => {
                info!("Pushing image {} as it is freshly built", image)
            }
            SyncEvent::Tagging { image, tag, .. } => info!("Tagging {} with ({})...", image, tag),
            SyncEvent::Finished { service, outcome } => match outcome {
                SyncOutcome::Failed(reason) => error!("{}: {}", service, reason),
                other => info!("{}: {}", service, other),
            },
        }
    }
}
