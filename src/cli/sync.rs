//! `drag sync` command implementation

use crate::cli::ProjectArgs;
use crate::engine::DockerCli;
use crate::image::hash::GitSubtreeHasher;
use crate::image::reference::RegistryBase;
use crate::image::registry::GcloudRegistry;
use crate::sync::{SyncOptions, Synchronizer, DEFAULT_LIMIT};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Arguments for the `sync` command
#[derive(Args)]
pub struct SyncArgs {
    /// Registry base the service repositories live under (e.g. asia.gcr.io/my-project)
    #[arg(long, value_name = "REPO")]
    pub repo: Option<String>,

    /// Push freshly built images
    #[arg(long)]
    pub push: bool,

    /// Disable parallel operations
    #[arg(long)]
    pub disable_parallel: bool,

    /// Maximum number of services synced at once
    #[arg(long, value_name = "N", default_value_t = DEFAULT_LIMIT, value_parser = parse_limit)]
    pub parallel_limit: usize,

    /// Docker binary
    #[arg(long, env = "DRAG_DOCKER", default_value = "docker")]
    pub docker_bin: PathBuf,

    /// gcloud binary used to list registry tags
    #[arg(long, env = "DRAG_GCLOUD", default_value = "gcloud")]
    pub gcloud_bin: PathBuf,

    /// git binary used to hash build contexts
    #[arg(long, env = "DRAG_GIT", default_value = "git")]
    pub git_bin: PathBuf,

    /// Services to sync (default: all)
    #[arg(value_name = "SERVICES")]
    pub services: Vec<String>,
}

fn parse_limit(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Execute the `sync` command
pub async fn execute(args: SyncArgs, project_args: &ProjectArgs) -> anyhow::Result<()> {
    let Some(repo) = args.repo.as_deref() else {
        anyhow::bail!("--repo is required and must be a docker repository base url");
    };
    let registry_base = RegistryBase::parse(repo)?;

    let project = project_args.load()?;
    let services = project.select(&args.services)?;

    let options = SyncOptions {
        registry: registry_base,
        push: args.push,
        parallel: !args.disable_parallel,
        limit: args.parallel_limit,
    };
    let synchronizer = Synchronizer::new(
        Arc::new(DockerCli::with_binary(&args.docker_bin)),
        Arc::new(GcloudRegistry::with_binary(&args.gcloud_bin)),
        Arc::new(GitSubtreeHasher::with_binary(
            &args.git_bin,
            &project.working_dir,
        )),
        options,
    );

    let report = synchronizer.sync(&project, &services).await?.into_result()?;
    info!(
        "Synced {} services of project {}",
        report.outcomes().len(),
        project.name
    );

    Ok(())
}
