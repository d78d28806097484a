//! Container engine backed by the `docker` CLI

use crate::engine::{ApiVersion, ContainerEngine};
use crate::image::reference::ImageReference;
use crate::project::ServiceDescriptor;
use crate::{DragError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::debug;

/// Lines of stderr kept for error messages
const STDERR_TAIL: usize = 20;

/// Drives builds, pulls, pushes and tags through the docker binary
pub struct DockerCli {
    docker: PathBuf,
    api_version: OnceCell<ApiVersion>,
}

impl DockerCli {
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    pub fn with_binary(docker: impl Into<PathBuf>) -> Self {
        Self {
            docker: docker.into(),
            api_version: OnceCell::new(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.docker);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Run `cmd`, echoing its output prefixed with `label`.
    /// Returns the stderr tail as the error on failure.
    async fn run_streaming(
        &self,
        mut cmd: Command,
        label: &str,
    ) -> std::result::Result<(), String> {
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("cannot run {}: {}", self.docker.display(), e))?;

        let stdout = child.stdout.take();
        let prefix = label.to_string();
        let echo = tokio::spawn(async move {
            if let Some(stdout) = stdout {
                let mut reader = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    println!("{} | {}", prefix, line);
                }
            }
        });

        let mut tail = VecDeque::with_capacity(STDERR_TAIL);
        if let Some(stderr) = child.stderr.take() {
            let mut reader = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                eprintln!("{} | {}", label, line);
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }

        let status = child.wait().await.map_err(|e| e.to_string())?;
        let _ = echo.await;

        if status.success() {
            Ok(())
        } else {
            let detail = tail.into_iter().collect::<Vec<_>>().join("\n");
            Err(if detail.is_empty() {
                format!("exited with {}", status)
            } else {
                detail
            })
        }
    }

    /// Run `cmd` to completion and return its trimmed stdout
    async fn run_captured(&self, mut cmd: Command) -> Result<String> {
        let output = cmd
            .output()
            .await
            .map_err(|e| DragError::Engine(format!("cannot run {}: {}", self.docker.display(), e)))?;
        if !output.status.success() {
            return Err(DragError::Engine(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn api_version(&self) -> Result<ApiVersion> {
        let version = self
            .api_version
            .get_or_try_init(|| async {
                let mut cmd = self.command();
                cmd.args(["version", "--format", "{{.Server.APIVersion}}"]);
                let raw = self.run_captured(cmd).await?;
                debug!("Docker API version {}", raw);
                raw.parse::<ApiVersion>()
            })
            .await?;
        Ok(*version)
    }

    async fn build(&self, service: &ServiceDescriptor, image: &ImageReference) -> Result<()> {
        let spec = service.build.as_ref().ok_or_else(|| DragError::BuildFailed {
            service: service.name.clone(),
            reason: "no build context".to_string(),
        })?;

        let mut cmd = self.command();
        cmd.arg("build").arg("--tag").arg(image.full_name());
        if let Some(dockerfile) = &spec.dockerfile {
            cmd.arg("--file").arg(spec.context.join(dockerfile));
        }
        for (key, value) in &spec.args {
            cmd.arg("--build-arg").arg(format!("{}={}", key, value));
        }
        if let Some(target) = &spec.target {
            cmd.arg("--target").arg(target);
        }
        if let Some(platform) = &service.platform {
            cmd.arg("--platform").arg(platform);
        }
        cmd.arg(&spec.context);

        self.run_streaming(cmd, &service.name)
            .await
            .map_err(|reason| DragError::BuildFailed {
                service: service.name.clone(),
                reason,
            })
    }

    async fn pull(&self, image: &ImageReference, platform: Option<&str>) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("pull");
        if let Some(platform) = platform {
            cmd.arg("--platform").arg(platform);
        }
        cmd.arg(image.full_name());

        self.run_streaming(cmd, &image.full_name())
            .await
            .map_err(|reason| DragError::PullFailed {
                image: image.full_name(),
                reason,
            })
    }

    async fn push(&self, image: &ImageReference) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("push").arg(image.full_name());

        self.run_streaming(cmd, &image.full_name())
            .await
            .map_err(|reason| DragError::PushFailed {
                image: image.full_name(),
                reason,
            })
    }

    async fn tag(&self, source: &ImageReference, target: &str) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("tag").arg(source.full_name()).arg(target);

        self.run_captured(cmd)
            .await
            .map(|_| ())
            .map_err(|e| DragError::TagFailed {
                source_image: source.full_name(),
                target: target.to_string(),
                reason: match e {
                    DragError::Engine(reason) => reason,
                    other => other.to_string(),
                },
            })
    }
}
