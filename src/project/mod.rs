//! Compose project model: services, build contexts and dependency order

pub mod compose;

use crate::{DragError, Result};
use compose::{BuildSection, ComposeFile, ComposeService};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Compose file names probed when none is given, in order
pub const DEFAULT_COMPOSE_FILES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Local build instructions for a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    /// Absolute, normalised build context directory
    pub context: PathBuf,
    /// Dockerfile path relative to the context
    pub dockerfile: Option<String>,
    pub args: BTreeMap<String, String>,
    pub target: Option<String>,
}

/// One buildable or pullable unit of the project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub build: Option<BuildSpec>,
    /// Explicitly pinned image reference
    pub image: Option<String>,
    pub platform: Option<String>,
    pub dependencies: BTreeSet<String>,
}

impl ServiceDescriptor {
    /// Service with a local build context
    pub fn buildable(name: &str, context: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            build: Some(BuildSpec {
                context: context.into(),
                dockerfile: None,
                args: BTreeMap::new(),
                target: None,
            }),
            image: None,
            platform: None,
            dependencies: BTreeSet::new(),
        }
    }

    /// Service that only references a pre-built image
    pub fn from_image(name: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            build: None,
            image: Some(image.to_string()),
            platform: None,
            dependencies: BTreeSet::new(),
        }
    }

    pub fn with_dependency(mut self, name: &str) -> Self {
        self.dependencies.insert(name.to_string());
        self
    }

    pub fn with_platform(mut self, platform: &str) -> Self {
        self.platform = Some(platform.to_string());
        self
    }

    pub fn with_image(mut self, image: &str) -> Self {
        self.image = Some(image.to_string());
        self
    }

    pub fn can_be_built(&self) -> bool {
        self.build.is_some()
    }

    pub fn context(&self) -> Option<&Path> {
        self.build.as_ref().map(|b| b.context.as_path())
    }
}

/// A loaded compose project
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    /// Directory the project is operated from; relative contexts hang off it
    pub working_dir: PathBuf,
    pub services: Vec<ServiceDescriptor>,
}

impl Project {
    pub fn new(name: &str, working_dir: impl Into<PathBuf>, services: Vec<ServiceDescriptor>) -> Self {
        Self {
            name: normalize_project_name(name),
            working_dir: working_dir.into(),
            services,
        }
    }

    /// Locate the compose file: explicit path, or the first default name present
    pub fn find_compose_file(working_dir: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            let path = working_dir.join(path);
            if !path.is_file() {
                return Err(DragError::Config(format!(
                    "Compose file not found: {}",
                    path.display()
                )));
            }
            return Ok(path);
        }

        DEFAULT_COMPOSE_FILES
            .iter()
            .map(|name| working_dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                DragError::Config(format!(
                    "Can't find a suitable configuration file in {}. Supported filenames: {}",
                    working_dir.display(),
                    DEFAULT_COMPOSE_FILES.join(", ")
                ))
            })
    }

    /// Load a project from a compose file
    pub fn load(compose_path: &Path, working_dir: &Path, name: Option<&str>) -> Result<Self> {
        let content = fs::read_to_string(compose_path).map_err(|e| {
            DragError::Config(format!("Cannot read {}: {}", compose_path.display(), e))
        })?;
        let base_dir = compose_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| working_dir.to_path_buf());
        let base_dir = absolutize(working_dir, &base_dir);

        let project_name = match name {
            Some(name) => name.to_string(),
            None => base_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        };

        let services = parse_services(&content, &base_dir)?;
        debug!(
            "Loaded {} services from {}",
            services.len(),
            compose_path.display()
        );

        let project = Self::new(&project_name, working_dir, services);
        if project.name.is_empty() {
            return Err(DragError::Config(
                "Project name is empty, pass --project-name".to_string(),
            ));
        }
        Ok(project)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Select services by name (all when `names` is empty), dependencies first
    pub fn select(&self, names: &[String]) -> Result<Vec<ServiceDescriptor>> {
        let mut wanted = BTreeSet::new();
        for name in names {
            if self.service(name).is_none() {
                return Err(DragError::NoSuchService(name.clone()));
            }
            wanted.insert(name.as_str());
        }

        let ordered = self.dependency_order()?;
        Ok(ordered
            .into_iter()
            .filter(|s| wanted.is_empty() || wanted.contains(s.name.as_str()))
            .cloned()
            .collect())
    }

    /// Services sorted so every dependency precedes its dependents.
    /// Ties keep compose file order.
    fn dependency_order(&self) -> Result<Vec<&ServiceDescriptor>> {
        let mut ordered: Vec<&ServiceDescriptor> = Vec::with_capacity(self.services.len());
        let mut placed: BTreeSet<&str> = BTreeSet::new();

        while ordered.len() < self.services.len() {
            let next = self.services.iter().find(|s| {
                !placed.contains(s.name.as_str())
                    && s.dependencies.iter().all(|dep| {
                        placed.contains(dep.as_str()) || self.service(dep).is_none()
                    })
            });

            match next {
                Some(service) => {
                    placed.insert(service.name.as_str());
                    ordered.push(service);
                }
                None => {
                    let stuck: Vec<&str> = self
                        .services
                        .iter()
                        .map(|s| s.name.as_str())
                        .filter(|n| !placed.contains(n))
                        .collect();
                    return Err(DragError::Config(format!(
                        "Circular dependency between services: {}",
                        stuck.join(", ")
                    )));
                }
            }
        }

        Ok(ordered)
    }
}

fn parse_services(content: &str, base_dir: &Path) -> Result<Vec<ServiceDescriptor>> {
    let file: ComposeFile = serde_yaml::from_str(content)?;
    let mut services = Vec::with_capacity(file.services.len());

    for (key, value) in file.services {
        let name = key
            .as_str()
            .ok_or_else(|| DragError::Config("Service names must be strings".to_string()))?
            .to_string();
        let raw: ComposeService = if value.is_null() {
            ComposeService::default()
        } else {
            serde_yaml::from_value(value)
                .map_err(|e| DragError::Config(format!("Service '{}': {}", name, e)))?
        };

        let build = raw.build.map(|section| build_spec(section, base_dir));
        if build.is_none() && raw.image.is_none() {
            return Err(DragError::Config(format!(
                "Service '{}' has neither an image nor a build context specified",
                name
            )));
        }

        services.push(ServiceDescriptor {
            name,
            build,
            image: raw.image,
            platform: raw.platform,
            dependencies: raw
                .depends_on
                .map(|d| d.names().into_iter().collect())
                .unwrap_or_default(),
        });
    }

    Ok(services)
}

fn build_spec(section: BuildSection, base_dir: &Path) -> BuildSpec {
    match section {
        BuildSection::Context(context) => BuildSpec {
            context: absolutize(base_dir, Path::new(&context)),
            dockerfile: None,
            args: BTreeMap::new(),
            target: None,
        },
        BuildSection::Full {
            context,
            dockerfile,
            args,
            target,
        } => BuildSpec {
            context: absolutize(base_dir, Path::new(context.as_deref().unwrap_or("."))),
            dockerfile,
            args: args.map(|a| a.into_pairs()).unwrap_or_default(),
            target,
        },
    }
}

/// Lowercase and drop everything outside `[-_a-z0-9]`
pub fn normalize_project_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_')
        .collect()
}

/// Join `path` onto `base` and fold `.`/`..` lexically
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = base.join(path);
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const COMPOSE: &str = r#"
services:
  worker:
    build:
      context: ./worker
      args:
        MODE: prod
    depends_on:
      - common
  common:
    build: ./common
  redis:
    image: redis:7
  web:
    build: web
    platform: linux/amd64
    depends_on:
      common:
        condition: service_started
"#;

    fn load(dir: &Path) -> Project {
        let path = dir.join("docker-compose.yml");
        fs::write(&path, COMPOSE).unwrap();
        Project::load(&path, dir, None).unwrap()
    }

    #[test]
    fn test_load_services() {
        let tmp = TempDir::new().unwrap();
        let project = load(tmp.path());

        assert_eq!(project.services.len(), 4);
        let worker = project.service("worker").unwrap();
        assert_eq!(worker.context(), Some(tmp.path().join("worker").as_path()));
        assert!(worker.dependencies.contains("common"));
        assert_eq!(worker.build.as_ref().unwrap().args["MODE"], "prod");

        let redis = project.service("redis").unwrap();
        assert!(!redis.can_be_built());
        assert_eq!(redis.image.as_deref(), Some("redis:7"));

        let web = project.service("web").unwrap();
        assert_eq!(web.platform.as_deref(), Some("linux/amd64"));
        assert!(web.dependencies.contains("common"));
    }

    #[test]
    fn test_project_name_from_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("My.Project_1");
        fs::create_dir_all(&dir).unwrap();
        let project = load(&dir);
        assert_eq!(project.name, "myproject_1");
    }

    #[test]
    fn test_project_name_override() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("compose.yml");
        fs::write(&path, COMPOSE).unwrap();
        let project = Project::load(&path, tmp.path(), Some("_-Shop")).unwrap();
        assert_eq!(project.name, "_-shop");
    }

    #[test]
    fn test_select_orders_dependencies_first() {
        let tmp = TempDir::new().unwrap();
        let project = load(tmp.path());

        let names: Vec<String> = project
            .select(&[])
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["common", "worker", "redis", "web"]);

        let subset = project
            .select(&["web".to_string(), "redis".to_string()])
            .unwrap();
        let names: Vec<&str> = subset.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["redis", "web"]);
    }

    #[test]
    fn test_select_unknown_service() {
        let tmp = TempDir::new().unwrap();
        let project = load(tmp.path());
        let err = project.select(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, DragError::NoSuchService(ref n) if n == "nope"));
    }

    #[test]
    fn test_circular_dependency() {
        let project = Project::new(
            "p",
            "/repo",
            vec![
                ServiceDescriptor::buildable("a", "/repo/a").with_dependency("b"),
                ServiceDescriptor::buildable("b", "/repo/b").with_dependency("a"),
            ],
        );
        assert!(matches!(project.select(&[]), Err(DragError::Config(_))));
    }

    #[test]
    fn test_service_without_image_or_build() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("compose.yml");
        fs::write(&path, "services:\n  empty: {}\n").unwrap();
        assert!(matches!(
            Project::load(&path, tmp.path(), None),
            Err(DragError::Config(_))
        ));
    }

    #[test]
    fn test_find_compose_file() {
        let tmp = TempDir::new().unwrap();
        assert!(Project::find_compose_file(tmp.path(), None).is_err());

        fs::write(tmp.path().join("compose.yaml"), "services: {}\n").unwrap();
        let found = Project::find_compose_file(tmp.path(), None).unwrap();
        assert_eq!(found, tmp.path().join("compose.yaml"));

        assert!(Project::find_compose_file(tmp.path(), Some(Path::new("other.yml"))).is_err());
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize(Path::new("/repo/sub"), Path::new("../web/./src")),
            PathBuf::from("/repo/web/src")
        );
    }
}
