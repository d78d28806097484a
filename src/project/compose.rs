//! Compose file schema (the subset drag reads)

use serde::Deserialize;
use std::collections::BTreeMap;

/// Top level of a compose file
#[derive(Debug, Deserialize)]
pub struct ComposeFile {
    #[serde(default)]
    pub services: serde_yaml::Mapping,
}

/// A single entry under `services:`
#[derive(Debug, Default, Deserialize)]
pub struct ComposeService {
    pub build: Option<BuildSection>,
    pub image: Option<String>,
    pub platform: Option<String>,
    #[serde(default)]
    pub depends_on: Option<DependsOn>,
}

/// `build:` is either a bare context path or a full section
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BuildSection {
    Context(String),
    Full {
        context: Option<String>,
        dockerfile: Option<String>,
        #[serde(default)]
        args: Option<BuildArgs>,
        target: Option<String>,
    },
}

/// Build args as a map or as a `KEY=VALUE` list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BuildArgs {
    Map(BTreeMap<String, Option<serde_yaml::Value>>),
    List(Vec<String>),
}

impl BuildArgs {
    /// Flatten into `(key, value)` pairs; keys without a value are dropped
    pub fn into_pairs(self) -> BTreeMap<String, String> {
        match self {
            BuildArgs::Map(map) => map
                .into_iter()
                .filter_map(|(k, v)| match v? {
                    serde_yaml::Value::String(s) => Some((k, s)),
                    serde_yaml::Value::Number(n) => Some((k, n.to_string())),
                    serde_yaml::Value::Bool(b) => Some((k, b.to_string())),
                    _ => None,
                })
                .collect(),
            BuildArgs::List(list) => list
                .iter()
                .filter_map(|arg| {
                    arg.split_once('=')
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                })
                .collect(),
        }
    }
}

/// `depends_on:` short (list) or long (mapping) syntax
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    List(Vec<String>),
    Map(BTreeMap<String, serde_yaml::Value>),
}

impl DependsOn {
    pub fn names(self) -> Vec<String> {
        match self {
            DependsOn::List(list) => list,
            DependsOn::Map(map) => map.into_keys().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_forms() {
        let short: ComposeService = serde_yaml::from_str("build: ./web").unwrap();
        assert!(matches!(short.build, Some(BuildSection::Context(ref c)) if c == "./web"));

        let full: ComposeService = serde_yaml::from_str(
            "build:\n  context: worker\n  dockerfile: Dockerfile.prod\n  target: release\n",
        )
        .unwrap();
        match full.build {
            Some(BuildSection::Full {
                context,
                dockerfile,
                target,
                ..
            }) => {
                assert_eq!(context.as_deref(), Some("worker"));
                assert_eq!(dockerfile.as_deref(), Some("Dockerfile.prod"));
                assert_eq!(target.as_deref(), Some("release"));
            }
            other => panic!("unexpected build section: {:?}", other),
        }
    }

    #[test]
    fn test_build_args_forms() {
        let map: BuildArgs = serde_yaml::from_str("A: x\nB: 3\nC:\n").unwrap();
        let pairs = map.into_pairs();
        assert_eq!(pairs.get("A").map(String::as_str), Some("x"));
        assert_eq!(pairs.get("B").map(String::as_str), Some("3"));
        assert!(!pairs.contains_key("C"));

        let list: BuildArgs = serde_yaml::from_str("- A=x\n- NOVALUE\n").unwrap();
        let pairs = list.into_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs["A"], "x");
    }

    #[test]
    fn test_depends_on_forms() {
        let list: DependsOn = serde_yaml::from_str("- common\n- db\n").unwrap();
        assert_eq!(list.names(), vec!["common", "db"]);

        let map: DependsOn =
            serde_yaml::from_str("db:\n  condition: service_healthy\n").unwrap();
        assert_eq!(map.names(), vec!["db"]);
    }
}
