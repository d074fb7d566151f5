use crate::colorize::LabelCoercion;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {path:?} was not found")]
    NotFound { path: PathBuf },

    #[error("failed to read config file {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("config file {path:?} is not valid JSON for this document: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Locations of the dataset and the render config, relative to the path file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PathConfig {
    pub data_path: PathBuf,
    pub config_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default)]
    pub geojson_layer: Map<String, Value>,
    pub view_state: Value,
    pub map_style: String,
    #[serde(default = "default_cluster_column")]
    pub cluster_column: String,
    #[serde(default)]
    pub label_coercion: LabelCoercion,
    #[serde(default = "default_tooltip")]
    pub tooltip: bool,
}

fn default_cluster_column() -> String {
    "df_clustered_cluster".to_string()
}

fn default_tooltip() -> bool {
    true
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl PathConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        load_json(path)
    }

    /// Resolves both entries against `base`, normally the path file's directory.
    pub fn resolve(&self, base: &Path) -> (PathBuf, PathBuf) {
        (base.join(&self.data_path), base.join(&self.config_path))
    }
}

impl RenderConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        load_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_path_config_and_resolves_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "path.json",
            r#"{"data_path": "data/grid.geojson", "config_path": "config.json"}"#,
        );

        let paths = PathConfig::load_from_file(&path).unwrap();
        let (data, config) = paths.resolve(dir.path());
        assert_eq!(data, dir.path().join("data/grid.geojson"));
        assert_eq!(config, dir.path().join("config.json"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = PathConfig::load_from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }), "{err}");
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config.json", "{ not json");
        let err = RenderConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn missing_required_key_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "path.json", r#"{"data_path": "x.geojson"}"#);
        let err = PathConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn render_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.json",
            r#"{
                "geojson_layer": {"type": "GeoJsonLayer", "opacity": 0.5},
                "view_state": {"latitude": 48.85, "longitude": 2.35, "zoom": 10},
                "map_style": "light"
            }"#,
        );

        let config = RenderConfig::load_from_file(&path).unwrap();
        assert_eq!(config.cluster_column, "df_clustered_cluster");
        assert_eq!(config.label_coercion, LabelCoercion::Integers);
        assert!(config.tooltip);
        assert_eq!(config.geojson_layer.get("opacity"), Some(&json!(0.5)));
        assert_eq!(config.view_state["zoom"], json!(10));
    }
}
