use crate::colorize::{self, ColorSummary};
use crate::config::{PathConfig, RenderConfig};
use crate::crs;
use crate::data;
use crate::render;
use crate::scene;
use crate::tooltip;
use crate::types::RecordSet;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

/// Everything read from disk before any transformation starts.
pub struct Inputs {
    pub records: RecordSet,
    pub config: RenderConfig,
}

#[derive(Debug)]
pub struct RunSummary {
    pub records: usize,
    pub crs: Option<String>,
    pub colors: ColorSummary,
}

pub fn load(paths_file: &Path) -> Result<Inputs> {
    let paths = PathConfig::load_from_file(paths_file)?;
    info!("Loaded path file {:?}", paths_file);

    let base = paths_file.parent().unwrap_or_else(|| Path::new("."));
    let (data_path, config_path) = paths.resolve(base);

    let records = data::load_records(&data_path)
        .with_context(|| format!("Failed to load dataset {:?}", data_path))?;

    let config = RenderConfig::load_from_file(&config_path)?;
    info!("Loaded configuration file {:?}", config_path);

    Ok(Inputs { records, config })
}

/// Normalizes the CRS, then colors and labels every record.
pub fn prepare(records: RecordSet, config: &RenderConfig) -> (RecordSet, ColorSummary) {
    let mut records = crs::normalize(records);
    info!("Checked CRS: {}", records.crs.as_deref().unwrap_or("none"));

    let colors = colorize::apply(&mut records, &config.cluster_column, config.label_coercion);
    if config.tooltip {
        tooltip::attach(&mut records);
    }
    (records, colors)
}

pub fn run(paths_file: &Path, output: &Path, overrides: &Map<String, Value>) -> Result<RunSummary> {
    let Inputs { records, config } = load(paths_file)?;
    let (records, colors) = prepare(records, &config);

    let (scene, view) = scene::assemble(&records, &config, overrides);
    info!("Created deck scene with {} layer(s)", scene.layers.len());

    render::write_html(&scene, &view, output)?;

    Ok(RunSummary {
        records: records.len(),
        crs: records.crs,
        colors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorize::{FALLBACK, GREEN, RED};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    const DATA: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [2.35, 48.85]},
             "properties": {"idcar_200m": "A", "df_clustered_cluster": "1", "cluster": "1"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [4.83, 45.76]},
             "properties": {"idcar_200m": "B", "df_clustered_cluster": "2", "cluster": "2"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [5.37, 43.30]},
             "properties": {"idcar_200m": "C", "df_clustered_cluster": "9", "cluster": "9"}}
        ]
    }"#;

    const CONFIG: &str = r#"{
        "geojson_layer": {
            "type": "GeoJsonLayer",
            "opacity": 0.5,
            "filled": true,
            "get_fill_color": "properties.color"
        },
        "view_state": {"latitude": 46.5, "longitude": 3.0, "zoom": 5},
        "map_style": "light"
    }"#;

    fn workspace(data: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/cells.geojson"), data).unwrap();
        fs::write(dir.path().join("config.json"), CONFIG).unwrap();
        fs::write(
            dir.path().join("path.json"),
            r#"{"data_path": "data/cells.geojson", "config_path": "config.json"}"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn colors_follow_input_order() {
        let dir = workspace(DATA);
        let Inputs { records, config } = load(&dir.path().join("path.json")).unwrap();
        let (records, _) = prepare(records, &config);

        let colors: Vec<_> = records.records.iter().map(|r| r.color).collect();
        assert_eq!(colors, vec![Some(RED), Some(GREEN), Some(FALLBACK)]);
        assert!(records.records[2]
            .tooltip
            .as_deref()
            .is_some_and(|t| t.contains("Identifiant: C")));
    }

    #[test]
    fn run_writes_map_with_overrides() {
        let dir = workspace(DATA);
        let output = dir.path().join("map.html");
        let mut overrides = Map::new();
        overrides.insert("opacity".into(), json!(0.9));

        let summary = run(&dir.path().join("path.json"), &output, &overrides).unwrap();
        assert_eq!(summary.records, 3);
        assert_eq!(summary.crs.as_deref(), Some("EPSG:4326"));
        assert_eq!(summary.colors.matched, 2);
        assert_eq!(summary.colors.fallback, 1);

        let html = fs::read_to_string(&output).unwrap();
        assert!(html.contains(r#""opacity":0.9"#));
        assert!(html.contains(r#""getFillColor":"@@=properties.color""#));
        assert!(html.contains(r#""color":[255,0,0,200]"#));
        assert!(html.contains("positron-gl-style"));
    }

    #[test]
    fn projected_dataset_is_reprojected_before_rendering() {
        let data = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::2154"}},
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [700000.0, 6600000.0]},
                 "properties": {"df_clustered_cluster": "3"}}
            ]
        }"#;
        let dir = workspace(data);
        let Inputs { records, config } = load(&dir.path().join("path.json")).unwrap();
        let (records, colors) = prepare(records, &config);

        assert_eq!(records.crs.as_deref(), Some("EPSG:4326"));
        assert_eq!(colors.matched, 1);
    }

    #[test]
    fn missing_path_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&dir.path().join("path.json"), &dir.path().join("map.html"), &Map::new());
        assert!(err.is_err());
        assert!(!dir.path().join("map.html").exists());
    }
}
