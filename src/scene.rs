use crate::config::RenderConfig;
use crate::types::RecordSet;
use geojson::{Feature, FeatureCollection};
use serde::Serialize;
use serde_json::{Map, Value};

pub const DEFAULT_LAYER_TYPE: &str = "GeoJsonLayer";
pub const DEFAULT_LAYER_ID: &str = "geojson-layer";

const CARTO_STYLES: &[(&str, &str)] = &[
    ("light", "https://basemaps.cartocdn.com/gl/positron-gl-style/style.json"),
    ("dark", "https://basemaps.cartocdn.com/gl/dark-matter-gl-style/style.json"),
    ("road", "https://basemaps.cartocdn.com/gl/voyager-gl-style/style.json"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub layer_type: String,
    pub id: String,
    pub data: Value,
    /// Remaining layer options, still in their config (snake_case) spelling.
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub layers: Vec<Layer>,
    pub map_style: String,
    pub map_provider: String,
    pub tooltip: Option<Value>,
}

/// Initial camera, passed to the renderer as configured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View(pub Value);

/// Later values win on duplicate keys.
pub fn merge_options(base: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

pub fn feature_collection(set: &RecordSet) -> FeatureCollection {
    let features = set
        .records
        .iter()
        .map(|record| {
            let mut properties = record.properties.clone();
            if let Some(color) = record.color {
                properties.insert("color".into(), Value::from(color.0.to_vec()));
            }
            if let Some(tooltip) = &record.tooltip {
                properties.insert("tooltip".into(), Value::String(tooltip.clone()));
            }

            Feature {
                bbox: None,
                geometry: record.geometry.as_ref().map(|g| geojson::Geometry::new(geojson::Value::from(g))),
                id: record.id.clone(),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn geojson_layer(set: &RecordSet, config: &RenderConfig, overrides: &Map<String, Value>) -> Layer {
    let mut options = merge_options(&config.geojson_layer, overrides);

    let layer_type = match options.remove("type") {
        Some(Value::String(t)) => t,
        _ => DEFAULT_LAYER_TYPE.to_string(),
    };
    let id = match options.remove("id") {
        Some(Value::String(id)) => id,
        _ => DEFAULT_LAYER_ID.to_string(),
    };

    Layer {
        layer_type,
        id,
        data: Value::Object(Map::from(&feature_collection(set))),
        options,
    }
}

pub fn resolve_map_style(style: &str) -> (String, String) {
    let url = CARTO_STYLES
        .iter()
        .find(|(name, _)| *name == style)
        .map(|(_, url)| url.to_string())
        .unwrap_or_else(|| style.to_string());
    let provider = if url.starts_with("mapbox://") { "mapbox" } else { "carto" };
    (url, provider.to_string())
}

pub fn assemble(set: &RecordSet, config: &RenderConfig, overrides: &Map<String, Value>) -> (Scene, View) {
    let layer = geojson_layer(set, config, overrides);
    let (map_style, map_provider) = resolve_map_style(&config.map_style);

    let tooltip = config
        .tooltip
        .then(|| serde_json::json!({ "html": "{tooltip}" }));

    let scene = Scene {
        layers: vec![layer],
        map_style,
        map_provider,
        tooltip,
    };
    (scene, View(config.view_state.clone()))
}
