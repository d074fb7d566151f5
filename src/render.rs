use crate::scene::{Layer, Scene, View};
use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tracing::info;

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta http-equiv="content-type" content="text/html; charset=UTF-8">
    <title>Cluster map</title>
    <script src="https://api.tiles.mapbox.com/mapbox-gl-js/v1.13.0/mapbox-gl.js"></script>
    <script src="https://cdn.jsdelivr.net/npm/@deck.gl/jupyter-widget@~8.8.*/dist/index.js"></script>
    <style>
      body { margin: 0; padding: 0; overflow: hidden; }
      #deck-container { width: 100vw; height: 100vh; }
      #deck-container canvas { z-index: 1; background: none; }
    </style>
  </head>
  <body>
    <div id="deck-container"></div>
  </body>
  <script>
    const container = document.getElementById('deck-container');
    const jsonInput = __JSON_INPUT__;
    const tooltip = __TOOLTIP__;

    const deckInstance = createDeck({
      container,
      jsonInput,
      tooltip,
      customLibraries: null,
      configuration: null
    });
  </script>
</html>
"#;

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn camel_keys(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter().map(|(k, v)| (camel_case(k), v.clone())).collect()
}

/// `get_*` options given as column names become deck.gl JSON expressions.
fn accessor(value: &Value) -> Value {
    match value {
        Value::String(s) if !s.starts_with("@@") => Value::String(format!("@@={}", s)),
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_string) => {
            let names: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            Value::String(format!("@@=[{}]", names.join(", ")))
        }
        other => other.clone(),
    }
}

fn layer_json(layer: &Layer) -> Value {
    let mut out = Map::new();
    out.insert("@@type".into(), Value::String(layer.layer_type.clone()));
    out.insert("id".into(), Value::String(layer.id.clone()));
    out.insert("data".into(), layer.data.clone());
    for (key, value) in &layer.options {
        let value = if key.starts_with("get_") { accessor(value) } else { value.clone() };
        out.insert(camel_case(key), value);
    }
    Value::Object(out)
}

pub fn deck_json(scene: &Scene, view: &View) -> Value {
    let initial_view_state = match &view.0 {
        Value::Object(map) => Value::Object(camel_keys(map)),
        other => other.clone(),
    };

    json!({
        "initialViewState": initial_view_state,
        "layers": scene.layers.iter().map(layer_json).collect::<Vec<_>>(),
        "mapProvider": scene.map_provider,
        "mapStyle": scene.map_style,
        "views": [{"@@type": "MapView", "controller": true}],
    })
}

// Any `<` inside a script block can end it or switch the parser's escape state.
fn script_safe(value: &Value) -> String {
    value.to_string().replace('<', "\\u003c")
}

pub fn to_html(scene: &Scene, view: &View) -> String {
    let tooltip = scene.tooltip.clone().unwrap_or(Value::Bool(false));
    HTML_TEMPLATE
        .replace("__JSON_INPUT__", &script_safe(&deck_json(scene, view)))
        .replace("__TOOLTIP__", &script_safe(&tooltip))
}

pub fn write_html(scene: &Scene, view: &View, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    fs::write(path, to_html(scene, view)).with_context(|| format!("Failed to write map to {:?}", path))?;
    info!("Saved map as HTML file {:?}", path);
    Ok(())
}
