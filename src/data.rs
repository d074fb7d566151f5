use crate::types::{Record, RecordSet};
use anyhow::{anyhow, Context, Result};
use geojson::GeoJson;
use serde_json::{Map, Number, Value};
use shapefile::dbase::{Date, FieldValue};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// Tag implied by RFC 7946 when a GeoJSON file carries no `crs` member.
const GEOJSON_DEFAULT_CRS: &str = "EPSG:4326";

pub fn load_records(path: &Path) -> Result<RecordSet> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input geometry file has no extension: {:?}", path))?;

    let set = match extension.as_str() {
        "json" | "geojson" => load_geojson(path)?,
        "shp" => load_shapefile(path)?,
        _ => return Err(anyhow!("Unsupported geometry format: {}", extension)),
    };

    info!(
        "Loaded {} records from {:?} (crs: {})",
        set.len(),
        path,
        set.crs.as_deref().unwrap_or("none")
    );
    debug!("Columns: {:?}", set.columns());

    Ok(set)
}

fn load_geojson(path: &Path) -> Result<RecordSet> {
    let file = File::open(path).with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    // Parse the GeoJSON. warning: this loads the whole file into memory.
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let crs = match collection.foreign_members.as_ref().and_then(|m| m.get("crs")) {
        None => Some(GEOJSON_DEFAULT_CRS.to_string()),
        Some(member) => {
            let tag = crs_from_member(member);
            if tag.is_none() {
                warn!("Unreadable crs member in {:?}: {}", path, member);
            }
            tag
        }
    };

    let mut records = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.into_iter().enumerate() {
        let geometry = match feature.geometry {
            Some(geom) => {
                let geo_geom: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry of feature {}: {:?}", index, e))?;
                Some(geo_geom)
            }
            None => None,
        };

        let mut record = Record::new(geometry, feature.properties.unwrap_or_default());
        record.id = feature.id;
        records.push(record);
    }

    Ok(RecordSet { crs, records })
}

/// Reads the pre-RFC 7946 `crs` member, in its `name` or `EPSG` form.
fn crs_from_member(member: &Value) -> Option<String> {
    let properties = member.get("properties")?;
    match member.get("type")?.as_str()? {
        "name" => properties.get("name")?.as_str().map(str::to_string),
        "EPSG" => properties
            .get("code")?
            .as_u64()
            .map(|code| format!("EPSG:{}", code)),
        _ => None,
    }
}

fn load_shapefile(path: &Path) -> Result<RecordSet> {
    let mut reader = shapefile::Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut records = Vec::new();
    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, dbf_record) = result.with_context(|| format!("Failed to read shape {}", index))?;

        let geometry = match shape {
            shapefile::Shape::NullShape => None,
            shape => {
                let geo_geom: geo::Geometry<f64> = shape
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert shape {}: {:?}", index, e))?;
                Some(geo_geom)
            }
        };

        let properties: Map<String, Value> = dbf_record
            .into_iter()
            .map(|(name, value)| (name, field_to_json(value)))
            .collect();
        records.push(Record::new(geometry, properties));
    }

    let prj = path.with_extension("prj");
    let crs = if prj.exists() {
        let wkt = fs::read_to_string(&prj).with_context(|| format!("Failed to read {:?}", prj))?;
        Some(crs_from_wkt(&wkt))
    } else {
        warn!("No .prj next to {:?}; dataset has no CRS", path);
        None
    };

    Ok(RecordSet { crs, records })
}

/// Uses the last `AUTHORITY["EPSG","n"]`, which names the CRS itself rather
/// than one of its components. Falls back to the raw WKT.
fn crs_from_wkt(wkt: &str) -> String {
    let wkt = wkt.trim();
    wkt.rmatch_indices("AUTHORITY[")
        .filter_map(|(start, _)| {
            let rest = &wkt[start + "AUTHORITY[".len()..];
            let end = rest.find(']')?;
            let parts: Vec<&str> = rest[..end].split(',').map(|p| p.trim().trim_matches('"')).collect();
            match parts.as_slice() {
                [authority, code] if authority.eq_ignore_ascii_case("EPSG") => {
                    code.parse::<u32>().ok().map(|c| format!("EPSG:{}", c))
                }
                _ => None,
            }
        })
        .next()
        .unwrap_or_else(|| wkt.to_string())
}

fn field_to_json(value: FieldValue) -> Value {
    fn float(f: f64) -> Value {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }

    match value {
        FieldValue::Character(Some(s)) => Value::String(s.trim_end().to_string()),
        FieldValue::Numeric(Some(n)) => float(n),
        FieldValue::Float(Some(f)) => float(f as f64),
        FieldValue::Double(d) => float(d),
        FieldValue::Currency(c) => float(c),
        FieldValue::Integer(i) => Value::from(i),
        FieldValue::Logical(Some(b)) => Value::Bool(b),
        FieldValue::Memo(s) => Value::String(s),
        FieldValue::Date(Some(d)) => Value::String(iso_date(&d)),
        FieldValue::DateTime(dt) => {
            let time = dt.time();
            Value::String(format!(
                "{}T{:02}:{:02}:{:02}",
                iso_date(&dt.date()),
                time.hours(),
                time.minutes(),
                time.seconds()
            ))
        }
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => Value::Null,
    }
}

fn iso_date(date: &Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}
