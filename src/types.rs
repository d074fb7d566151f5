use geo::Geometry;
use geojson::feature::Id;
use serde::Serialize;
use serde_json::{Map, Value};

/// RGBA color, serialized as `[r, g, b, a]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgba(pub [u8; 4]);

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: Option<Id>,
    pub geometry: Option<Geometry<f64>>,
    pub properties: Map<String, Value>,
    // Derived during colorization / tooltip formatting
    pub color: Option<Rgba>,
    pub tooltip: Option<String>,
}

impl Record {
    pub fn new(geometry: Option<Geometry<f64>>, properties: Map<String, Value>) -> Self {
        Self {
            id: None,
            geometry,
            properties,
            color: None,
            tooltip: None,
        }
    }
}

/// A loaded dataset. The CRS tag applies to the whole collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    pub crs: Option<String>,
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Attribute names in first-seen order across all records.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for record in &self.records {
            for key in record.properties.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }
}
