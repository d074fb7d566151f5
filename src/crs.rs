use crate::types::RecordSet;
use geo::{Coord, Geometry, MapCoords};
use proj4rs::Proj;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CrsError {
    #[error("dataset has no CRS metadata")]
    Missing,

    #[error("unrecognized CRS identifier '{0}'")]
    Unrecognized(String),

    #[error("EPSG:{0} has no built-in definition")]
    UnsupportedEpsg(u32),

    #[error("invalid projection definition for {crs}: {reason}")]
    Definition { crs: String, reason: String },

    #[error("failed to transform record {index}: {reason}")]
    Transform { index: usize, reason: String },

    #[error("record {index} produced a non-finite coordinate")]
    NonFinite { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Crs {
    Epsg(u32),
    Proj(String),
}

pub const WGS84: Crs = Crs::Epsg(4326);

// (code, proj definition, geographic)
const EPSG_DEFINITIONS: &[(u32, &str, bool)] = &[
    (4326, "+proj=longlat +datum=WGS84 +no_defs", true),
    (4258, "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs", true),
    (4171, "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs", true),
    (
        3857,
        "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs",
        false,
    ),
    (
        2154,
        "+proj=lcc +lat_0=46.5 +lon_0=3 +lat_1=49 +lat_2=44 +x_0=700000 +y_0=6600000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
        false,
    ),
    (
        3035,
        "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
        false,
    ),
];

impl Crs {
    /// Parses `EPSG:n`, OGC URNs, CRS84 aliases and raw `+proj=` strings.
    pub fn parse(tag: &str) -> Result<Self, CrsError> {
        let tag = tag.trim();
        if tag.starts_with("+proj=") {
            return Ok(Crs::Proj(tag.to_string()));
        }

        let upper = tag.to_ascii_uppercase();
        if upper == "CRS84" || upper.ends_with(":CRS84") {
            return Ok(WGS84);
        }

        let code = if let Some(code) = upper.strip_prefix("EPSG:") {
            Some(code)
        } else if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            // urn:ogc:def:crs:EPSG:[version]:code
            upper.rsplit(':').next()
        } else {
            None
        };

        code.and_then(|c| c.parse::<u32>().ok())
            .map(Crs::Epsg)
            .ok_or_else(|| CrsError::Unrecognized(tag.to_string()))
    }

    fn definition(&self) -> Result<(&str, bool), CrsError> {
        match self {
            Crs::Epsg(code) => EPSG_DEFINITIONS
                .iter()
                .find(|(c, _, _)| c == code)
                .map(|(_, def, geographic)| (*def, *geographic))
                .ok_or(CrsError::UnsupportedEpsg(*code)),
            Crs::Proj(def) => {
                let geographic = ["+proj=longlat", "+proj=latlong", "+proj=lonlat", "+proj=latlon"]
                    .iter()
                    .any(|p| def.contains(p));
                Ok((def.as_str(), geographic))
            }
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Proj(def) => f.write_str(def),
        }
    }
}

struct Projection {
    proj: Proj,
    geographic: bool,
}

impl Projection {
    fn new(crs: &Crs) -> Result<Self, CrsError> {
        let (def, geographic) = crs.definition()?;
        let proj = Proj::from_proj_string(def).map_err(|e| CrsError::Definition {
            crs: crs.to_string(),
            reason: format!("{:?}", e),
        })?;
        Ok(Self { proj, geographic })
    }
}

/// Point transformer between two CRSs. Geographic systems take and return degrees.
pub struct Transformer {
    src: Projection,
    dst: Projection,
}

impl Transformer {
    pub fn new(src: &Crs, dst: &Crs) -> Result<Self, CrsError> {
        Ok(Self {
            src: Projection::new(src)?,
            dst: Projection::new(dst)?,
        })
    }

    pub fn transform_coord(&self, coord: Coord<f64>, index: usize) -> Result<Coord<f64>, CrsError> {
        let mut point = if self.src.geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        proj4rs::transform::transform(&self.src.proj, &self.dst.proj, &mut point).map_err(|e| {
            CrsError::Transform {
                index,
                reason: format!("{:?}", e),
            }
        })?;

        let (x, y) = if self.dst.geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !x.is_finite() || !y.is_finite() {
            return Err(CrsError::NonFinite { index });
        }
        Ok(Coord { x, y })
    }

    pub fn transform_geometry(&self, geometry: &Geometry<f64>, index: usize) -> Result<Geometry<f64>, CrsError> {
        geometry.try_map_coords(|coord| self.transform_coord(coord, index))
    }
}

/// Reprojects `set` into `target`.
///
/// Returns `Ok(false)` when the set is already in `target`. Geometries are only
/// replaced once every record has been transformed.
pub fn reproject(set: &mut RecordSet, target: &Crs) -> Result<bool, CrsError> {
    let tag = set.crs.as_deref().ok_or(CrsError::Missing)?;
    let source = Crs::parse(tag)?;
    if &source == target {
        return Ok(false);
    }

    let transformer = Transformer::new(&source, target)?;
    let geometries = set
        .records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .geometry
                .as_ref()
                .map(|g| transformer.transform_geometry(g, index))
                .transpose()
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (record, geometry) in set.records.iter_mut().zip(geometries) {
        record.geometry = geometry;
    }
    set.crs = Some(target.to_string());
    Ok(true)
}

/// Brings `set` into WGS84. On any failure the input is returned untouched.
pub fn normalize(mut set: RecordSet) -> RecordSet {
    let source_tag = set.crs.clone();
    match reproject(&mut set, &WGS84) {
        Ok(false) => {}
        Ok(true) => info!(
            "Reprojected {} records from {} to {}",
            set.len(),
            source_tag.as_deref().unwrap_or("?"),
            WGS84
        ),
        Err(e) => warn!(
            "An error occurred while checking or reprojecting CRS, keeping original coordinates: {}",
            e
        ),
    }
    set
}
