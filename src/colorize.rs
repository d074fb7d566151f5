use crate::types::{RecordSet, Rgba};
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;
use tracing::{info, warn};

pub const RED: Rgba = Rgba([255, 0, 0, 200]);
pub const GREEN: Rgba = Rgba([0, 255, 0, 200]);
pub const BLUE: Rgba = Rgba([0, 0, 255, 200]);
pub const FALLBACK: Rgba = Rgba([255, 255, 255, 200]);

/// How non-string cluster values are turned into labels.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LabelCoercion {
    /// Only JSON strings are labels; numbers get the fallback color.
    Strict,
    /// Integral numbers (`1`, `1.0`) are read as their decimal string.
    #[default]
    Integers,
}

pub fn colorize(label: Option<&str>) -> Rgba {
    match label {
        Some("1") => RED,
        Some("2") => GREEN,
        Some("3") => BLUE,
        _ => FALLBACK,
    }
}

pub fn cluster_label(value: Option<&Value>, coercion: LabelCoercion) -> Option<Cow<'_, str>> {
    match (value?, coercion) {
        (Value::String(s), _) => Some(Cow::Borrowed(s.as_str())),
        (Value::Number(n), LabelCoercion::Integers) => {
            if let Some(i) = n.as_i64() {
                Some(Cow::Owned(i.to_string()))
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| Cow::Owned(format!("{}", f as i64)))
            }
        }
        _ => None,
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColorSummary {
    pub matched: usize,
    pub coerced: usize,
    pub fallback: usize,
}

/// Sets `color` on every record from its `column` attribute.
pub fn apply(set: &mut RecordSet, column: &str, coercion: LabelCoercion) -> ColorSummary {
    let mut summary = ColorSummary::default();

    for record in &mut set.records {
        let value = record.properties.get(column);
        let label = cluster_label(value, coercion);
        if matches!(value, Some(Value::Number(_))) && label.is_some() {
            summary.coerced += 1;
        }

        let color = colorize(label.as_deref());
        if color == FALLBACK {
            summary.fallback += 1;
        } else {
            summary.matched += 1;
        }
        record.color = Some(color);
    }

    if summary.coerced > 0 {
        info!(
            "Read {} numeric '{}' values as integer labels",
            summary.coerced, column
        );
    }
    if !set.is_empty() && summary.matched == 0 {
        warn!(
            "No record in column '{}' matched a known cluster; every record uses the fallback color",
            column
        );
    }
    info!(
        "Colorized {} records ({} matched, {} fallback)",
        set.len(),
        summary.matched,
        summary.fallback
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map};

    fn record_with(column: &str, value: Value) -> Record {
        let mut props = Map::new();
        props.insert(column.to_string(), value);
        Record::new(None, props)
    }

    #[test]
    fn fixed_palette() {
        assert_eq!(colorize(Some("1")), Rgba([255, 0, 0, 200]));
        assert_eq!(colorize(Some("2")), Rgba([0, 255, 0, 200]));
        assert_eq!(colorize(Some("3")), Rgba([0, 0, 255, 200]));
        assert_eq!(colorize(Some("anything-else")), Rgba([255, 255, 255, 200]));
        assert_eq!(colorize(Some("")), FALLBACK);
        assert_eq!(colorize(Some(" 1")), FALLBACK);
        assert_eq!(colorize(None), FALLBACK);
    }

    #[test]
    fn strict_labels_ignore_numbers() {
        assert_eq!(cluster_label(Some(&json!(1)), LabelCoercion::Strict), None);
        assert_eq!(
            cluster_label(Some(&json!("2")), LabelCoercion::Strict).as_deref(),
            Some("2")
        );
    }

    #[test]
    fn integer_coercion() {
        let c = LabelCoercion::Integers;
        assert_eq!(cluster_label(Some(&json!(3)), c).as_deref(), Some("3"));
        assert_eq!(cluster_label(Some(&json!(2.0)), c).as_deref(), Some("2"));
        assert_eq!(cluster_label(Some(&json!(2.5)), c), None);
        assert_eq!(cluster_label(Some(&json!(true)), c), None);
        assert_eq!(cluster_label(Some(&Value::Null), c), None);
        assert_eq!(cluster_label(None, c), None);
    }

    #[test]
    fn apply_colors_in_input_order() {
        let mut set = RecordSet {
            crs: Some("EPSG:4326".into()),
            records: vec![
                record_with("cluster", json!("1")),
                record_with("cluster", json!(2)),
                record_with("cluster", json!("9")),
                record_with("other", json!("1")),
            ],
        };

        let summary = apply(&mut set, "cluster", LabelCoercion::Integers);
        let colors: Vec<_> = set.records.iter().map(|r| r.color).collect();
        assert_eq!(colors, vec![Some(RED), Some(GREEN), Some(FALLBACK), Some(FALLBACK)]);
        assert_eq!(
            summary,
            ColorSummary {
                matched: 2,
                coerced: 1,
                fallback: 2
            }
        );
    }

    #[test]
    fn strict_apply_sends_numbers_to_fallback() {
        let mut set = RecordSet {
            crs: None,
            records: vec![record_with("cluster", json!(1)), record_with("cluster", json!(3))],
        };

        let summary = apply(&mut set, "cluster", LabelCoercion::Strict);
        assert!(set.records.iter().all(|r| r.color == Some(FALLBACK)));
        assert_eq!(summary.fallback, 2);
        assert_eq!(summary.coerced, 0);
    }
}
