use crate::types::RecordSet;
use serde_json::{Map, Value};

fn field(properties: &Map<String, Value>, key: &str) -> String {
    match properties.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// HTML label for one grid cell. Values are inserted as-is, without escaping.
pub fn format_tooltip(properties: &Map<String, Value>) -> String {
    format!(
        "<b style='color: white;'>Identifiant: {}</b><br>\
         Nombre d'individus: <b style='color: white;'>{}</b><br>\
         Nombre de ménages: <b style='color: #EE776E;'>{}</b><br>\
         Somme des revenus winsorisés: <b style='color: #EE776E;'>{}</b><br>\
         Cluster: <b style='color: #EE776E;'>{}</b><br>\
         <i style='font-size: 0.7em;'>Source: INSEE 2023 </i>",
        field(properties, "idcar_200m"),
        field(properties, "ind"),
        field(properties, "men"),
        field(properties, "ind_snv"),
        field(properties, "cluster"),
    )
}

pub fn attach(set: &mut RecordSet) {
    for record in &mut set.records {
        record.tooltip = Some(format_tooltip(&record.properties));
    }
}
