use indexmap::IndexMap;
use serde_json::Value;

/// Editable tags accepted from clients. Anything else is dropped before
/// the payload reaches the editing API.
pub const ALLOWED_TAGS: &[&str] = &[
    "name",
    "operator",
    "brand",
    "socket:type2",
    "socket:ccs",
    "socket:chademo",
    "fast_charge",
    "fee",
    "charge",
    "payment:app:qr",
    "capacity",
    "charging_station:output",
    "opening_hours",
    "access",
    "amenity",
];

/// Tags that must be present before a station may be created.
pub const REQUIRED_TAGS: &[&str] = &["name", "operator"];

const DEFAULT_AMENITY: &str = "charging_station";

/// Filters a client-supplied tag map down to the allow-list.
///
/// Scalar values are coerced to trimmed strings; null, composite, and
/// blank values are dropped. The `amenity` tag defaults to
/// `charging_station` when the client did not supply one. Insertion
/// order is preserved so the submitted XML lists tags the way the
/// client sent them.
pub fn normalize(raw: &serde_json::Map<String, Value>) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for (key, value) in raw {
        if !ALLOWED_TAGS.contains(&key.as_str()) {
            continue;
        }
        let value = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => continue,
        };
        if value.is_empty() {
            continue;
        }
        out.insert(key.clone(), value);
    }
    if !out.contains_key("amenity") {
        out.insert("amenity".to_string(), DEFAULT_AMENITY.to_string());
    }
    out
}

/// Names the required tags absent from a normalized tag set.
///
/// Empty means the set is acceptable for a create. Updates skip this
/// check entirely.
pub fn missing_required(tags: &IndexMap<String, String>) -> Vec<&'static str> {
    REQUIRED_TAGS
        .iter()
        .filter(|t| !tags.contains_key(**t))
        .copied()
        .collect()
}
