// Best-effort normalization of arbitrary nasne JSON into a Snapshot.
// Two phases: flatten the document into dotted keys, then resolve each field through its aliases.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::Snapshot;

const NAME: &[&str] = &["name", "nasne_name", "status.name"];
const PRODUCT_NAME: &[&str] = &["product_name", "productname", "model_name"];
const HARDWARE_VERSION: &[&str] = &["hardware_version", "hw_version", "version.hardware"];
const SOFTWARE_VERSION: &[&str] = &[
    "software_version",
    "sw_version",
    "version.software",
    "firmware_version",
];
const HDD_SIZE: &[&str] = &[
    "hdd_size",
    "hdd_total_size",
    "storage_total_size",
    "hdd_size_bytes",
    "storage_total_bytes",
];
const HDD_USAGE: &[&str] = &[
    "hdd_using_size",
    "hdd_used_size",
    "storage_used_size",
    "hdd_usage_bytes",
    "storage_used_bytes",
];
const DTCPIP_CLIENTS: &[&str] = &["dtcp_ip_client_count", "dtcpip_clients", "dtcp_clients"];
const RECORDINGS: &[&str] = &["recording_count", "recordings", "recording_titles"];
const RECORDED_TITLES: &[&str] = &["recorded_count", "recorded_titles", "recorded_title_count"];
const RESERVED_TITLES: &[&str] = &["reserved_count", "reserved_titles", "reserve_count"];
const RESERVED_CONFLICT: &[&str] = &[
    "reserved_conflict_count",
    "conflict_count",
    "reserved_conflict_titles",
];
const RESERVED_NOT_FOUND: &[&str] = &[
    "reserved_not_found_count",
    "notfound_count",
    "reserved_notfound_titles",
];

/// Dotted, normalized key path -> leaf or sub-document.
pub type FlatMap = BTreeMap<String, Value>;

/// Maps an arbitrary payload (usually endpoint name -> document) onto a Snapshot. Never fails.
pub fn extract_snapshot(payload: &Value) -> Snapshot {
    let flat = flatten(payload);

    Snapshot {
        name: first_string(&flat, NAME),
        product_name: first_string(&flat, PRODUCT_NAME),
        hardware_version: first_string(&flat, HARDWARE_VERSION),
        software_version: first_string(&flat, SOFTWARE_VERSION),
        hdd_size_bytes: first_number(&flat, HDD_SIZE),
        hdd_usage_bytes: first_number(&flat, HDD_USAGE),
        dtcpip_clients: first_number(&flat, DTCPIP_CLIENTS),
        recordings: first_number(&flat, RECORDINGS),
        recorded_titles: first_number(&flat, RECORDED_TITLES),
        reserved_titles: first_number(&flat, RESERVED_TITLES),
        reserved_conflict_titles: first_number(&flat, RESERVED_CONFLICT),
        reserved_not_found_titles: first_number(&flat, RESERVED_NOT_FOUND),
    }
    .sanitized()
}

/// Flattens objects into dotted keys. Every intermediate key is kept too, and array
/// elements share their parent's path (later elements overwrite earlier ones).
pub fn flatten(value: &Value) -> FlatMap {
    let mut out = FlatMap::new();
    flatten_into(value, "", &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, out: &mut FlatMap) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = normalize(k);
                let next = if prefix.is_empty() {
                    key
                } else {
                    format!("{}.{}", prefix, key)
                };
                out.insert(next.clone(), v.clone());
                flatten_into(v, &next, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                flatten_into(v, prefix, out);
            }
        }
        _ => {}
    }
}

/// Lower-cases and maps `-`, ` ` and `/` to `_`.
pub fn normalize(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '-' | ' ' | '/' => '_',
            c => c,
        })
        .collect()
}

/// Exact key first, then any key ending in `.alias`.
fn lookup<'a, T>(flat: &'a FlatMap, alias: &str, pick: impl Fn(&'a Value) -> Option<T>) -> Option<T> {
    let alias = normalize(alias);
    if let Some(v) = flat.get(&alias).and_then(&pick) {
        return Some(v);
    }
    let suffix = format!(".{}", alias);
    flat.iter()
        .filter(|(k, _)| k.ends_with(&suffix))
        .find_map(|(_, v)| pick(v))
}

pub fn first_string(flat: &FlatMap, aliases: &[&str]) -> String {
    aliases
        .iter()
        .find_map(|alias| {
            lookup(flat, alias, |v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
        })
        .unwrap_or_default()
}

pub fn first_number(flat: &FlatMap, aliases: &[&str]) -> f64 {
    aliases
        .iter()
        .find_map(|alias| lookup(flat, alias, number_from))
        .unwrap_or(0.0)
}

/// Any JSON number representation: float, signed or unsigned integer.
fn number_from(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
