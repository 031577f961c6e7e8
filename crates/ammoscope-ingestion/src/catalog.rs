//! Catalog loading.
//!
//! The upstream fetcher writes either a bare array of records, an
//! `{"ammo": [...]}` object, or the raw GraphQL envelope
//! `{"data": {"ammo": [...]}}`. All three load to the same batch. Records
//! that nest their identity under `item` are flattened on load.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use ammoscope_common::{fields, flatten_nested, AmmoRecord, AmmoscopeError, Result};

const AMMO_KEY: &str = "ammo";
const DATA_KEY: &str = "data";
const ERRORS_KEY: &str = "errors";

/// Read and parse a catalog file.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<AmmoRecord>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    let records = parse_catalog(value)?;
    info!(path = %path.display(), n = records.len(), "Catalog loaded");
    Ok(records)
}

/// Turn an already-parsed catalog document into records.
pub fn parse_catalog(value: Value) -> Result<Vec<AmmoRecord>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            if let Some(errors) = obj.get(ERRORS_KEY) {
                return Err(AmmoscopeError::Catalog(format!("upstream reported errors: {errors}")));
            }
            match (obj.remove(AMMO_KEY), obj.remove(DATA_KEY)) {
                (Some(Value::Array(items)), _) => items,
                (_, Some(data @ Value::Object(_))) => return parse_catalog(data),
                _ => {
                    return Err(AmmoscopeError::Catalog(
                        "expected an array of records or an object with an `ammo` array".to_string(),
                    ))
                }
            }
        }
        other => {
            return Err(AmmoscopeError::Catalog(format!(
                "expected an array of records, found {}",
                ammoscope_common::record::json_type_name(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let mut record = AmmoRecord::from_value(item)
                .map_err(|e| AmmoscopeError::Catalog(format!("record #{index}: {e}")))?;
            if flatten_nested(record.document_mut(), fields::NESTED_ITEM) {
                debug!(index, id = record.id().unwrap_or("?"), "Flattened nested item");
            }
            Ok(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_bare_array() {
        let records = parse_catalog(json!([{ "id": "a" }, { "id": "b" }])).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![Some("a"), Some("b")]);
    }

    #[test]
    fn test_graphql_envelope_is_unwrapped_and_flattened() {
        let records = parse_catalog(json!({
            "data": { "ammo": [
                { "ammoType": "bullet", "caliber": "Caliber9x19PARA",
                  "item": { "id": "5c3df7d588a4501f290594e5", "name": "9x19mm Green Tracer" } }
            ]}
        }))
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), Some("5c3df7d588a4501f290594e5"));
        assert_eq!(records[0].name(), Some("9x19mm Green Tracer"));
        assert!(!records[0].contains(fields::NESTED_ITEM));
    }

    #[test]
    fn test_ammo_object() {
        let records = parse_catalog(json!({ "ammo": [{ "id": "a" }] })).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_upstream_errors_rejected() {
        let err = parse_catalog(json!({ "errors": [{ "message": "rate limited" }] })).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_non_object_record_rejected() {
        let err = parse_catalog(json!([{ "id": "a" }, 42])).unwrap_err();
        assert!(err.to_string().contains("record #1"));
    }

    #[test]
    fn test_scalar_catalog_rejected() {
        assert!(matches!(parse_catalog(json!("ammo")), Err(AmmoscopeError::Catalog(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": "a", "name": "A"}}]"#).unwrap();

        let records = load_catalog(file.path()).unwrap();
        assert_eq!(records[0].name(), Some("A"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_catalog("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, AmmoscopeError::Io(_)));
    }
}
