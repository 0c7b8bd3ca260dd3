use crate::error::{LoaderError, Result};
use crate::types::{Cell, FlattenConfig, Table};
use serde_json::{Map, Value};

/// Flattens the record array of a bundle into a table
pub struct Flattener {
    config: FlattenConfig,
}

impl Flattener {
    pub fn new(config: FlattenConfig) -> Self {
        Flattener { config }
    }

    /// Flatten a parsed bundle into one row per record
    pub fn flatten(&self, bundle: Value) -> Result<Table> {
        let record_path = &self.config.record_path;

        let records = match bundle {
            Value::Object(mut obj) => obj.remove(record_path),
            _ => None,
        };

        let records = match records {
            Some(Value::Array(arr)) => arr,
            Some(_) => {
                return Err(LoaderError::SchemaMismatch(format!(
                    "`{}` is not an array",
                    record_path
                )))
            }
            None => {
                return Err(LoaderError::SchemaMismatch(format!(
                    "bundle has no `{}` field",
                    record_path
                )))
            }
        };

        let mut table = Table::new();
        for (idx, record) in records.into_iter().enumerate() {
            match record {
                Value::Object(obj) => {
                    let mut cells = Vec::with_capacity(obj.len());
                    self.flatten_object(obj, None, 0, &mut cells);
                    table.push_record(cells);
                }
                other => {
                    return Err(LoaderError::SchemaMismatch(format!(
                        "`{}[{}]` is a {}, expected an object",
                        record_path,
                        idx,
                        json_kind(&other)
                    )))
                }
            }
        }

        Ok(table)
    }

    /// Recursively expand an object into `(column, cell)` pairs
    fn flatten_object(
        &self,
        obj: Map<String, Value>,
        prefix: Option<&str>,
        level: usize,
        cells: &mut Vec<(String, Cell)>,
    ) {
        for (key, value) in obj.into_iter() {
            let column = match prefix {
                Some(p) => format!("{}{}{}", p, self.config.separator, key),
                None => key,
            };

            match value {
                Value::Object(nested) if level < self.config.max_level => {
                    self.flatten_object(nested, Some(&column), level + 1, cells);
                }
                other => cells.push((column, Cell::from_json(other))),
            }
        }
    }
}

impl Default for Flattener {
    fn default() -> Self {
        Flattener::new(FlattenConfig::default())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn column_names(table: &Table) -> Vec<&str> {
        table.columns().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_flatten_two_levels() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [{
                "fullUrl": "urn:uuid:1",
                "resource": {
                    "resourceType": "Observation",
                    "code": {
                        "text": "Heart rate",
                        "coding": [{"code": "8867-4"}],
                        "extra": {"deep": true}
                    },
                    "valueQuantity": {"value": 72, "unit": "/min"}
                }
            }]
        });

        let table = Flattener::default().flatten(bundle).unwrap();

        assert_eq!(
            column_names(&table),
            vec![
                "fullUrl",
                "resource_resourceType",
                "resource_code_text",
                "resource_code_coding",
                "resource_code_extra",
                "resource_valueQuantity_value",
                "resource_valueQuantity_unit",
            ]
        );
        assert_eq!(table.len(), 1);

        // Arrays are never descended
        assert_eq!(
            table.get(0, "resource_code_coding"),
            Some(&Cell::Opaque(r#"[{"code":"8867-4"}]"#.into()))
        );
        // Objects two levels below the record root stay opaque
        assert_eq!(
            table.get(0, "resource_code_extra"),
            Some(&Cell::Opaque(r#"{"deep":true}"#.into()))
        );
        assert_eq!(
            table.get(0, "resource_valueQuantity_value"),
            Some(&Cell::Int(72))
        );
    }

    #[test]
    fn test_empty_object_contributes_no_columns() {
        let bundle = json!({
            "entry": [{"resource": {"resourceType": "Patient", "meta": {}}}]
        });

        let table = Flattener::default().flatten(bundle).unwrap();
        assert_eq!(column_names(&table), vec!["resource_resourceType"]);
    }

    #[test]
    fn test_columns_are_union_across_entries() {
        let bundle = json!({
            "entry": [
                {"resource": {"resourceType": "Patient", "gender": "female"}},
                {"resource": {"resourceType": "Encounter", "status": "finished"}}
            ]
        });

        let table = Flattener::default().flatten(bundle).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            column_names(&table),
            vec!["resource_resourceType", "resource_gender", "resource_status"]
        );
        assert_eq!(table.get(0, "resource_status"), Some(&Cell::Null));
        assert_eq!(table.get(1, "resource_gender"), Some(&Cell::Null));
    }

    #[test]
    fn test_custom_depth_and_separator() {
        let config = FlattenConfig {
            max_level: 1,
            separator: ".".to_string(),
            ..FlattenConfig::default()
        };
        let bundle = json!({
            "entry": [{"resource": {"code": {"text": "x"}}}]
        });

        let table = Flattener::new(config).flatten(bundle).unwrap();
        assert_eq!(column_names(&table), vec!["resource.code"]);
    }

    #[test]
    fn test_missing_entry_is_schema_mismatch() {
        let err = Flattener::default()
            .flatten(json!({"resourceType": "Bundle"}))
            .unwrap_err();
        assert!(matches!(err, LoaderError::SchemaMismatch(_)));
    }

    #[test]
    fn test_entry_not_array_is_schema_mismatch() {
        let err = Flattener::default()
            .flatten(json!({"entry": {"resource": {}}}))
            .unwrap_err();
        assert!(matches!(err, LoaderError::SchemaMismatch(_)));

        let err = Flattener::default().flatten(json!([1, 2])).unwrap_err();
        assert!(matches!(err, LoaderError::SchemaMismatch(_)));
    }

    #[test]
    fn test_non_object_entry_is_schema_mismatch() {
        let err = Flattener::default()
            .flatten(json!({"entry": [{"resource": {}}, "oops"]}))
            .unwrap_err();
        match err {
            LoaderError::SchemaMismatch(msg) => assert!(msg.contains("entry[1]")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_entry_array_yields_empty_table() {
        let table = Flattener::default().flatten(json!({"entry": []})).unwrap();
        assert!(table.is_empty());
    }
}
