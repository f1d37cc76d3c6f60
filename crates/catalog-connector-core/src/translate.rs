//! Conversions between catalog API shapes and host shapes.

use std::collections::HashSet;

use serde_json::Value;

use crate::config::ConnectorConfig;
use crate::identifier::sanitize_identifier;
use crate::types::{map_source_type, Column, ColumnSpec, DatasetDescriptor, HostDataType, TableSchema};

/// Options that shape column conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOptions {
    pub lowercase_names: bool,
    pub unknown_type_fallback: Option<HostDataType>,
}

impl From<&ConnectorConfig> for ColumnOptions {
    fn from(config: &ConnectorConfig) -> Self {
        Self {
            lowercase_names: config.lowercase_column_names,
            unknown_type_fallback: config.unknown_type_fallback,
        }
    }
}

/// Hands out sanitized ids, suffixing `_2`, `_3`, ... when two names
/// sanitize to the same id.
#[derive(Debug, Default)]
pub struct UniqueIds {
    seen: HashSet<String>,
}

impl UniqueIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, name: &str) -> String {
        let base = sanitize_identifier(name);
        if self.seen.insert(base.clone()) {
            return base;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.seen.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Table shell for a dataset; columns are filled in once the dictionary
/// arrives.
pub fn dataset_to_table_schema(dataset: &DatasetDescriptor, fetch_key: String) -> TableSchema {
    TableSchema {
        id: sanitize_identifier(&dataset.id),
        alias: dataset.title.clone(),
        fetch_key,
        columns: Vec::new(),
    }
}

pub fn dictionary_to_columns(dictionary: &[ColumnSpec], options: &ColumnOptions) -> Vec<Column> {
    let mut ids = UniqueIds::new();

    dictionary
        .iter()
        .map(|spec| {
            let name = if options.lowercase_names {
                spec.name.to_lowercase()
            } else {
                spec.name.clone()
            };

            let data_type = map_source_type(&spec.type_tag).or_else(|| {
                tracing::warn!(
                    "Column '{}' has unknown type '{}'",
                    spec.name,
                    spec.type_tag
                );
                options.unknown_type_fallback
            });

            Column {
                id: ids.next(&spec.name),
                alias: name.clone(),
                fetch_key: name,
                data_type,
            }
        })
        .collect()
}

/// Pull one row's values out in column order.
///
/// Geometry columns hold a GeoJSON feature; the host wants only its
/// `geometry` member. Missing fields come back as `null`.
pub fn row_to_values(columns: &[Column], row: &Value) -> Vec<Value> {
    columns
        .iter()
        .map(|column| {
            let field = row.get(&column.fetch_key);
            let value = match column.data_type {
                Some(HostDataType::Geometry) => field.and_then(|feature| feature.get("geometry")),
                _ => field,
            };
            value.cloned().unwrap_or(Value::Null)
        })
        .collect()
}

pub fn rows_to_values(columns: &[Column], rows: &[Value]) -> Vec<Vec<Value>> {
    rows.iter().map(|row| row_to_values(columns, row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(name: &str, type_tag: &str) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            type_tag: type_tag.to_string(),
        }
    }

    fn full_dictionary() -> Vec<ColumnSpec> {
        vec![
            spec("First Column", "integer"),
            spec("Second-Column", "long"),
            spec("Third#Column", "string"),
            spec("4th__Column", "double"),
            spec("Fifth-C0lumn", "float"),
            spec("$ixth-Column", "boolean"),
            spec(" 7venth  Column ", "date"),
            spec("8th\ncolumn", "timestamp"),
            spec("ninthcolumn", "json"),
        ]
    }

    #[test]
    fn test_dictionary_types() {
        let columns = dictionary_to_columns(&full_dictionary(), &ColumnOptions::default());
        let types: Vec<Option<HostDataType>> = columns.iter().map(|c| c.data_type).collect();
        assert_eq!(
            types,
            vec![
                Some(HostDataType::Int),
                Some(HostDataType::Int),
                Some(HostDataType::String),
                Some(HostDataType::Float),
                Some(HostDataType::Float),
                Some(HostDataType::Bool),
                Some(HostDataType::Date),
                Some(HostDataType::Datetime),
                Some(HostDataType::Geometry),
            ]
        );
    }

    #[test]
    fn test_dictionary_ids() {
        let columns = dictionary_to_columns(&full_dictionary(), &ColumnOptions::default());
        let ids: Vec<&str> = columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "first_column",
                "second_column",
                "third_column",
                "4th__column",
                "fifth_c0lumn",
                "_ixth_column",
                "7venth__column",
                "8th_column",
                "ninthcolumn",
            ]
        );
    }

    #[test]
    fn test_dictionary_keeps_original_names() {
        let columns = dictionary_to_columns(&full_dictionary(), &ColumnOptions::default());
        assert_eq!(columns[0].alias, "First Column");
        assert_eq!(columns[0].fetch_key, "First Column");
        assert_eq!(columns[6].fetch_key, " 7venth  Column ");
    }

    #[test]
    fn test_dictionary_lowercase_names() {
        let options = ColumnOptions {
            lowercase_names: true,
            ..ColumnOptions::default()
        };
        let columns = dictionary_to_columns(&full_dictionary(), &options);
        let keys: Vec<&str> = columns.iter().map(|c| c.fetch_key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "first column",
                "second-column",
                "third#column",
                "4th__column",
                "fifth-c0lumn",
                "$ixth-column",
                " 7venth  column ",
                "8th\ncolumn",
                "ninthcolumn",
            ]
        );
        assert!(columns.iter().all(|c| c.alias == c.fetch_key));
    }

    #[test]
    fn test_unknown_type_fallback() {
        let dictionary = vec![spec("blob", "binary")];

        let columns = dictionary_to_columns(&dictionary, &ColumnOptions::default());
        assert_eq!(columns[0].data_type, None);

        let options = ColumnOptions {
            unknown_type_fallback: Some(HostDataType::String),
            ..ColumnOptions::default()
        };
        let columns = dictionary_to_columns(&dictionary, &options);
        assert_eq!(columns[0].data_type, Some(HostDataType::String));
    }

    #[test]
    fn test_colliding_ids_are_suffixed() {
        let dictionary = vec![spec("a-b", "string"), spec("a_b", "string"), spec("A B", "string")];
        let columns = dictionary_to_columns(&dictionary, &ColumnOptions::default());
        let ids: Vec<&str> = columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a_b", "a_b_2", "a_b_3"]);
    }

    #[test]
    fn test_dataset_to_table_schema() {
        let dataset = DatasetDescriptor {
            id: "first-dataset".to_string(),
            title: "First Dataset".to_string(),
            file_types: vec![],
        };

        let table = dataset_to_table_schema(&dataset, dataset.id.clone());
        assert_eq!(table.id, "first_dataset");
        assert_eq!(table.alias, "First Dataset");
        assert_eq!(table.fetch_key, "first-dataset");
        assert!(table.columns.is_empty());
    }

    #[test]
    fn test_row_with_geometry() {
        let columns = vec![
            Column {
                id: "properties_data".to_string(),
                alias: "properties-data".to_string(),
                fetch_key: "properties-data".to_string(),
                data_type: Some(HostDataType::Float),
            },
            Column {
                id: "feature".to_string(),
                alias: "feature".to_string(),
                fetch_key: "feature".to_string(),
                data_type: Some(HostDataType::Geometry),
            },
        ];
        let row = json!({
            "properties-data": 0.3,
            "feature": {
                "geometry": {"coordinates": [1, 2, 3], "type": "Polygon"},
                "type": "Feature"
            }
        });

        assert_eq!(
            row_to_values(&columns, &row),
            vec![json!(0.3), json!({"coordinates": [1, 2, 3], "type": "Polygon"})]
        );
    }

    #[test]
    fn test_row_missing_fields_are_null() {
        let columns = vec![
            Column {
                id: "first_column".to_string(),
                alias: "first-column".to_string(),
                fetch_key: "first-column".to_string(),
                data_type: Some(HostDataType::String),
            },
            Column {
                id: "second_column".to_string(),
                alias: "second column".to_string(),
                fetch_key: "second column".to_string(),
                data_type: Some(HostDataType::Geometry),
            },
            Column {
                id: "third_column".to_string(),
                alias: "third_column".to_string(),
                fetch_key: "third_column".to_string(),
                data_type: Some(HostDataType::Int),
            },
        ];

        let rows = vec![
            json!({"first-column": "a", "second column": {"geometry": "geojson geometry"}, "third_column": 1}),
            json!({"first-column": "b", "second column": {"type": "Feature"}}),
            json!("not an object"),
        ];

        assert_eq!(
            rows_to_values(&columns, &rows),
            vec![
                vec![json!("a"), json!("geojson geometry"), json!(1)],
                vec![json!("b"), Value::Null, Value::Null],
                vec![Value::Null, Value::Null, Value::Null],
            ]
        );
    }
}
