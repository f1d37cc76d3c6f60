use serde::{Deserialize, Serialize};

/// Column types understood by the host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HostDataType {
    Int,
    Float,
    Bool,
    String,
    Date,
    Datetime,
    Geometry,
}

/// Map a catalog dictionary type tag onto the host's type enum.
///
/// Unknown tags are not an error; they come back as `None` and the caller
/// decides whether a fallback applies.
pub fn map_source_type(tag: &str) -> Option<HostDataType> {
    match tag {
        "integer" | "long" => Some(HostDataType::Int),
        "string" | "nested" => Some(HostDataType::String),
        "decimal" | "double" | "float" => Some(HostDataType::Float),
        "boolean" => Some(HostDataType::Bool),
        "date" => Some(HostDataType::Date),
        "timestamp" => Some(HostDataType::Datetime),
        "json" => Some(HostDataType::Geometry),
        _ => None,
    }
}

/// A dataset as listed by the catalog search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "fileTypes", default)]
    pub file_types: Vec<String>,
}

impl DatasetDescriptor {
    /// True when any of the dataset's file types is in `allowed`.
    pub fn supports_any(&self, allowed: &[String]) -> bool {
        allowed
            .iter()
            .any(|wanted| self.file_types.iter().any(|t| t == wanted))
    }
}

/// Envelope returned by `dataset/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<DatasetDescriptor>,
}

/// One entry of a dataset dictionary or query description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
}

/// A host column.
///
/// `fetch_key` holds the original field name used to pull values out of
/// each row. The host only offers a `description` slot for it, so that is
/// its wire name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub id: String,
    pub alias: String,
    #[serde(rename = "description")]
    pub fetch_key: String,
    #[serde(rename = "dataType", default)]
    pub data_type: Option<HostDataType>,
}

/// A host table.
///
/// `fetch_key` is the dataset id in discovery mode and the query text in
/// query mode; on the wire it travels as `description`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub id: String,
    pub alias: String,
    #[serde(rename = "description")]
    pub fetch_key: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}
