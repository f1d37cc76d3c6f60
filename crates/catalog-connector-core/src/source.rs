//! The two backing APIs a session can read from.
//!
//! Discovery mode lists catalog datasets; query mode wraps one ad-hoc query
//! as a single dataset. [`Backend`] picks one when the session is created so
//! later calls never branch on the mode again.

use async_trait::async_trait;
use serde_json::Value;

use crate::client::ApiClient;
use crate::config::SchemaSource;
use crate::connector::assemble_table_schemas;
use crate::error::Result;
use crate::mode::{ConnectionData, ConnectionMode};
use crate::translate::{dictionary_to_columns, ColumnOptions};
use crate::types::{Column, ColumnSpec, DatasetDescriptor, SearchResponse, TableSchema};

#[async_trait]
pub trait DataSource: Send + Sync {
    async fn list_datasets(&self, client: &ApiClient) -> Result<Vec<DatasetDescriptor>>;

    async fn describe_columns(
        &self,
        client: &ApiClient,
        dataset: &DatasetDescriptor,
    ) -> Result<Vec<Column>>;

    /// Raw rows for a table, one JSON object per row.
    async fn fetch_rows(&self, client: &ApiClient, table: &TableSchema) -> Result<Vec<Value>>;

    /// Value stored in [`TableSchema::fetch_key`] for `dataset`.
    fn fetch_key(&self, dataset: &DatasetDescriptor) -> String;

    async fn table_schemas(&self, client: &ApiClient) -> Result<Vec<TableSchema>> {
        assemble_table_schemas(self, client).await
    }
}

pub struct DiscoverySource {
    schema_source: SchemaSource,
}

impl DiscoverySource {
    pub fn new(schema_source: SchemaSource) -> Self {
        Self { schema_source }
    }
}

#[async_trait]
impl DataSource for DiscoverySource {
    async fn list_datasets(&self, client: &ApiClient) -> Result<Vec<DatasetDescriptor>> {
        let path = format!(
            "dataset/search?apiAccessible=true&offset=0&limit={}",
            client.config().dataset_limit
        );
        let response: SearchResponse = client.get_json(&path).await?;
        Ok(response.results)
    }

    async fn describe_columns(
        &self,
        client: &ApiClient,
        dataset: &DatasetDescriptor,
    ) -> Result<Vec<Column>> {
        let path = format!("dataset/{}/dictionary", dataset.id);
        let dictionary: Vec<ColumnSpec> = client.get_json(&path).await?;
        Ok(dictionary_to_columns(
            &dictionary,
            &ColumnOptions::from(client.config()),
        ))
    }

    async fn fetch_rows(&self, client: &ApiClient, table: &TableSchema) -> Result<Vec<Value>> {
        let path = format!("dataset/{}/query?_format=json", table.fetch_key);
        client.get_json(&path).await
    }

    fn fetch_key(&self, dataset: &DatasetDescriptor) -> String {
        dataset.id.clone()
    }

    async fn table_schemas(&self, client: &ApiClient) -> Result<Vec<TableSchema>> {
        match self.schema_source {
            SchemaSource::Catalog => assemble_table_schemas(self, client).await,
            SchemaSource::TableInfo => {
                let tables: Vec<TableSchema> = client.get_json("tableau/table_info").await?;
                tracing::info!("Table info listed {} tables", tables.len());
                Ok(tables)
            }
        }
    }
}

pub struct QuerySource {
    query: String,
    schema_source: SchemaSource,
}

impl QuerySource {
    pub const DATASET_ID: &'static str = "query";

    pub fn new(query: impl Into<String>, schema_source: SchemaSource) -> Self {
        Self {
            query: query.into(),
            schema_source,
        }
    }
}

#[async_trait]
impl DataSource for QuerySource {
    async fn list_datasets(&self, _client: &ApiClient) -> Result<Vec<DatasetDescriptor>> {
        Ok(vec![DatasetDescriptor {
            id: Self::DATASET_ID.to_string(),
            title: Self::DATASET_ID.to_string(),
            file_types: vec!["CSV".to_string()],
        }])
    }

    async fn describe_columns(
        &self,
        client: &ApiClient,
        _dataset: &DatasetDescriptor,
    ) -> Result<Vec<Column>> {
        match self.schema_source {
            SchemaSource::Catalog => {
                let dictionary: Vec<ColumnSpec> = client
                    .post_text_json("query/describe?_format=json", &self.query)
                    .await?;
                Ok(dictionary_to_columns(
                    &dictionary,
                    &ColumnOptions::from(client.config()),
                ))
            }
            SchemaSource::TableInfo => {
                client
                    .post_text_json("tableau/query_describe?_format=json", &self.query)
                    .await
            }
        }
    }

    async fn fetch_rows(&self, client: &ApiClient, table: &TableSchema) -> Result<Vec<Value>> {
        client
            .post_text_json("query?_format=json", &table.fetch_key)
            .await
    }

    fn fetch_key(&self, _dataset: &DatasetDescriptor) -> String {
        self.query.clone()
    }
}

/// The data source chosen for a session.
pub enum Backend {
    Discovery(DiscoverySource),
    Query(QuerySource),
}

impl Backend {
    pub fn for_connection(connection: &ConnectionData, schema_source: SchemaSource) -> Self {
        match connection.mode {
            ConnectionMode::Discovery => Backend::Discovery(DiscoverySource::new(schema_source)),
            ConnectionMode::Query => {
                Backend::Query(QuerySource::new(connection.query_text(), schema_source))
            }
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        match self {
            Backend::Discovery(_) => ConnectionMode::Discovery,
            Backend::Query(_) => ConnectionMode::Query,
        }
    }

    pub fn source(&self) -> &dyn DataSource {
        match self {
            Backend::Discovery(source) => source,
            Backend::Query(source) => source,
        }
    }
}
