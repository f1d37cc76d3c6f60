use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::Credentials;
use crate::client::ApiClient;
use crate::config::{ConnectorConfig, SchemaJoin};
use crate::error::{ConnectorError, Result};
use crate::mode::{ConnectionData, ConnectionMode};
use crate::source::{Backend, DataSource};
use crate::transport::Transport;
use crate::translate::{dataset_to_table_schema, rows_to_values, UniqueIds};
use crate::types::TableSchema;

/// List datasets, keep those with an allowed file type, then describe each
/// one concurrently. The result keeps the listing order.
pub async fn assemble_table_schemas<S>(source: &S, client: &ApiClient) -> Result<Vec<TableSchema>>
where
    S: DataSource + ?Sized,
{
    let datasets = source.list_datasets(client).await?;
    let listed = datasets.len();

    let allowed = &client.config().file_types;
    let candidates: Vec<_> = datasets
        .into_iter()
        .filter(|dataset| dataset.supports_any(allowed))
        .collect();

    tracing::info!(
        "Describing {} of {} listed datasets",
        candidates.len(),
        listed
    );

    let describe = candidates.iter().map(|dataset| async move {
        let columns = source.describe_columns(client, dataset).await?;
        let mut table = dataset_to_table_schema(dataset, source.fetch_key(dataset));
        table.columns = columns;
        Ok::<_, ConnectorError>(table)
    });

    let mut tables = match client.config().schema_join {
        SchemaJoin::AllOrNothing => try_join_all(describe).await?,
        SchemaJoin::SkipFailed => join_all(describe)
            .await
            .into_iter()
            .zip(&candidates)
            .filter_map(|(result, dataset)| match result {
                Ok(table) => Some(table),
                Err(e) => {
                    tracing::warn!("Skipping dataset '{}': {}", dataset.id, e);
                    None
                }
            })
            .collect(),
    };

    let mut ids = UniqueIds::new();
    for table in &mut tables {
        table.id = ids.next(&table.id);
    }

    Ok(tables)
}

/// Everything one connector run needs: the parsed connection state, the
/// backend it selects, and an authorized API client.
pub struct Session {
    id: Uuid,
    connection: ConnectionData,
    backend: Backend,
    client: ApiClient,
}

impl Session {
    pub fn new(
        config: Arc<ConnectorConfig>,
        transport: Arc<dyn Transport>,
        connection: ConnectionData,
        password: &str,
    ) -> Self {
        let backend = Backend::for_connection(&connection, config.schema_source);
        let credentials = Credentials::from_config(&config.auth, password);
        let id = Uuid::new_v4();

        tracing::debug!("Session {} opened in {} mode", id, connection.mode);

        Self {
            id,
            connection,
            backend,
            client: ApiClient::new(config, transport, credentials),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> ConnectionMode {
        self.backend.mode()
    }

    pub fn connection(&self) -> &ConnectionData {
        &self.connection
    }

    pub async fn table_schemas(&self) -> Result<Vec<TableSchema>> {
        let tables = self.backend.source().table_schemas(&self.client).await?;
        tracing::info!("Session {} built {} table schemas", self.id, tables.len());
        Ok(tables)
    }

    /// Rows for `table`, each ordered like `table.columns`.
    pub async fn table_rows(&self, table: &TableSchema) -> Result<Vec<Vec<Value>>> {
        let rows = self.backend.source().fetch_rows(&self.client, table).await?;
        tracing::info!(
            "Session {} fetched {} rows for table '{}'",
            self.id,
            rows.len(),
            table.id
        );
        Ok(rows_to_values(&table.columns, &rows))
    }
}

/// Pick the table with host id `table_id` out of an already built schema list.
pub fn find_table(tables: Vec<TableSchema>, table_id: &str) -> Result<TableSchema> {
    tables
        .into_iter()
        .find(|table| table.id == table_id)
        .ok_or_else(|| ConnectorError::TableNotFound(table_id.to_string()))
}
