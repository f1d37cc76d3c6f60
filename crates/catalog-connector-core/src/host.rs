//! The plugin contract with the BI host.
//!
//! The host owns two persisted string slots (connection data and password),
//! accepts a submission, and can be told to abort the current operation.
//! [`WebDataConnector`] drives a [`Session`] on the host's behalf and routes
//! every failure to [`Host::abort_with_error`].

use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::config::ConnectorConfig;
use crate::connector::Session;
use crate::error::{ConnectorError, Result};
use crate::mode::{ConnectionData, ConnectionMode};
use crate::transport::Transport;
use crate::types::TableSchema;

pub trait Host: Send + Sync {
    fn connection_data(&self) -> String;

    fn set_connection_data(&self, data: String);

    fn password(&self) -> String;

    fn set_password(&self, password: String);

    /// Hand control to the host once the connector is configured.
    fn submit(&self);

    fn abort_with_error(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Hidden,
    Visible,
}

/// The inline error element on the submission form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorBanner {
    pub display: Visibility,
    pub message: String,
}

impl ErrorBanner {
    pub fn show(&mut self, message: impl Into<String>) {
        self.display = Visibility::Visible;
        self.message = message.into();
    }

    pub fn hide(&mut self) {
        self.display = Visibility::Hidden;
        self.message.clear();
    }
}

/// What the user entered when launching the connector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitRequest {
    pub mode: ConnectionMode,
    pub query: String,
    pub api_key: Option<String>,
}

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a query";

/// Persist the user's choices in the host and submit.
///
/// An empty query in query mode shows the inline error and leaves the host
/// untouched.
pub fn submit(host: &dyn Host, request: &SubmitRequest, banner: &mut ErrorBanner) -> Result<ConnectionData> {
    let connection = match request.mode {
        ConnectionMode::Query if request.query.trim().is_empty() => {
            banner.show(EMPTY_QUERY_MESSAGE);
            return Err(ConnectorError::EmptyQuery);
        }
        ConnectionMode::Query => ConnectionData::query(request.query.clone()),
        ConnectionMode::Discovery => ConnectionData::discovery(),
    };

    banner.hide();
    host.set_connection_data(connection.to_json()?);
    if let Some(key) = &request.api_key {
        host.set_password(key.clone());
    }

    tracing::info!("Submitting connector in {} mode", connection.mode);
    host.submit();
    Ok(connection)
}

/// Connector bound to a host.
pub struct WebDataConnector {
    config: Arc<ConnectorConfig>,
    transport: Arc<dyn Transport>,
    host: Arc<dyn Host>,
    session: OnceLock<Session>,
}

impl WebDataConnector {
    pub fn new(
        config: Arc<ConnectorConfig>,
        transport: Arc<dyn Transport>,
        host: Arc<dyn Host>,
    ) -> Self {
        Self {
            config,
            transport,
            host,
            session: OnceLock::new(),
        }
    }

    /// The session, built from the host's slots on first use.
    pub fn session(&self) -> &Session {
        self.session.get_or_init(|| {
            let connection = ConnectionData::parse_or_default(&self.host.connection_data());
            Session::new(
                Arc::clone(&self.config),
                Arc::clone(&self.transport),
                connection,
                &self.host.password(),
            )
        })
    }

    pub fn init<F: FnOnce()>(&self, callback: F) {
        let session = self.session();
        tracing::debug!("Connector initialized with session {}", session.id());
        callback();
    }

    pub async fn get_schema<F>(&self, callback: F)
    where
        F: FnOnce(Vec<TableSchema>),
    {
        match self.session().table_schemas().await {
            Ok(tables) => callback(tables),
            Err(e) => self.abort(e),
        }
    }

    pub async fn get_data<A, D>(&self, table: &TableSchema, append_rows: A, done: D)
    where
        A: FnOnce(Vec<Vec<Value>>),
        D: FnOnce(),
    {
        match self.session().table_rows(table).await {
            Ok(rows) => {
                append_rows(rows);
                done();
            }
            Err(e) => self.abort(e),
        }
    }

    fn abort(&self, error: ConnectorError) {
        tracing::error!("Aborting: {}", error);
        self.host.abort_with_error(&error.to_string());
    }
}
