use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, Result};

/// Which backing API supplies tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Tables come from the catalog search API.
    #[default]
    Discovery,
    /// A single table is the result of a user-supplied query.
    Query,
}

impl ConnectionMode {
    /// Interpret the `mode` launch parameter. Anything other than `query`
    /// means discovery.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("query") => ConnectionMode::Query,
            _ => ConnectionMode::Discovery,
        }
    }
}

impl FromStr for ConnectionMode {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "discovery" => Ok(ConnectionMode::Discovery),
            "query" => Ok(ConnectionMode::Query),
            other => Err(ConnectorError::Config(format!(
                "unknown connection mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionMode::Discovery => write!(f, "discovery"),
            ConnectionMode::Query => write!(f, "query"),
        }
    }
}

/// Connector state kept in the host's single connection-data string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConnectionData {
    pub mode: ConnectionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl ConnectionData {
    pub fn discovery() -> Self {
        Self {
            mode: ConnectionMode::Discovery,
            query: None,
        }
    }

    pub fn query(text: impl Into<String>) -> Self {
        Self {
            mode: ConnectionMode::Query,
            query: Some(text.into()),
        }
    }

    pub fn query_text(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the stored string, falling back to the default state when it is
    /// empty or malformed.
    pub fn parse_or_default(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }

        match serde_json::from_str(raw) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Ignoring malformed connection data: {}", e);
                Self::default()
            }
        }
    }
}

/// Result carried back by the identity provider redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginRedirect {
    Code(String),
    Error {
        error: String,
        description: Option<String>,
    },
}

/// Query parameters the connector page is launched with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchParams {
    pub mode: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl LaunchParams {
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| ConnectorError::Config(format!("invalid launch url '{}': {}", url, e)))?;

        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let value = value.into_owned();
            match key.as_ref() {
                "mode" => params.mode = Some(value),
                "code" => params.code = Some(value),
                "error" => params.error = Some(value),
                "error_description" => params.error_description = Some(value),
                _ => {}
            }
        }

        Ok(params)
    }

    pub fn connection_mode(&self) -> ConnectionMode {
        ConnectionMode::from_param(self.mode.as_deref())
    }

    /// An error from the provider wins over a code.
    pub fn login_redirect(&self) -> Option<LoginRedirect> {
        if let Some(error) = &self.error {
            return Some(LoginRedirect::Error {
                error: error.clone(),
                description: self.error_description.clone(),
            });
        }

        self.code.clone().map(LoginRedirect::Code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_connection_data_bytes() {
        let data = ConnectionData::query("select * from constellation");
        let json = data.to_json().unwrap();
        assert_eq!(json, r#"{"mode":"query","query":"select * from constellation"}"#);

        let parsed = ConnectionData::parse_or_default(&json);
        assert_eq!(parsed, data);
        assert_eq!(parsed.mode, ConnectionMode::Query);
        assert_eq!(parsed.query_text(), "select * from constellation");
    }

    #[test]
    fn test_discovery_connection_data_bytes() {
        let json = ConnectionData::discovery().to_json().unwrap();
        assert_eq!(json, r#"{"mode":"discovery"}"#);
        assert_eq!(ConnectionData::parse_or_default(&json), ConnectionData::discovery());
    }

    #[test]
    fn test_malformed_connection_data_degrades() {
        for raw in ["", "select * from constellation", "{\"mode\":", "{\"mode\":\"sideways\"}"] {
            let parsed = ConnectionData::parse_or_default(raw);
            assert_eq!(parsed.mode, ConnectionMode::Discovery);
            assert_eq!(parsed.query_text(), "");
        }
    }

    #[test]
    fn test_mode_param() {
        assert_eq!(ConnectionMode::from_param(Some("query")), ConnectionMode::Query);
        assert_eq!(ConnectionMode::from_param(Some("Query")), ConnectionMode::Discovery);
        assert_eq!(ConnectionMode::from_param(None), ConnectionMode::Discovery);
        assert!("bogus".parse::<ConnectionMode>().is_err());
        assert_eq!("query".parse::<ConnectionMode>().unwrap(), ConnectionMode::Query);
    }

    #[test]
    fn test_launch_params_code() {
        let params =
            LaunchParams::from_url("https://data.example.com/tableau/?mode=query&code=abc%2F123")
                .unwrap();
        assert_eq!(params.connection_mode(), ConnectionMode::Query);
        assert_eq!(
            params.login_redirect(),
            Some(LoginRedirect::Code("abc/123".to_string()))
        );
    }

    #[test]
    fn test_launch_params_error_wins() {
        let params = LaunchParams::from_url(
            "https://data.example.com/tableau/?code=abc&error=access_denied&error_description=User%20cancelled",
        )
        .unwrap();
        assert_eq!(
            params.login_redirect(),
            Some(LoginRedirect::Error {
                error: "access_denied".to_string(),
                description: Some("User cancelled".to_string()),
            })
        );
    }

    #[test]
    fn test_launch_params_without_query() {
        let params = LaunchParams::from_url("https://data.example.com/tableau/").unwrap();
        assert_eq!(params, LaunchParams::default());
        assert_eq!(params.login_redirect(), None);
        assert!(LaunchParams::from_url("not a url").is_err());
    }
}
