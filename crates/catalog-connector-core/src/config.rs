use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, Result};
use crate::types::HostDataType;

/// API root used when neither the config file nor the CLI supplies one.
///
/// Deployments can bake a different root in with `CATALOG_API_BASE_URL` at
/// build time.
pub const DEFAULT_API_BASE_URL: &str = match option_env!("CATALOG_API_BASE_URL") {
    Some(url) => url,
    None => "http://localhost:4000/api/v1/",
};

pub const DEFAULT_DATASET_LIMIT: u64 = 1_000_000;

/// Where discovery-mode table definitions come from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSource {
    /// `dataset/search` plus one `dataset/{id}/dictionary` per dataset.
    #[default]
    Catalog,
    /// `tableau/table_info`, which returns host-shaped tables directly.
    TableInfo,
}

/// How the dictionary fan-out treats a failing dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchemaJoin {
    /// Any failure fails the whole listing.
    #[default]
    AllOrNothing,
    /// Failing datasets are logged and left out.
    SkipFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthConfig {
    /// Identity provider root; the token endpoint is `{auth_url}/oauth/token`.
    pub auth_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Lifetime assumed for access tokens when the provider omits `expires_in`.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Tokens are treated as expired this long before their real expiry.
    #[serde(default = "default_expiry_skew_secs")]
    pub expiry_skew_secs: u64,
}

/// Credential scheme. Only one is active per deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum AuthConfig {
    #[default]
    None,
    ApiKey {
        #[serde(default = "default_api_key_header")]
        header: String,
    },
    Oauth(OAuthConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectorConfig {
    pub api_base_url: String,
    pub dataset_limit: u64,
    /// Datasets must offer at least one of these file types to be listed.
    pub file_types: Vec<String>,
    pub schema_source: SchemaSource,
    pub schema_join: SchemaJoin,
    /// Lowercase column aliases and fetch keys, as early deployments did.
    pub lowercase_column_names: bool,
    /// Host type for dictionary tags outside the known vocabulary.
    pub unknown_type_fallback: Option<HostDataType>,
    pub request_timeout_secs: u64,
    pub auth: AuthConfig,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            dataset_limit: DEFAULT_DATASET_LIMIT,
            file_types: vec!["CSV".to_string(), "GEOJSON".to_string()],
            schema_source: SchemaSource::default(),
            schema_join: SchemaJoin::default(),
            lowercase_column_names: false,
            unknown_type_fallback: None,
            request_timeout_secs: 30,
            auth: AuthConfig::default(),
        }
    }
}

impl ConnectorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| ConnectorError::Config(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// Absolute URL for an API path relative to `api_base_url`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_audience() -> String {
    "discovery_api".to_string()
}

fn default_scope() -> String {
    "offline_access".to_string()
}

fn default_token_ttl_secs() -> u64 {
    3600
}

fn default_expiry_skew_secs() -> u64 {
    30
}

fn default_api_key_header() -> String {
    "api_key".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ConnectorConfig::default();
        assert_eq!(config.dataset_limit, 1_000_000);
        assert_eq!(config.file_types, vec!["CSV", "GEOJSON"]);
        assert_eq!(config.auth, AuthConfig::None);
        assert_eq!(config.schema_join, SchemaJoin::AllOrNothing);
    }

    #[test]
    fn test_endpoint_joins_single_slash() {
        let mut config = ConnectorConfig::default();
        config.api_base_url = "http://api.example.com/api/v1/".to_string();
        assert_eq!(
            config.endpoint("dataset/abc/dictionary"),
            "http://api.example.com/api/v1/dataset/abc/dictionary"
        );

        config.api_base_url = "http://api.example.com/api/v1".to_string();
        assert_eq!(
            config.endpoint("/query?_format=json"),
            "http://api.example.com/api/v1/query?_format=json"
        );
    }

    #[test]
    fn test_parse_oauth_config() {
        let config = ConnectorConfig::from_toml_str(
            r#"
            api_base_url = "https://data.example.com/api/v1/"
            schema_source = "table_info"
            schema_join = "skip_failed"

            [auth]
            scheme = "oauth"
            auth_url = "https://login.example.com"
            client_id = "abc123"
            redirect_uri = "https://data.example.com/tableau/connector.html"
            "#,
        )
        .unwrap();

        assert_eq!(config.schema_source, SchemaSource::TableInfo);
        assert_eq!(config.schema_join, SchemaJoin::SkipFailed);
        assert_eq!(config.dataset_limit, DEFAULT_DATASET_LIMIT);
        match config.auth {
            AuthConfig::Oauth(oauth) => {
                assert_eq!(oauth.client_id, "abc123");
                assert_eq!(oauth.audience, "discovery_api");
                assert_eq!(oauth.scope, "offline_access");
                assert_eq!(oauth.token_ttl_secs, 3600);
            }
            other => panic!("unexpected auth config: {:?}", other),
        }
    }

    #[test]
    fn test_parse_api_key_config_from_file() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "unknown_type_fallback = \"string\"\n[auth]\nscheme = \"api_key\""
        )
        .unwrap();

        let config = ConnectorConfig::from_file(file.path())?;
        assert_eq!(config.unknown_type_fallback, Some(HostDataType::String));
        assert_eq!(
            config.auth,
            AuthConfig::ApiKey {
                header: "api_key".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let err = ConnectorConfig::from_toml_str("dataset_limit = \"lots\"").unwrap_err();
        assert!(matches!(err, ConnectorError::Config(_)));
    }
}
