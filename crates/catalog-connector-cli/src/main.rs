mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use catalog_connector_core::{
    complete_login, find_table, new_state_nonce, submit, AuthConfig, ConnectionMode,
    ConnectorConfig, ErrorBanner, HttpTransport, LaunchParams, LoginControl, OAuthClient,
    SubmitRequest, TableSchema, Transport, Visibility, WebDataConnector,
};
use clap::{Parser, Subcommand};

use crate::state::StateFileHost;

#[derive(Parser)]
#[command(name = "catalog-connector")]
#[command(about = "Expose catalog datasets and ad-hoc queries as host tables")]
#[command(version)]
struct Cli {
    #[arg(long, help = "TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(long, default_value = "catalog-connector.json", help = "Host state file (connection data and credentials)")]
    state: PathBuf,

    #[arg(long, help = "API base URL, overriding the configuration file")]
    base_url: Option<String>,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store the connection mode (and query or API key) in the state file
    Submit {
        #[arg(long, help = "Connection mode: discovery or query")]
        mode: Option<ConnectionMode>,

        #[arg(long, help = "Launch URL whose `mode` parameter selects the mode when --mode is absent")]
        launch_url: Option<String>,

        #[arg(long, default_value = "", help = "Query text, required in query mode")]
        query: String,

        #[arg(long, help = "API key to send with every request")]
        api_key: Option<String>,
    },
    /// Print the identity provider login URL
    AuthorizeUrl,
    /// Finish a login from the URL the identity provider redirected to
    Login {
        #[arg(long, help = "Redirect URL carrying `code` or `error`")]
        redirect_url: String,
    },
    /// Print the table schemas as JSON
    Tables,
    /// Print the rows of one table, one JSON array per line
    Data {
        #[arg(long, help = "Table id as printed by `tables`")]
        table: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration, then apply command line overrides
    let mut config = match &cli.config {
        Some(path) => ConnectorConfig::from_file(path)?,
        None => ConnectorConfig::default(),
    };
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url;
    }

    tracing::debug!("API base URL: {}", config.api_base_url);

    let host = Arc::new(StateFileHost::load(&cli.state)?);
    let config = Arc::new(config);

    match cli.command {
        Command::Submit {
            mode,
            launch_url,
            query,
            api_key,
        } => {
            let mode = match (mode, launch_url) {
                (Some(mode), _) => mode,
                (None, Some(url)) => LaunchParams::from_url(&url)?.connection_mode(),
                (None, None) => ConnectionMode::default(),
            };

            let request = SubmitRequest {
                mode,
                query,
                api_key,
            };
            let mut banner = ErrorBanner::default();
            if let Err(e) = submit(host.as_ref(), &request, &mut banner) {
                if banner.display == Visibility::Visible {
                    anyhow::bail!("{}", banner.message);
                }
                return Err(e.into());
            }
            if host.was_submitted() {
                host.save()?;
                tracing::info!("Connection saved to {:?}", cli.state);
            }
        }
        Command::AuthorizeUrl => {
            let client = oauth_client(&config)?;
            println!("{}", client.authorization_url(&new_state_nonce())?);
        }
        Command::Login { redirect_url } => {
            let client = oauth_client(&config)?;
            let redirect = LaunchParams::from_url(&redirect_url)?
                .login_redirect()
                .ok_or_else(|| anyhow::anyhow!("Redirect URL has neither a code nor an error"))?;

            // Exchange the code; the refresh token lands in the password slot
            let transport = HttpTransport::new(config.request_timeout())?;
            let mut control = LoginControl::default();
            let result =
                complete_login(&client, &transport, host.as_ref(), redirect, &mut control).await;

            if let Some(error) = control.error {
                anyhow::bail!("Login failed: {}", error);
            }
            result?;
            host.save()?;
            tracing::info!("{}", control.label);
        }
        Command::Tables => {
            let connector = connector(&config, &host)?;
            let mut tables = Vec::new();
            connector.init(|| {});

            let session = connector.session();
            tracing::info!("Listing tables in {} mode", session.mode());
            if session.mode() == ConnectionMode::Query {
                tracing::debug!("Query: {}", session.connection().query_text());
            }

            connector.get_schema(|schemas| tables = schemas).await;
            host.check_aborted()?;

            println!("{}", serde_json::to_string_pretty(&tables)?);
        }
        Command::Data { table } => {
            let connector = connector(&config, &host)?;
            connector.init(|| {});

            let mut schemas: Vec<TableSchema> = Vec::new();
            connector.get_schema(|found| schemas = found).await;
            host.check_aborted()?;

            // Resolve the table against the schemas just built
            let table = find_table(schemas, &table)?;

            let mut rows = Vec::new();
            connector
                .get_data(&table, |appended| rows = appended, || {
                    tracing::debug!("Data fetch complete")
                })
                .await;
            host.check_aborted()?;

            for row in &rows {
                println!("{}", serde_json::to_string(row)?);
            }
            tracing::info!("Wrote {} rows from '{}'", rows.len(), table.id);
        }
    }

    Ok(())
}

fn connector(config: &Arc<ConnectorConfig>, host: &Arc<StateFileHost>) -> Result<WebDataConnector> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.request_timeout())?);
    Ok(WebDataConnector::new(
        Arc::clone(config),
        transport,
        host.clone(),
    ))
}

fn oauth_client(config: &ConnectorConfig) -> Result<OAuthClient> {
    match &config.auth {
        AuthConfig::Oauth(oauth) => Ok(OAuthClient::new(oauth.clone())),
        _ => anyhow::bail!("This command needs `scheme = \"oauth\"` in the [auth] configuration"),
    }
}
