use std::path::{Path, PathBuf};

use anyhow::Result;
use catalog_connector_core::Host;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// The two slots a host persists for the connector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostState {
    #[serde(default)]
    pub connection_data: String,
    #[serde(default)]
    pub password: String,
}

/// Host backed by a JSON state file, so one invocation can submit and a
/// later one can list tables or fetch data.
pub struct StateFileHost {
    path: PathBuf,
    state: Mutex<HostState>,
    submitted: Mutex<bool>,
    aborts: Mutex<Vec<String>>,
}

impl StateFileHost {
    pub fn load(path: &Path) -> Result<Self> {
        let state = if path.exists() {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str(&text)
                .map_err(|e| anyhow::anyhow!("Invalid state file {:?}: {}", path, e))?
        } else {
            tracing::debug!("No state file at {:?}, starting empty", path);
            HostState::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
            submitted: Mutex::new(false),
            aborts: Mutex::new(Vec::new()),
        })
    }

    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&*self.state.lock())?;
        std::fs::write(&self.path, json)?;
        tracing::debug!("Saved host state to {:?}", self.path);
        Ok(())
    }

    pub fn was_submitted(&self) -> bool {
        *self.submitted.lock()
    }

    /// Fail with the first abort message, if the connector aborted.
    pub fn check_aborted(&self) -> Result<()> {
        match self.aborts.lock().first() {
            Some(message) => anyhow::bail!("{}", message),
            None => Ok(()),
        }
    }
}

impl Host for StateFileHost {
    fn connection_data(&self) -> String {
        self.state.lock().connection_data.clone()
    }

    fn set_connection_data(&self, data: String) {
        self.state.lock().connection_data = data;
    }

    fn password(&self) -> String {
        self.state.lock().password.clone()
    }

    fn set_password(&self, password: String) {
        self.state.lock().password = password;
    }

    fn submit(&self) {
        *self.submitted.lock() = true;
    }

    fn abort_with_error(&self, message: &str) {
        self.aborts.lock().push(message.to_string());
    }
}
