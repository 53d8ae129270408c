use std::sync::Arc;

use swap_client::{ApiClient, ApiError, MemoryTokenStore};
use swap_engine::PillarGridManager;

use crate::config::CliConfig;

/// Configuration plus the grid manager every command runs against
#[derive(Clone)]
pub struct AppState {
    pub config: CliConfig,
    pub manager: PillarGridManager<ApiClient>,
}

impl AppState {
    /// A token given on the command line takes precedence over the config file.
    pub fn new(config: CliConfig, token: Option<String>) -> Result<Self, ApiError> {
        let tokens = Arc::new(MemoryTokenStore::new(
            token.or_else(|| config.access_token.clone()),
        ));
        let client = ApiClient::new(config.client_config(), tokens)?;
        Ok(Self {
            config,
            manager: PillarGridManager::new(client),
        })
    }
}
