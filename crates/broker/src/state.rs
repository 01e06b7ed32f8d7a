use std::sync::Arc;

use sandbox_core::scripting::container::ContainerExecutor;

use crate::config::BrokerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; holds only read-only configuration. No request or
/// result data is ever stored here.
#[derive(Clone)]
pub struct AppState {
    /// Broker configuration.
    pub config: Arc<BrokerConfig>,
    /// Launcher for one-shot sandbox containers.
    pub executor: Arc<ContainerExecutor>,
}

impl AppState {
    pub fn new(config: BrokerConfig) -> Self {
        let executor = Arc::new(config.executor());
        Self {
            config: Arc::new(config),
            executor,
        }
    }
}
