//! Engine configuration. Defaults mirror the refresh cadence of the original
//! dashboard (inventory/devices every 30s, tasks every 3s) and can be
//! overridden from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sync engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Backend base URL, e.g. `http://localhost:8000`.
    pub api_url: String,
    /// Optional bearer token for authenticated deployments.
    pub api_token: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Inventory poll interval in seconds.
    pub inventory_interval_secs: u64,
    /// Device poll interval in seconds.
    pub device_interval_secs: u64,
    /// Task-queue poll interval in seconds.
    pub task_interval_secs: u64,
    /// Days without a sighting before an item counts as stale.
    pub stale_days: u32,
    /// Count at or below which an item counts as low stock.
    pub low_stock_threshold: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: std::env::var("PANTRY_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            api_token: std::env::var("PANTRY_API_TOKEN").ok(),
            request_timeout_secs: 10,
            inventory_interval_secs: 30,
            device_interval_secs: 30,
            task_interval_secs: 3,
            stale_days: 7,
            low_stock_threshold: 1,
        }
    }
}

impl SyncConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn inventory_interval(&self) -> Duration {
        Duration::from_secs(self.inventory_interval_secs)
    }

    pub fn device_interval(&self) -> Duration {
        Duration::from_secs(self.device_interval_secs)
    }

    pub fn task_interval(&self) -> Duration {
        Duration::from_secs(self.task_interval_secs)
    }
}
