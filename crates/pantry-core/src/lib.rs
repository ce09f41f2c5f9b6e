//! ============================================================================
//! PANTRY-CORE: Inventory Sync Engine
//! ============================================================================
//! This crate handles all backend logic for pantry synchronization:
//! - Polling scheduler with skip-if-busy refresh streams
//! - HTTP gateway to the vision-capture backend
//! - Manual override resolution (set/add/subtract) and reconciliation
//! - Derived analytics (low stock, stale, expiring soon, confidence)
//! - Device fleet and processing-task monitors
//! ============================================================================

pub mod config;
pub mod engine;
pub mod gateway;
pub mod metrics;
pub mod monitors;
pub mod overrides;
pub mod reconciler;
pub mod scheduler;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types for convenience
pub use config::SyncConfig;
pub use engine::PantryEngine;
pub use gateway::{HttpGateway, InventoryGateway};
pub use metrics::DerivedView;
pub use monitors::{DeviceMonitor, TaskMonitor};
pub use reconciler::Reconciler;
pub use scheduler::PollScheduler;
pub use state::SyncState;
pub use types::*;
