//! ============================================================================
//! Pantry Engine - Top-Level Sync Orchestration
//! ============================================================================
//! Owns the canonical state, the gateway, and the poll scheduler, and wires
//! the reconciler and monitors onto named refresh streams:
//!
//!   inventory  every `inventory_interval_secs` (default 30 s)
//!   devices    every `device_interval_secs`    (default 30 s)
//!   tasks      every `task_interval_secs`      (default 3 s)
//!
//! Streams are independent: a slow or failing inventory fetch never delays
//! the task poll. `stop()` (and `Drop`) aborts every stream, which cancels
//! any in-flight fetch before it can write.
//! ============================================================================

use std::sync::Arc;

use tracing::info;

use crate::config::SyncConfig;
use crate::gateway::{HttpGateway, InventoryGateway};
use crate::monitors::{DeviceMonitor, TaskMonitor};
use crate::reconciler::Reconciler;
use crate::scheduler::{PollScheduler, StreamStatus};
use crate::state::SyncState;
use crate::types::{OverrideRequest, Result};

use futures_util::FutureExt;

pub const STREAM_INVENTORY: &str = "inventory";
pub const STREAM_DEVICES: &str = "devices";
pub const STREAM_TASKS: &str = "tasks";

pub struct PantryEngine {
    config: SyncConfig,
    state: Arc<SyncState>,
    gateway: Arc<dyn InventoryGateway>,
    scheduler: PollScheduler,
    reconciler: Arc<Reconciler>,
    device_monitor: Arc<DeviceMonitor>,
    task_monitor: Arc<TaskMonitor>,
}

impl PantryEngine {
    /// Build an engine talking to the real backend described by `config`.
    pub fn new(config: SyncConfig) -> Self {
        let gateway: Arc<dyn InventoryGateway> = Arc::new(HttpGateway::new(&config));
        Self::with_gateway(config, gateway)
    }

    /// Build an engine around an arbitrary gateway implementation.
    pub fn with_gateway(config: SyncConfig, gateway: Arc<dyn InventoryGateway>) -> Self {
        let state = Arc::new(SyncState::new(config.stale_days, config.low_stock_threshold));
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&gateway),
            Arc::clone(&state.inventory),
        ));
        let device_monitor = Arc::new(DeviceMonitor::new(
            Arc::clone(&gateway),
            Arc::clone(&state.devices),
        ));
        let task_monitor = Arc::new(TaskMonitor::new(
            Arc::clone(&gateway),
            Arc::clone(&state.tasks),
        ));
        Self {
            config,
            state,
            gateway,
            scheduler: PollScheduler::new(),
            reconciler,
            device_monitor,
            task_monitor,
        }
    }

    /// Register the three refresh streams. Each fires immediately, then on
    /// its interval. Idempotent: calling again restarts the streams.
    pub fn start(&self) {
        info!(
            inventory_secs = self.config.inventory_interval_secs,
            device_secs = self.config.device_interval_secs,
            task_secs = self.config.task_interval_secs,
            "starting sync streams"
        );

        let reconciler = Arc::clone(&self.reconciler);
        self.scheduler.start(
            STREAM_INVENTORY,
            "load inventory",
            self.config.inventory_interval(),
            move || {
                let reconciler = Arc::clone(&reconciler);
                async move { reconciler.refresh().await.map(|_| ()) }.boxed()
            },
        );

        let devices = Arc::clone(&self.device_monitor);
        self.scheduler.start(
            STREAM_DEVICES,
            "load devices",
            self.config.device_interval(),
            move || {
                let devices = Arc::clone(&devices);
                async move { devices.refresh().await.map(|_| ()) }.boxed()
            },
        );

        let tasks = Arc::clone(&self.task_monitor);
        self.scheduler.start(
            STREAM_TASKS,
            "load tasks",
            self.config.task_interval(),
            move || {
                let tasks = Arc::clone(&tasks);
                async move { tasks.refresh().await.map(|_| ()) }.boxed()
            },
        );
    }

    /// Abort all streams. In-flight fetches are cancelled, not drained.
    pub fn stop(&self) {
        info!("stopping sync streams");
        self.scheduler.stop_all();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running(STREAM_INVENTORY)
    }

    /// Apply a manual count correction and confirm it with an immediate
    /// fetch, independent of the inventory stream's schedule.
    pub async fn apply_override(&self, req: &OverrideRequest) -> Result<u32> {
        self.reconciler.apply_override(req).await
    }

    /// One inventory reconciliation right now, outside the schedule.
    pub async fn force_refresh(&self) -> Result<usize> {
        self.reconciler.refresh().await
    }

    pub fn state(&self) -> &Arc<SyncState> {
        &self.state
    }

    pub fn gateway(&self) -> &Arc<dyn InventoryGateway> {
        &self.gateway
    }

    pub fn devices(&self) -> &DeviceMonitor {
        &self.device_monitor
    }

    pub fn tasks(&self) -> &TaskMonitor {
        &self.task_monitor
    }

    pub fn stream_status(&self, name: &str) -> Option<StreamStatus> {
        self.scheduler.status(name)
    }
}
