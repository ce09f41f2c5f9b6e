//! ============================================================================
//! Device & Task Monitors - Fleet and Pipeline Status
//! ============================================================================
//! Periodic wholesale refresh of camera devices and processing tasks, plus
//! the on-demand pieces the refresh cycle does not cover: per-device health
//! probes, device deletion, and client-side task filtering.
//! ============================================================================

use std::sync::Arc;

use tracing::{debug, info};

use crate::gateway::InventoryGateway;
use crate::state::{DeviceState, TaskState};
use crate::types::{Device, DeviceHealth, Result, Task, TaskStatus};

// ============================================================================
// Device Monitor
// ============================================================================

pub struct DeviceMonitor {
    gateway: Arc<dyn InventoryGateway>,
    devices: Arc<DeviceState>,
}

impl DeviceMonitor {
    pub fn new(gateway: Arc<dyn InventoryGateway>, devices: Arc<DeviceState>) -> Self {
        Self { gateway, devices }
    }

    /// Replace the device list with the server's snapshot. A selection whose
    /// device is no longer reported is cleared along with its health detail.
    pub async fn refresh(&self) -> Result<usize> {
        let snapshot = self.gateway.fetch_devices().await?;
        let count = snapshot.len();
        self.devices.replace_all(snapshot).await;
        debug!(devices = count, "device snapshot applied");
        Ok(count)
    }

    /// Focus a device and fetch its health detail outside the periodic
    /// cycle. The detail is cached on the canonical state until the
    /// selection changes or the device vanishes.
    pub async fn select(&self, id: &str) -> Result<DeviceHealth> {
        self.devices.select(Some(id.to_string())).await;
        let health = self.gateway.fetch_device_health(id).await?;
        self.devices.set_health(health.clone()).await;
        Ok(health)
    }

    /// Re-probe health for a device without changing the selection cache.
    pub async fn fetch_health(&self, id: &str) -> Result<DeviceHealth> {
        self.gateway.fetch_device_health(id).await
    }

    /// Delete a device on the backend, then drop it locally. If it was the
    /// selected device the selection and cached health clear with it.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.gateway.delete_device(id).await?;
        self.devices.remove(id).await;
        info!(device = id, "device deleted");
        Ok(())
    }

    pub async fn devices(&self) -> Vec<Device> {
        self.devices.devices().await
    }

    pub async fn selected(&self) -> Option<String> {
        self.devices.selected().await
    }

    pub async fn health(&self) -> Option<DeviceHealth> {
        self.devices.health().await
    }
}

// ============================================================================
// Task Monitor
// ============================================================================

pub struct TaskMonitor {
    gateway: Arc<dyn InventoryGateway>,
    tasks: Arc<TaskState>,
}

impl TaskMonitor {
    pub fn new(gateway: Arc<dyn InventoryGateway>, tasks: Arc<TaskState>) -> Self {
        Self { gateway, tasks }
    }

    pub async fn refresh(&self) -> Result<usize> {
        let snapshot = self.gateway.fetch_tasks().await?;
        let count = snapshot.len();
        self.tasks.replace_all(snapshot).await;
        debug!(tasks = count, "task snapshot applied");
        Ok(count)
    }

    /// Filter the canonical list client-side; no fetch is issued.
    pub async fn filtered(&self, status: Option<TaskStatus>) -> Vec<Task> {
        let tasks = self.tasks.tasks().await;
        match status {
            Some(wanted) => tasks.into_iter().filter(|t| t.status == wanted).collect(),
            None => tasks,
        }
    }
}
