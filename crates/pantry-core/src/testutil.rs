//! Shared in-memory gateway double for component tests. Backends are
//! scripted by setting snapshot data and optional per-operation failures;
//! call counters let tests assert exactly how many requests were issued.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::gateway::InventoryGateway;
use crate::types::{
    AnalyticsSnapshot, ChangeEntry, Device, DeviceHealth, DeviceStatus, ExportFormat,
    InventoryItem, OverridePayload, PantryError, Result, Task, TaskStatus,
};

#[derive(Default)]
pub struct MockGateway {
    items: Mutex<Vec<InventoryItem>>,
    devices: Mutex<Vec<Device>>,
    tasks: Mutex<Vec<Task>>,
    changes: Mutex<Vec<ChangeEntry>>,
    stats: Mutex<AnalyticsSnapshot>,
    export_body: Mutex<String>,

    overrides: Mutex<Vec<OverridePayload>>,
    deleted: Mutex<Vec<String>>,

    fetch_error: Mutex<Option<PantryError>>,
    override_error: Mutex<Option<PantryError>>,
    delete_error: Mutex<Option<PantryError>>,

    items_calls: AtomicUsize,
    devices_calls: AtomicUsize,
    tasks_calls: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- scripting ---------------------------------------------------------

    pub fn set_items(&self, items: Vec<InventoryItem>) {
        *lock(&self.items) = items;
    }

    pub fn set_devices(&self, devices: Vec<Device>) {
        *lock(&self.devices) = devices;
    }

    pub fn set_tasks(&self, tasks: Vec<Task>) {
        *lock(&self.tasks) = tasks;
    }

    pub fn set_changes(&self, changes: Vec<ChangeEntry>) {
        *lock(&self.changes) = changes;
    }

    pub fn set_export_body(&self, body: &str) {
        *lock(&self.export_body) = body.to_string();
    }

    /// Make every fetch_* call fail with `err` until cleared.
    pub fn fail_fetches(&self, err: PantryError) {
        *lock(&self.fetch_error) = Some(err);
    }

    pub fn fail_overrides(&self, err: PantryError) {
        *lock(&self.override_error) = Some(err);
    }

    pub fn fail_deletes(&self, err: PantryError) {
        *lock(&self.delete_error) = Some(err);
    }

    // ---- assertions --------------------------------------------------------

    pub fn fetch_items_calls(&self) -> usize {
        self.items_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_devices_calls(&self) -> usize {
        self.devices_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_tasks_calls(&self) -> usize {
        self.tasks_calls.load(Ordering::SeqCst)
    }

    pub fn override_calls(&self) -> usize {
        lock(&self.overrides).len()
    }

    pub fn last_override(&self) -> Option<OverridePayload> {
        lock(&self.overrides).last().cloned()
    }

    pub fn deleted_devices(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }

    // ---- fixture builders --------------------------------------------------

    pub fn item(name: &str, count: u32) -> InventoryItem {
        InventoryItem {
            canonical_name: name.to_string(),
            brand: None,
            count_estimate: count,
            confidence: 0.9,
            last_seen_at: None,
            expiry_date: None,
            is_manual: false,
            package_type: Default::default(),
            notes: None,
        }
    }

    pub fn device(id: &str) -> Device {
        Device {
            id: id.to_string(),
            name: format!("camera {id}"),
            status: DeviceStatus::Active,
            battery_pct: Some(80),
            battery_v: Some(3.9),
            rssi: Some(-55),
            last_seen_at: None,
            capture_count: 12,
            failed_uploads: 0,
        }
    }

    pub fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            name: format!("capture {id}"),
            status,
            created_at: None,
        }
    }

    fn fetch_guard(&self) -> Result<()> {
        match lock(&self.fetch_error).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InventoryGateway for MockGateway {
    async fn fetch_items(&self) -> Result<Vec<InventoryItem>> {
        self.items_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_guard()?;
        Ok(lock(&self.items).clone())
    }

    async fn post_override(&self, payload: &OverridePayload) -> Result<()> {
        if let Some(err) = lock(&self.override_error).clone() {
            return Err(err);
        }
        lock(&self.overrides).push(payload.clone());
        Ok(())
    }

    async fn fetch_stats(&self) -> Result<AnalyticsSnapshot> {
        self.fetch_guard()?;
        Ok(lock(&self.stats).clone())
    }

    async fn fetch_low_stock(&self, threshold: u32) -> Result<Vec<InventoryItem>> {
        self.fetch_guard()?;
        Ok(lock(&self.items)
            .iter()
            .filter(|i| i.count_estimate <= threshold)
            .cloned()
            .collect())
    }

    async fn fetch_stale(&self, _days_threshold: u32) -> Result<Vec<InventoryItem>> {
        self.fetch_guard()?;
        Ok(Vec::new())
    }

    async fn fetch_recent_changes(&self, _hours: u32) -> Result<Vec<ChangeEntry>> {
        self.fetch_guard()?;
        Ok(lock(&self.changes).clone())
    }

    async fn fetch_devices(&self) -> Result<Vec<Device>> {
        self.devices_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_guard()?;
        Ok(lock(&self.devices).clone())
    }

    async fn fetch_device_health(&self, id: &str) -> Result<DeviceHealth> {
        self.fetch_guard()?;
        if !lock(&self.devices).iter().any(|d| d.id == id) {
            return Err(PantryError::NotFound(format!("device {id}")));
        }
        Ok(DeviceHealth {
            battery_pct: Some(80),
            battery_v: Some(3.9),
            rssi: Some(-55),
            captures_7d: 40,
            captures_24h: 6,
            success_rate_7d: 0.97,
            success_rate_24h: 1.0,
            is_healthy: true,
        })
    }

    async fn delete_device(&self, id: &str) -> Result<()> {
        if let Some(err) = lock(&self.delete_error).clone() {
            return Err(err);
        }
        lock(&self.deleted).push(id.to_string());
        Ok(())
    }

    async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        self.tasks_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_guard()?;
        Ok(lock(&self.tasks).clone())
    }

    async fn export_inventory(&self, _format: ExportFormat) -> Result<String> {
        self.fetch_guard()?;
        Ok(lock(&self.export_body).clone())
    }

    async fn trigger_manual_capture(&self, _image: Vec<u8>) -> Result<String> {
        self.fetch_guard()?;
        Ok("capture-1".to_string())
    }
}
