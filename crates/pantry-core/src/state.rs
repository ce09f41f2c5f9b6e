//! ============================================================================
//! Canonical State - Single Authoritative In-Memory Record Sets
//! ============================================================================
//! One store per backend resource (items, devices, tasks). Each store is
//! replaced wholesale on a successful fetch and bumps a watch revision so
//! consumers can await changes without polling the locks.
//!
//! All mutation happens through these stores; overlapping fetches simply
//! race to `replace_*` and the last completion wins.
//! ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, RwLock};
use tracing::debug;

use crate::metrics::{self, DerivedView};
use crate::types::{Device, DeviceHealth, InventoryItem, Task};

/// Canonical inventory keyed by `canonical_name`, plus the derived view
/// recomputed on every replacement.
pub struct InventoryState {
    items: RwLock<HashMap<String, InventoryItem>>,
    derived: RwLock<DerivedView>,
    revision: watch::Sender<u64>,
    stale_days: u32,
    low_stock_max: u32,
}

impl InventoryState {
    pub fn new(stale_days: u32, low_stock_max: u32) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            items: RwLock::new(HashMap::new()),
            derived: RwLock::new(DerivedView::default()),
            revision,
            stale_days,
            low_stock_max,
        }
    }

    /// Replace the entire canonical item set with a fetched snapshot.
    /// Confidence is clamped into [0, 1]; duplicate names keep the last
    /// occurrence. The derived view is recomputed with a single `now`.
    pub async fn replace_all(&self, snapshot: Vec<InventoryItem>) {
        let mut map = HashMap::with_capacity(snapshot.len());
        for mut item in snapshot {
            item.confidence = item.confidence.clamp(0.0, 1.0);
            map.insert(item.canonical_name.clone(), item);
        }
        debug!(items = map.len(), "replacing canonical inventory");

        let now = Utc::now();
        let view = metrics::derived_view(&map, now, self.stale_days, self.low_stock_max);

        *self.items.write().await = map;
        *self.derived.write().await = view;
        self.revision.send_modify(|r| *r += 1);
    }

    /// Current count for an item, 0 when unknown locally.
    pub async fn count_of(&self, canonical_name: &str) -> u32 {
        self.items
            .read()
            .await
            .get(canonical_name)
            .map(|i| i.count_estimate)
            .unwrap_or(0)
    }

    pub async fn get(&self, canonical_name: &str) -> Option<InventoryItem> {
        self.items.read().await.get(canonical_name).cloned()
    }

    /// All items sorted by name, the order the inventory list displays.
    pub async fn items(&self) -> Vec<InventoryItem> {
        let mut items: Vec<_> = self.items.read().await.values().cloned().collect();
        items.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
        items
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    pub async fn derived(&self) -> DerivedView {
        self.derived.read().await.clone()
    }

    /// Subscribe to replacement notifications. The value is a monotonically
    /// increasing revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

/// Canonical device fleet plus the operator's current selection and the
/// most recently fetched health report.
pub struct DeviceState {
    devices: RwLock<Vec<Device>>,
    selected: RwLock<Option<String>>,
    health: RwLock<Option<DeviceHealth>>,
    revision: watch::Sender<u64>,
}

impl DeviceState {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            devices: RwLock::new(Vec::new()),
            selected: RwLock::new(None),
            health: RwLock::new(None),
            revision,
        }
    }

    /// Replace the device list wholesale. A selection pointing at a device
    /// that vanished from the snapshot is cleared along with its health.
    pub async fn replace_all(&self, snapshot: Vec<Device>) {
        let mut selected = self.selected.write().await;
        if let Some(id) = selected.as_deref() {
            if !snapshot.iter().any(|d| d.id == id) {
                debug!(device = id, "selected device left the snapshot");
                *selected = None;
                *self.health.write().await = None;
            }
        }
        drop(selected);

        *self.devices.write().await = snapshot;
        self.revision.send_modify(|r| *r += 1);
    }

    /// Remove one device (after a confirmed delete), clearing selection and
    /// health if it was the selected one.
    pub async fn remove(&self, id: &str) {
        self.devices.write().await.retain(|d| d.id != id);
        let mut selected = self.selected.write().await;
        if selected.as_deref() == Some(id) {
            *selected = None;
            *self.health.write().await = None;
        }
        drop(selected);
        self.revision.send_modify(|r| *r += 1);
    }

    pub async fn devices(&self) -> Vec<Device> {
        self.devices.read().await.clone()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.devices.read().await.iter().any(|d| d.id == id)
    }

    pub async fn select(&self, id: Option<String>) {
        *self.selected.write().await = id;
        *self.health.write().await = None;
        self.revision.send_modify(|r| *r += 1);
    }

    pub async fn selected(&self) -> Option<String> {
        self.selected.read().await.clone()
    }

    pub async fn set_health(&self, health: DeviceHealth) {
        *self.health.write().await = Some(health);
        self.revision.send_modify(|r| *r += 1);
    }

    pub async fn health(&self) -> Option<DeviceHealth> {
        self.health.read().await.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical task queue snapshot.
pub struct TaskState {
    tasks: RwLock<Vec<Task>>,
    revision: watch::Sender<u64>,
}

impl TaskState {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            tasks: RwLock::new(Vec::new()),
            revision,
        }
    }

    pub async fn replace_all(&self, snapshot: Vec<Task>) {
        *self.tasks.write().await = snapshot;
        self.revision.send_modify(|r| *r += 1);
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::new()
    }
}

/// All canonical stores the engine owns. Each store is shared with the
/// component that writes it, so they are handed out as `Arc`s.
pub struct SyncState {
    pub inventory: Arc<InventoryState>,
    pub devices: Arc<DeviceState>,
    pub tasks: Arc<TaskState>,
}

impl SyncState {
    pub fn new(stale_days: u32, low_stock_max: u32) -> Self {
        Self {
            inventory: Arc::new(InventoryState::new(stale_days, low_stock_max)),
            devices: Arc::new(DeviceState::new()),
            tasks: Arc::new(TaskState::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceStatus;

    fn item(name: &str, count: u32, confidence: f64) -> InventoryItem {
        InventoryItem {
            canonical_name: name.to_string(),
            brand: None,
            count_estimate: count,
            confidence,
            last_seen_at: None,
            expiry_date: None,
            is_manual: false,
            package_type: Default::default(),
            notes: None,
        }
    }

    fn device(id: &str, status: DeviceStatus) -> Device {
        Device {
            id: id.to_string(),
            name: format!("camera {id}"),
            status,
            battery_pct: None,
            battery_v: None,
            rssi: None,
            last_seen_at: None,
            capture_count: 0,
            failed_uploads: 0,
        }
    }

    #[tokio::test]
    async fn test_replace_all_is_wholesale() {
        let state = InventoryState::new(7, 1);
        state
            .replace_all(vec![item("milk", 2, 0.9), item("rice", 5, 0.8)])
            .await;
        assert_eq!(state.len().await, 2);

        // A snapshot that stops reporting rice must make it disappear.
        state.replace_all(vec![item("milk", 1, 0.9)]).await;
        assert_eq!(state.len().await, 1);
        assert_eq!(state.get("rice").await, None);
        assert_eq!(state.count_of("milk").await, 1);
    }

    #[tokio::test]
    async fn test_replace_clamps_confidence() {
        let state = InventoryState::new(7, 1);
        state
            .replace_all(vec![item("a", 1, 1.7), item("b", 1, -0.3)])
            .await;
        assert_eq!(state.get("a").await.unwrap().confidence, 1.0);
        assert_eq!(state.get("b").await.unwrap().confidence, 0.0);
    }

    #[tokio::test]
    async fn test_count_of_unknown_item_is_zero() {
        let state = InventoryState::new(7, 1);
        assert_eq!(state.count_of("nothing").await, 0);
    }

    #[tokio::test]
    async fn test_overlapping_fetches_last_completion_wins() {
        let state = InventoryState::new(7, 1);
        // Fetch A was issued first but B's result landed first; A's
        // completion arrives last and is what canonical state reflects.
        let snapshot_b = vec![item("milk", 3, 0.9)];
        let snapshot_a = vec![item("milk", 2, 0.9), item("rice", 5, 0.8)];
        state.replace_all(snapshot_b).await;
        state.replace_all(snapshot_a).await;
        assert_eq!(state.count_of("milk").await, 2);
        assert_eq!(state.len().await, 2);
    }

    #[tokio::test]
    async fn test_revision_bumps_and_derived_refreshes() {
        let state = InventoryState::new(7, 1);
        let rx = state.subscribe();
        assert_eq!(*rx.borrow(), 0);

        state.replace_all(vec![item("milk", 0, 0.6)]).await;
        assert_eq!(*rx.borrow(), 1);
        let view = state.derived().await;
        assert_eq!(view.snapshot.total_items, 1);
        assert_eq!(view.snapshot.items_out_of_stock, 1);
        assert_eq!(view.low_stock, vec!["milk".to_string()]);
    }

    #[tokio::test]
    async fn test_device_removal_clears_selection() {
        let state = DeviceState::new();
        state
            .replace_all(vec![
                device("d1", DeviceStatus::Active),
                device("d2", DeviceStatus::Offline),
            ])
            .await;
        state.select(Some("d1".to_string())).await;

        state.remove("d1").await;
        assert_eq!(state.selected().await, None);
        assert_eq!(state.health().await, None);
        let remaining = state.devices().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "d2");
    }

    #[tokio::test]
    async fn test_device_snapshot_keeps_live_selection() {
        let state = DeviceState::new();
        state.replace_all(vec![device("d1", DeviceStatus::Active)]).await;
        state.select(Some("d1".to_string())).await;

        state
            .replace_all(vec![
                device("d1", DeviceStatus::Idle),
                device("d2", DeviceStatus::Active),
            ])
            .await;
        assert_eq!(state.selected().await, Some("d1".to_string()));

        // Selection clears when the device leaves the snapshot.
        state.replace_all(vec![device("d2", DeviceStatus::Active)]).await;
        assert_eq!(state.selected().await, None);
    }
}
