//! ============================================================================
//! Core Types for Pantry Sync
//! ============================================================================
//! Defines all data structures for the inventory domain, device fleet, and
//! background task queue. These types mirror the backend's JSON payloads and
//! are serialized as-is for consumers of the engine.
//! ============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One tracked pantry item as confirmed by the backend.
///
/// A record is created or fully replaced on each successful inventory fetch,
/// never field-patched, so stale fields cannot drift across capture cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Unique, case-sensitive item key.
    pub canonical_name: String,
    #[serde(default)]
    pub brand: Option<String>,
    /// Current count estimate, never negative.
    pub count_estimate: u32,
    /// Backend-reported detection certainty, 0.0 to 1.0 inclusive.
    pub confidence: f64,
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// True only when the item was produced or last touched by an override.
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default)]
    pub package_type: PackageType,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Packaging category reported by the vision pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Box,
    Can,
    Jar,
    Bag,
    Bottle,
    #[default]
    #[serde(other)]
    Other,
}

/// A user-issued manual correction, before resolution to an absolute count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRequest {
    pub item_name: String,
    pub operation: OverrideOp,
    /// Requested amount, 0 to 999.
    pub amount: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// How an override amount combines with the current known count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideOp {
    Set,
    Add,
    Subtract,
}

impl std::fmt::Display for OverrideOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideOp::Set => write!(f, "set"),
            OverrideOp::Add => write!(f, "add"),
            OverrideOp::Subtract => write!(f, "subtract"),
        }
    }
}

/// Wire body for `POST /v1/inventory/override`. The backend only understands
/// absolute counts; the resolver computes `count_estimate` from the
/// operation before this is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverridePayload {
    pub item_name: String,
    pub count_estimate: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A registered capture device (pantry camera).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub status: DeviceStatus,
    #[serde(default)]
    pub battery_pct: Option<u8>,
    #[serde(default)]
    pub battery_v: Option<f64>,
    #[serde(default)]
    pub rssi: Option<i32>,
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub capture_count: u32,
    #[serde(default)]
    pub failed_uploads: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Active,
    Idle,
    Inactive,
    Offline,
}

/// Detailed health report for a single device. `is_healthy` is derived by
/// the server and never recomputed client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceHealth {
    #[serde(default)]
    pub battery_pct: Option<u8>,
    #[serde(default)]
    pub battery_v: Option<f64>,
    #[serde(default)]
    pub rssi: Option<i32>,
    #[serde(default)]
    pub captures_7d: u32,
    #[serde(default)]
    pub captures_24h: u32,
    #[serde(default)]
    pub success_rate_7d: f64,
    #[serde(default)]
    pub success_rate_24h: f64,
    pub is_healthy: bool,
}

/// A backend worker task (vision analysis, ingestion, etc).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Started,
    Success,
    Failure,
}

/// Aggregate inventory statistics. Served by `/v1/inventory/stats` and also
/// computed locally from canonical state by the metrics calculator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub total_items: u32,
    pub items_in_stock: u32,
    pub items_out_of_stock: u32,
    pub avg_confidence: f64,
    pub confidence_breakdown: ConfidenceBreakdown,
    pub total_quantity: u32,
}

/// Item counts per confidence bucket (high >= 0.8, medium >= 0.5, low below).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

/// One entry in the recent-changes timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub item_name: Option<String>,
    /// seen, adjusted, or manual_override.
    pub event_type: String,
    #[serde(default)]
    pub delta: i64,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub capture_id: Option<String>,
}

/// Inventory export format accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Error taxonomy for the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PantryError {
    /// No response reached the client (DNS, connect, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("server returned {status}: {detail}")]
    Server { status: u16, detail: String },

    /// The named item or device does not exist on the server.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rejected client-side before any request was issued.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl PantryError {
    /// Human-readable text prefixed with the attempted operation, e.g.
    /// `"Failed to load inventory: network error: connection refused"`.
    pub fn describe(&self, operation: &str) -> String {
        format!("Failed to {operation}: {self}")
    }
}

pub type Result<T> = std::result::Result<T, PantryError>;
