//! ============================================================================
//! Derived Metrics Calculator
//! ============================================================================
//! Pure functions from (canonical item set, reference time) to derived views:
//! low-stock, expiring-soon, stale, confidence buckets, and aggregates.
//!
//! The reference time is captured once per computation pass and reused for
//! every item, so a single derived view can never straddle a boundary.
//! ============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AnalyticsSnapshot, ConfidenceBreakdown, InventoryItem};

/// Items expiring within this many days (exclusive of already-expired).
pub const EXPIRING_SOON_DAYS: i64 = 3;

/// Default count at or below which an item is low stock. Deployments can
/// raise this through `SyncConfig::low_stock_threshold`.
pub const LOW_STOCK_MAX: u32 = 1;

/// High bucket floor.
pub const CONFIDENCE_HIGH: f64 = 0.8;

/// Medium bucket floor.
pub const CONFIDENCE_MEDIUM: f64 = 0.5;

/// Confidence bucket for a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBucket {
    High,
    Medium,
    Low,
}

/// Everything the engine derives from one pass over canonical state.
/// Name lists are sorted so consumers see a deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedView {
    pub snapshot: AnalyticsSnapshot,
    pub low_stock: Vec<String>,
    pub expiring_soon: Vec<String>,
    pub stale: Vec<String>,
    pub computed_at: Option<DateTime<Utc>>,
}

/// Expiry is present and lands strictly after today but within
/// [`EXPIRING_SOON_DAYS`]. Already-expired items do not count.
pub fn is_expiring_soon(item: &InventoryItem, now: DateTime<Utc>) -> bool {
    match item.expiry_date {
        Some(expiry) => {
            let days = (expiry - now.date_naive()).num_days();
            days > 0 && days <= EXPIRING_SOON_DAYS
        }
        None => false,
    }
}

pub fn is_low_stock(item: &InventoryItem, max: u32) -> bool {
    item.count_estimate <= max
}

/// Last sighting is present and older than `threshold_days`.
pub fn is_stale(item: &InventoryItem, now: DateTime<Utc>, threshold_days: u32) -> bool {
    match item.last_seen_at {
        Some(seen) => now - seen > Duration::days(i64::from(threshold_days)),
        None => false,
    }
}

pub fn confidence_bucket(confidence: f64) -> ConfidenceBucket {
    if confidence >= CONFIDENCE_HIGH {
        ConfidenceBucket::High
    } else if confidence >= CONFIDENCE_MEDIUM {
        ConfidenceBucket::Medium
    } else {
        ConfidenceBucket::Low
    }
}

/// Aggregate statistics over the canonical item set. The average confidence
/// of an empty set is 0.
pub fn analytics_snapshot(items: &HashMap<String, InventoryItem>) -> AnalyticsSnapshot {
    let total_items = items.len() as u32;
    let items_in_stock = items.values().filter(|i| i.count_estimate > 0).count() as u32;

    let mut breakdown = ConfidenceBreakdown::default();
    for item in items.values() {
        match confidence_bucket(item.confidence) {
            ConfidenceBucket::High => breakdown.high += 1,
            ConfidenceBucket::Medium => breakdown.medium += 1,
            ConfidenceBucket::Low => breakdown.low += 1,
        }
    }

    let avg_confidence = if items.is_empty() {
        0.0
    } else {
        items.values().map(|i| i.confidence).sum::<f64>() / items.len() as f64
    };

    AnalyticsSnapshot {
        total_items,
        items_in_stock,
        items_out_of_stock: total_items - items_in_stock,
        avg_confidence,
        confidence_breakdown: breakdown,
        total_quantity: items.values().map(|i| i.count_estimate).sum(),
    }
}

/// One full derived pass. `now` is sampled exactly once by the caller.
pub fn derived_view(
    items: &HashMap<String, InventoryItem>,
    now: DateTime<Utc>,
    stale_days: u32,
    low_stock_max: u32,
) -> DerivedView {
    let mut low_stock = Vec::new();
    let mut expiring_soon = Vec::new();
    let mut stale = Vec::new();

    for item in items.values() {
        if is_low_stock(item, low_stock_max) {
            low_stock.push(item.canonical_name.clone());
        }
        if is_expiring_soon(item, now) {
            expiring_soon.push(item.canonical_name.clone());
        }
        if is_stale(item, now, stale_days) {
            stale.push(item.canonical_name.clone());
        }
    }
    low_stock.sort();
    expiring_soon.sort();
    stale.sort();

    DerivedView {
        snapshot: analytics_snapshot(items),
        low_stock,
        expiring_soon,
        stale,
        computed_at: Some(now),
    }
}
