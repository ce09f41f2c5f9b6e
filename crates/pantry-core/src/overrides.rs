//! ============================================================================
//! Override Resolver - Manual Count Corrections
//! ============================================================================
//! Pure half of the override flow: validates an operator request and
//! translates set/add/subtract into the absolute count the backend stores.
//! The request/apply flow lives in the reconciler.
//! ============================================================================

use crate::types::{OverrideOp, OverrideRequest, PantryError, Result};

/// Largest amount accepted for any override operation.
pub const MAX_OVERRIDE_AMOUNT: u32 = 999;

/// Resolve an operation against the current local count into the absolute
/// count sent to the backend. `current` is 0 for items unknown locally.
/// Subtract floors at zero.
pub fn resolve_count(op: OverrideOp, amount: u32, current: u32) -> u32 {
    match op {
        OverrideOp::Set => amount,
        OverrideOp::Add => current.saturating_add(amount),
        OverrideOp::Subtract => current.saturating_sub(amount),
    }
}

/// Reject malformed requests before any network traffic.
pub fn validate(req: &OverrideRequest) -> Result<()> {
    if req.item_name.trim().is_empty() {
        return Err(PantryError::Validation("item name must not be empty".into()));
    }
    if req.amount > MAX_OVERRIDE_AMOUNT {
        return Err(PantryError::Validation(format!(
            "amount {} exceeds maximum {MAX_OVERRIDE_AMOUNT}",
            req.amount
        )));
    }
    Ok(())
}

/// Notes recorded on the backend when the operator supplied none.
pub fn default_notes(op: OverrideOp, amount: u32) -> String {
    format!("{op}: {amount}")
}
