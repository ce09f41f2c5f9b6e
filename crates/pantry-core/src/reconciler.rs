//! ============================================================================
//! Inventory Reconciler - Server-Wins Snapshot Application
//! ============================================================================
//! Pulls the authoritative item list and replaces local state wholesale.
//! There is no partial merge and no optimistic local record: an override is
//! POSTed, then confirmed by an immediate follow-up fetch. Overlapping
//! fetches each replace on completion, so the last completion wins.
//! ============================================================================

use std::sync::Arc;

use tracing::{debug, warn};

use crate::gateway::InventoryGateway;
use crate::overrides::{self, default_notes, resolve_count};
use crate::state::InventoryState;
use crate::types::{OverridePayload, OverrideRequest, Result};

pub struct Reconciler {
    gateway: Arc<dyn InventoryGateway>,
    inventory: Arc<InventoryState>,
}

impl Reconciler {
    pub fn new(gateway: Arc<dyn InventoryGateway>, inventory: Arc<InventoryState>) -> Self {
        Self { gateway, inventory }
    }

    /// Fetch the authoritative snapshot and replace local state with it.
    /// Returns the number of items in the snapshot.
    pub async fn refresh(&self) -> Result<usize> {
        let items = self.gateway.fetch_items().await?;
        let count = items.len();
        self.inventory.replace_all(items).await;
        debug!(items = count, "inventory snapshot applied");
        Ok(count)
    }

    /// Validate and apply a manual count correction, then confirm it with an
    /// immediate refresh rather than waiting for the next scheduled tick.
    /// On any failure local state is untouched. Returns the resolved count.
    pub async fn apply_override(&self, req: &OverrideRequest) -> Result<u32> {
        overrides::validate(req)?;

        let current = self.inventory.count_of(&req.item_name).await;
        let resolved = resolve_count(req.operation, req.amount, current);
        let payload = OverridePayload {
            item_name: req.item_name.clone(),
            count_estimate: resolved,
            notes: Some(
                req.notes
                    .clone()
                    .unwrap_or_else(|| default_notes(req.operation, req.amount)),
            ),
        };

        self.gateway.post_override(&payload).await?;
        debug!(
            item = %req.item_name,
            op = %req.operation,
            resolved,
            "override accepted"
        );

        // Confirmation fetch. The override itself already succeeded, so a
        // failure here only delays visibility until the next tick.
        if let Err(err) = self.refresh().await {
            warn!("{}", err.describe("confirm override"));
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockGateway;
    use crate::types::{OverrideOp, PantryError};

    fn reconciler(gateway: Arc<MockGateway>) -> (Reconciler, Arc<InventoryState>) {
        let inventory = Arc::new(InventoryState::new(7, 1));
        (Reconciler::new(gateway, Arc::clone(&inventory)), inventory)
    }

    fn req(name: &str, operation: OverrideOp, amount: u32) -> OverrideRequest {
        OverrideRequest {
            item_name: name.to_string(),
            operation,
            amount,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_wholesale() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_items(vec![
            MockGateway::item("rice", 2),
            MockGateway::item("beans", 4),
        ]);
        let (rec, inventory) = reconciler(Arc::clone(&gateway));

        assert_eq!(rec.refresh().await.unwrap(), 2);
        assert_eq!(inventory.count_of("rice").await, 2);

        gateway.set_items(vec![MockGateway::item("rice", 1)]);
        assert_eq!(rec.refresh().await.unwrap(), 1);
        assert_eq!(inventory.count_of("beans").await, 0, "absent items drop out");
    }

    #[tokio::test]
    async fn test_override_resolves_against_local_count() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_items(vec![MockGateway::item("rice", 6)]);
        let (rec, _) = reconciler(Arc::clone(&gateway));
        rec.refresh().await.unwrap();

        let resolved = rec
            .apply_override(&req("rice", OverrideOp::Subtract, 2))
            .await
            .unwrap();
        assert_eq!(resolved, 4);

        let sent = gateway.last_override().unwrap();
        assert_eq!(sent.count_estimate, 4);
        assert_eq!(sent.notes.as_deref(), Some("subtract: 2"));
    }

    #[tokio::test]
    async fn test_override_on_unknown_item_treats_current_as_zero() {
        let gateway = Arc::new(MockGateway::new());
        let (rec, _) = reconciler(Arc::clone(&gateway));

        let resolved = rec
            .apply_override(&req("saffron", OverrideOp::Add, 3))
            .await
            .unwrap();
        assert_eq!(resolved, 3);
    }

    #[tokio::test]
    async fn test_override_success_triggers_confirmation_fetch() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_items(vec![MockGateway::item("rice", 9)]);
        let (rec, inventory) = reconciler(Arc::clone(&gateway));

        rec.apply_override(&req("rice", OverrideOp::Set, 9))
            .await
            .unwrap();
        assert_eq!(gateway.fetch_items_calls(), 1);
        assert_eq!(inventory.count_of("rice").await, 9, "snapshot applied immediately");
    }

    #[tokio::test]
    async fn test_confirmed_override_carries_manual_flag() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_items(vec![MockGateway::item("milk", 2)]);
        let (rec, inventory) = reconciler(Arc::clone(&gateway));
        rec.refresh().await.unwrap();
        assert!(!inventory.get("milk").await.unwrap().is_manual);

        // The server marks the item manual in the snapshot that confirms
        // the correction; the client never sets the flag itself.
        let mut corrected = MockGateway::item("milk", 3);
        corrected.is_manual = true;
        gateway.set_items(vec![corrected]);

        rec.apply_override(&req("milk", OverrideOp::Set, 3))
            .await
            .unwrap();
        let milk = inventory.get("milk").await.unwrap();
        assert_eq!(milk.count_estimate, 3);
        assert!(milk.is_manual);
    }

    #[tokio::test]
    async fn test_failed_override_leaves_state_untouched() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_items(vec![MockGateway::item("rice", 6)]);
        let (rec, inventory) = reconciler(Arc::clone(&gateway));
        rec.refresh().await.unwrap();

        gateway.fail_overrides(PantryError::Server {
            status: 500,
            detail: "boom".into(),
        });
        let err = rec
            .apply_override(&req("rice", OverrideOp::Set, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PantryError::Server { status: 500, .. }));
        assert_eq!(inventory.count_of("rice").await, 6);
        assert_eq!(gateway.fetch_items_calls(), 1, "no confirmation after failure");
    }

    #[tokio::test]
    async fn test_validation_rejected_before_any_request() {
        let gateway = Arc::new(MockGateway::new());
        let (rec, _) = reconciler(Arc::clone(&gateway));

        let err = rec
            .apply_override(&req("", OverrideOp::Set, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PantryError::Validation(_)));
        assert_eq!(gateway.override_calls(), 0);
    }

    #[tokio::test]
    async fn test_explicit_notes_pass_through() {
        let gateway = Arc::new(MockGateway::new());
        let (rec, _) = reconciler(Arc::clone(&gateway));

        let mut request = req("rice", OverrideOp::Set, 2);
        request.notes = Some("recount after spill".to_string());
        rec.apply_override(&request).await.unwrap();
        assert_eq!(
            gateway.last_override().unwrap().notes.as_deref(),
            Some("recount after spill")
        );
    }
}
