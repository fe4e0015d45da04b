use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::activity::ActivityLogService;
use crate::dashboard::{DashboardAggregator, SaleEvent};
use crate::errors::{InventoryFault, SaleError};
use crate::events::{Event, EventSender};
use crate::inventory::{InventoryEntity, InventoryRepository};
use crate::ledger::{AccessoryPurchaseLine, PurchaseDraft, PurchaseLedger};
use crate::models::{
    Accessory, ActionType, ActivityStatus, Cab, Sale, SaleCategory, UserSnapshot,
};

/// One accessory bundled into a sell-cab request.
#[derive(Debug, Clone)]
pub struct AccessoryOrder {
    pub accessory_id: i64,
    pub quantity: i32,
}

/// A sell-cab request as submitted from the sale dialog.
#[derive(Debug, Clone)]
pub struct SellCabRequest {
    pub cab_id: i64,
    pub customer_id: i64,
    pub quantity: i32,
    pub sold_by: UserSnapshot,
    pub accessories: Vec<AccessoryOrder>,
}

/// What a completed sale amounted to.
#[derive(Debug, Clone)]
pub struct SaleOutcome {
    pub sale: Sale,
    pub cab_total: Decimal,
    pub accessories_total: Decimal,
}

/// Coordinates the multi-step sell-cab workflow across the purchase
/// ledger, both inventory repositories, and the dashboard.
///
/// The backend offers no transaction spanning these calls, so consistency
/// is enforced here, step by step: validation happens before any remote
/// call, the purchase is recorded before inventory is touched, and a
/// failure after the purchase was recorded triggers a compensating
/// reversal. Only when that reversal itself fails does the workflow report
/// a `critical`, operator-attention outcome.
pub struct SaleOrchestrator {
    cabs: Arc<InventoryRepository<Cab>>,
    accessories: Arc<InventoryRepository<Accessory>>,
    ledger: Arc<PurchaseLedger>,
    dashboard: Arc<DashboardAggregator>,
    activity: Arc<ActivityLogService>,
    event_sender: Option<EventSender>,
}

impl SaleOrchestrator {
    pub fn new(
        cabs: Arc<InventoryRepository<Cab>>,
        accessories: Arc<InventoryRepository<Accessory>>,
        ledger: Arc<PurchaseLedger>,
        dashboard: Arc<DashboardAggregator>,
        activity: Arc<ActivityLogService>,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            cabs,
            accessories,
            ledger,
            dashboard,
            activity,
            event_sender,
        }
    }

    /// Runs the full workflow. On an inventory-kind failure both
    /// repositories are re-fetched so the local caches match the backend
    /// again before the error is surfaced.
    #[instrument(skip(self, request), fields(cab_id = request.cab_id, customer_id = request.customer_id, quantity = request.quantity))]
    pub async fn sell_cab(&self, request: SellCabRequest) -> Result<SaleOutcome, SaleError> {
        let result = self.run(&request).await;
        if let Err(err) = &result {
            warn!(kind = err.kind(), severity = ?err.severity(), error = %err, "Sale failed");
            if err.triggers_refetch() {
                self.resynchronize().await;
            }
        }
        result
    }

    async fn run(&self, request: &SellCabRequest) -> Result<SaleOutcome, SaleError> {
        // Step 1: validate. Nothing has left the client yet.
        let cab = self.cabs.get(request.cab_id).await.ok_or_else(|| {
            SaleError::Validation(format!("unknown cab {}", request.cab_id))
        })?;
        if request.quantity <= 0 {
            return Err(SaleError::Validation(
                "requested quantity must be positive".into(),
            ));
        }
        if request.quantity > cab.quantity {
            return Err(SaleError::Validation(format!(
                "requested {} exceeds available stock {}",
                request.quantity, cab.quantity
            )));
        }
        for order in &request.accessories {
            if order.quantity < 0 {
                return Err(SaleError::Validation(format!(
                    "accessory {} quantity must not be negative",
                    order.accessory_id
                )));
            }
        }

        // Price the accessory lines from current rows. An id the cache does
        // not know is an inventory conflict, not bad input.
        let mut lines = Vec::new();
        for order in request.accessories.iter().filter(|o| o.quantity > 0) {
            let accessory = self
                .accessories
                .get(order.accessory_id)
                .await
                .ok_or(InventoryFault::UnknownAccessory {
                    accessory_id: order.accessory_id,
                })?;
            lines.push(AccessoryPurchaseLine {
                accessory,
                quantity: order.quantity,
            });
        }

        // Step 2: record the purchase. Inventory is untouched until this
        // has succeeded, so a failure here leaves everything consistent.
        let draft = PurchaseDraft {
            cab: cab.clone(),
            customer_id: request.customer_id,
            quantity: request.quantity,
            sold_by: request.sold_by.full_name.clone(),
            accessories: lines.clone(),
        };
        let cab_total = draft.cab_total();
        let accessories_total = draft.accessories_total();
        let sale = self
            .ledger
            .record_purchase(draft)
            .await
            .map_err(SaleError::Purchase)?;

        // Step 3: decrement accessory stock, re-verifying first since stock
        // may have moved since the dialog opened.
        if let Err((applied, fault)) = self.apply_accessory_decrements(&lines).await {
            return Err(self.compensate(sale.id, &applied, fault).await);
        }

        // Step 4: decrement cab stock; the repository re-derives status.
        let new_quantity = cab.quantity - request.quantity;
        if let Err(err) = self
            .cabs
            .update(cab.id, Cab::quantity_patch(new_quantity))
            .await
        {
            let fault = InventoryFault::UpdateFailed(err.to_string());
            return Err(self.compensate(sale.id, &lines, fault).await);
        }

        // Step 5: notify the dashboard and the audit trail.
        self.publish_success(request, &cab.name, &sale, cab_total, accessories_total, &lines)
            .await;

        Ok(SaleOutcome {
            sale,
            cab_total,
            accessories_total,
        })
    }

    /// Re-verifies stock per line and dispatches all decrements together,
    /// awaiting them as a group. On failure, returns the lines whose
    /// decrement already went through so compensation can restore them.
    async fn apply_accessory_decrements(
        &self,
        lines: &[AccessoryPurchaseLine],
    ) -> Result<(), (Vec<AccessoryPurchaseLine>, InventoryFault)> {
        let mut planned = Vec::new();
        for line in lines {
            if line.quantity < 0 {
                return Err((
                    Vec::new(),
                    InventoryFault::NegativeQuantity {
                        accessory_id: line.accessory.id,
                    },
                ));
            }
            let current = match self.accessories.get(line.accessory.id).await {
                Some(current) => current,
                None => {
                    return Err((
                        Vec::new(),
                        InventoryFault::UnknownAccessory {
                            accessory_id: line.accessory.id,
                        },
                    ))
                }
            };
            if current.quantity < line.quantity {
                return Err((
                    Vec::new(),
                    InventoryFault::InsufficientStock {
                        name: current.name.clone(),
                        requested: line.quantity,
                        available: current.quantity,
                    },
                ));
            }
            planned.push((line.clone(), current.quantity - line.quantity));
        }

        let results = join_all(planned.iter().map(|(line, new_quantity)| {
            self.accessories
                .update(line.accessory.id, Accessory::quantity_patch(*new_quantity))
        }))
        .await;

        let mut applied = Vec::new();
        let mut failure = None;
        for ((line, _), result) in planned.into_iter().zip(results) {
            match result {
                Ok(_) => applied.push(line),
                Err(err) => {
                    failure.get_or_insert(InventoryFault::UpdateFailed(err.to_string()));
                }
            }
        }
        match failure {
            Some(fault) => Err((applied, fault)),
            None => Ok(()),
        }
    }

    /// Compensating path once a purchase is already on the ledger: restore
    /// any accessory stock that was decremented, then reverse the purchase
    /// record. The reversal outcome decides the classification.
    async fn compensate(
        &self,
        sale_id: Uuid,
        applied: &[AccessoryPurchaseLine],
        fault: InventoryFault,
    ) -> SaleError {
        for line in applied {
            if let Some(current) = self.accessories.get(line.accessory.id).await {
                if let Err(e) = self
                    .accessories
                    .update(
                        line.accessory.id,
                        Accessory::quantity_patch(current.quantity + line.quantity),
                    )
                    .await
                {
                    warn!(accessory_id = line.accessory.id, error = %e, "Failed to restore accessory stock during compensation");
                }
            }
        }

        match self.ledger.reverse(sale_id).await {
            Ok(()) => {
                info!(sale_id = %sale_id, "Purchase reversed after inventory failure");
                self.emit(Event::SaleCompensated {
                    sale_id,
                    reason: fault.to_string(),
                })
                .await;
                SaleError::Inventory(fault)
            }
            Err(reverse_err) => SaleError::Critical {
                sale_id,
                detail: format!(
                    "{}; compensating reversal failed: {}",
                    fault, reverse_err
                ),
            },
        }
    }

    async fn publish_success(
        &self,
        request: &SellCabRequest,
        cab_name: &str,
        sale: &Sale,
        cab_total: Decimal,
        accessories_total: Decimal,
        lines: &[AccessoryPurchaseLine],
    ) {
        self.dashboard
            .record_sale(SaleEvent {
                category: SaleCategory::Cabs,
                amount: cab_total,
                quantity: request.quantity,
                occurred_at: sale.sale_date,
            })
            .await;
        self.emit(Event::SaleRecorded {
            sale_id: sale.id,
            category: SaleCategory::Cabs,
            amount: cab_total,
            quantity: request.quantity,
        })
        .await;

        if accessories_total > Decimal::ZERO {
            let accessory_units: i32 = lines.iter().map(|line| line.quantity).sum();
            self.dashboard
                .record_sale(SaleEvent {
                    category: SaleCategory::Accessories,
                    amount: accessories_total,
                    quantity: accessory_units,
                    occurred_at: sale.sale_date,
                })
                .await;
            self.emit(Event::SaleRecorded {
                sale_id: sale.id,
                category: SaleCategory::Accessories,
                amount: accessories_total,
                quantity: accessory_units,
            })
            .await;
        }

        let details = format!(
            "Sold {} x {} to customer {}",
            request.quantity, cab_name, request.customer_id
        );
        match self
            .activity
            .record(
                &request.sold_by,
                ActionType::Created,
                details,
                ActivityStatus::Successful,
                false,
            )
            .await
        {
            Ok(entry) => self.dashboard.add_activity(entry).await,
            // The sale already succeeded; a failed audit write must not
            // undo it.
            Err(e) => warn!(error = %e, "Failed to record sale activity"),
        }
    }

    /// Recovery-by-refetch: re-initialize both repositories so local state
    /// matches backend truth again.
    async fn resynchronize(&self) {
        let (cabs, accessories) =
            tokio::join!(self.cabs.initialize(), self.accessories.initialize());
        if let Err(e) = cabs {
            warn!(error = %e, "Cab refetch failed during recovery");
        }
        if let Err(e) = accessories {
            warn!(error = %e, "Accessory refetch failed during recovery");
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send sale event");
            }
        }
    }
}
