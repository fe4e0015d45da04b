use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::api::{BackendApi, NewSaleRequest, SaleAccessoryLine};
use crate::errors::ServiceError;
use crate::models::{Accessory, Cab, ItemKind, Sale};

/// One accessory bundled into a purchase, priced from the current row.
#[derive(Debug, Clone)]
pub struct AccessoryPurchaseLine {
    pub accessory: Accessory,
    pub quantity: i32,
}

/// A fully resolved purchase, ready to be recorded.
#[derive(Debug, Clone)]
pub struct PurchaseDraft {
    pub cab: Cab,
    pub customer_id: i64,
    pub quantity: i32,
    pub sold_by: String,
    pub accessories: Vec<AccessoryPurchaseLine>,
}

impl PurchaseDraft {
    pub fn cab_total(&self) -> Decimal {
        self.cab.price * Decimal::from(self.quantity)
    }

    pub fn accessories_total(&self) -> Decimal {
        self.accessories
            .iter()
            .map(|line| line.accessory.price * Decimal::from(line.quantity))
            .sum()
    }
}

/// Records purchases against customers. Sales are immutable once recorded;
/// the only write-after is the compensating reversal used by the sale
/// workflow when inventory cannot be reconciled.
pub struct PurchaseLedger {
    api: Arc<dyn BackendApi>,
    sales: RwLock<Vec<Sale>>,
}

impl PurchaseLedger {
    pub fn new(api: Arc<dyn BackendApi>) -> Self {
        Self {
            api,
            sales: RwLock::new(Vec::new()),
        }
    }

    /// Persists a sale composed of one cab line plus the accessory lines.
    /// The backend computes the authoritative record; its total must match
    /// `Σ subtotal`, which the returned row is checked against.
    #[instrument(skip(self, draft), fields(cab_id = draft.cab.id, customer_id = draft.customer_id))]
    pub async fn record_purchase(&self, draft: PurchaseDraft) -> Result<Sale, ServiceError> {
        let request = NewSaleRequest {
            cab_id: draft.cab.id,
            customer_id: draft.customer_id,
            quantity: draft.quantity,
            unit_price: draft.cab.price,
            sold_by: draft.sold_by.clone(),
            accessories: draft
                .accessories
                .iter()
                .map(|line| SaleAccessoryLine {
                    accessory_id: line.accessory.id,
                    quantity: line.quantity,
                    unit_price: line.accessory.price,
                })
                .collect(),
        };

        let sale = self.api.record_sale(request).await?;

        let expected: Decimal = sale.items.iter().map(|item| item.subtotal).sum();
        if sale.total_price != expected {
            return Err(ServiceError::Backend(format!(
                "sale {} total {} does not match item subtotals {}",
                sale.id, sale.total_price, expected
            )));
        }

        info!(sale_id = %sale.id, total = %sale.total_price, "Purchase recorded");
        self.sales.write().await.push(sale.clone());
        Ok(sale)
    }

    /// Compensating reversal: voids the recorded sale on the backend and
    /// drops it from the local ledger.
    #[instrument(skip(self))]
    pub async fn reverse(&self, sale_id: Uuid) -> Result<(), ServiceError> {
        self.api.void_sale(sale_id).await?;
        self.sales.write().await.retain(|sale| sale.id != sale_id);
        info!(sale_id = %sale_id, "Purchase reversed");
        Ok(())
    }

    pub async fn sales(&self) -> Vec<Sale> {
        self.sales.read().await.clone()
    }

    pub async fn sales_for_customer(&self, customer_id: i64) -> Vec<Sale> {
        self.sales
            .read()
            .await
            .iter()
            .filter(|sale| sale.customer_id == customer_id)
            .cloned()
            .collect()
    }

    /// Total of all recorded cab lines, used by reporting.
    pub async fn cab_revenue(&self) -> Decimal {
        self.sales
            .read()
            .await
            .iter()
            .map(|sale| sale.total_for(ItemKind::Cab))
            .sum()
    }
}
