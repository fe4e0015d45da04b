use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Which inventory domain a sale line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ItemKind {
    Cab,
    Accessory,
    Material,
}

/// Reporting bucket used by the dashboard trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum SaleCategory {
    Cabs,
    Accessories,
}

/// One line of a recorded sale. `subtotal` is always
/// `unit_price * quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    pub kind: ItemKind,
    pub item_id: i64,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl SaleItem {
    pub fn new(
        kind: ItemKind,
        item_id: i64,
        name: impl Into<String>,
        quantity: i32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            kind,
            item_id,
            name: name.into(),
            quantity,
            unit_price,
            subtotal: unit_price * Decimal::from(quantity),
        }
    }
}

/// An immutable, recorded sale. Only the orchestrator creates these; the
/// client never edits or deletes one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub customer_id: i64,
    pub sold_by: String,
    pub sale_date: DateTime<Utc>,
    pub total_price: Decimal,
    pub items: Vec<SaleItem>,
}

impl Sale {
    /// Composes a sale from its line items, enforcing the total invariant.
    pub fn compose(
        id: Uuid,
        customer_id: i64,
        sold_by: impl Into<String>,
        sale_date: DateTime<Utc>,
        items: Vec<SaleItem>,
    ) -> Result<Self, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "a sale needs at least one line item".into(),
            ));
        }
        let total_price: Decimal = items.iter().map(|item| item.subtotal).sum();
        Ok(Self {
            id,
            customer_id,
            sold_by: sold_by.into(),
            sale_date,
            total_price,
            items,
        })
    }

    /// Sum of subtotals for one kind of line item.
    pub fn total_for(&self, kind: ItemKind) -> Decimal {
        self.items
            .iter()
            .filter(|item| item.kind == kind)
            .map(|item| item.subtotal)
            .sum()
    }
}
