use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use validator::{Validate, ValidationError};

/// Stock level classification shown on every inventory row.
///
/// `Available` only exists in the accessory domain; cabs and materials top
/// out at `InStock`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum StockStatus {
    #[serde(rename = "Out of Stock")]
    #[strum(serialize = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Low Stock")]
    #[strum(serialize = "Low Stock")]
    LowStock,
    #[serde(rename = "In Stock")]
    #[strum(serialize = "In Stock")]
    InStock,
    #[serde(rename = "Available")]
    #[strum(serialize = "Available")]
    Available,
}

/// Per-entity quantity thresholds driving [`derive_status`].
#[derive(Debug, Clone, Copy)]
pub struct StatusThresholds {
    /// Quantities in `1..=low_max` classify as `LowStock`.
    pub low_max: i32,
    /// When set, quantities in `low_max+1..=in_stock_max` classify as
    /// `InStock` and anything above as `Available`. When `None` everything
    /// above `low_max` is `InStock`.
    pub in_stock_max: Option<i32>,
}

pub const CAB_THRESHOLDS: StatusThresholds = StatusThresholds {
    low_max: 7,
    in_stock_max: None,
};

pub const ACCESSORY_THRESHOLDS: StatusThresholds = StatusThresholds {
    low_max: 2,
    in_stock_max: Some(5),
};

pub const MATERIAL_THRESHOLDS: StatusThresholds = StatusThresholds {
    low_max: 10,
    in_stock_max: None,
};

/// Pure quantity-to-status rule. Must be re-applied after every quantity
/// change; a row whose status was not recomputed is considered stale.
pub fn derive_status(quantity: i32, thresholds: &StatusThresholds) -> StockStatus {
    if quantity <= 0 {
        return StockStatus::OutOfStock;
    }
    if quantity <= thresholds.low_max {
        return StockStatus::LowStock;
    }
    match thresholds.in_stock_max {
        Some(max) if quantity > max => StockStatus::Available,
        _ => StockStatus::InStock,
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum CabMake {
    Mazda,
    Porsche,
    Toyota,
    Nissan,
    Ford,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum UnitColor {
    Black,
    White,
    Silver,
    Red,
    Blue,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum AccessoryCategory {
    Interior,
    Exterior,
    Electronics,
    Safety,
    Performance,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum MaterialCategory {
    Engine,
    Body,
    Electrical,
    Chassis,
    Consumables,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Supplier {
    #[strum(serialize = "PrimeAuto")]
    PrimeAuto,
    #[strum(serialize = "RoadMax")]
    RoadMax,
    #[strum(serialize = "VeloParts")]
    VeloParts,
    #[strum(serialize = "Northline")]
    Northline,
}

pub(crate) fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        return Err(ValidationError::new("price_negative"));
    }
    Ok(())
}

/// A vehicle row. `status` is derived from `quantity`, `image` is always a
/// sanitized URL or data URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cab {
    pub id: i64,
    pub name: String,
    pub make: CabMake,
    pub unit_color: UnitColor,
    pub quantity: i32,
    pub price: Decimal,
    pub status: StockStatus,
    pub image: String,
}

/// Form input for creating a cab. Enumerated fields are optional here
/// because the form starts empty; validation rejects unfilled ones before
/// any remote call.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CabDraft {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub make: Option<CabMake>,
    pub unit_color: Option<UnitColor>,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    pub image: Option<String>,
}

/// Validated create payload sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCab {
    pub name: String,
    pub make: CabMake,
    pub unit_color: UnitColor,
    pub quantity: i32,
    pub price: Decimal,
    pub image: String,
}

/// Partial update merged onto an existing cab row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CabPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<CabMake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_color: Option<UnitColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accessory {
    pub id: i64,
    pub name: String,
    pub category: AccessoryCategory,
    pub supplier: Supplier,
    pub quantity: i32,
    pub price: Decimal,
    pub status: StockStatus,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AccessoryDraft {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub category: Option<AccessoryCategory>,
    pub supplier: Option<Supplier>,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccessory {
    pub name: String,
    pub category: AccessoryCategory,
    pub supplier: Supplier,
    pub quantity: i32,
    pub price: Decimal,
    pub image: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<AccessoryCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<Supplier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Raw materials tracked for the workshop. Price is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub name: String,
    pub category: MaterialCategory,
    pub supplier: Supplier,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub status: StockStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MaterialDraft {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub category: Option<MaterialCategory>,
    pub supplier: Option<Supplier>,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMaterial {
    pub name: String,
    pub category: MaterialCategory,
    pub supplier: Supplier,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<MaterialCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<Supplier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use test_case::test_case;

    #[test_case(0, StockStatus::OutOfStock; "zero is out of stock")]
    #[test_case(1, StockStatus::LowStock; "one is low")]
    #[test_case(7, StockStatus::LowStock; "seven is still low")]
    #[test_case(8, StockStatus::InStock; "eight is in stock")]
    #[test_case(500, StockStatus::InStock; "large stock stays in stock")]
    fn cab_status_matches_threshold_table(quantity: i32, expected: StockStatus) {
        assert_eq!(derive_status(quantity, &CAB_THRESHOLDS), expected);
    }

    #[test_case(0, StockStatus::OutOfStock)]
    #[test_case(2, StockStatus::LowStock)]
    #[test_case(3, StockStatus::InStock)]
    #[test_case(5, StockStatus::InStock)]
    #[test_case(6, StockStatus::Available)]
    fn accessory_status_has_an_available_band(quantity: i32, expected: StockStatus) {
        assert_eq!(derive_status(quantity, &ACCESSORY_THRESHOLDS), expected);
    }

    #[test]
    fn negative_quantities_are_out_of_stock() {
        assert_eq!(derive_status(-3, &CAB_THRESHOLDS), StockStatus::OutOfStock);
    }

    #[test]
    fn status_strings_round_trip() {
        assert_eq!(StockStatus::OutOfStock.to_string(), "Out of Stock");
        assert_eq!(
            "Low Stock".parse::<StockStatus>().unwrap(),
            StockStatus::LowStock
        );
    }

    #[test]
    fn draft_validation_rejects_empty_name_and_negative_values() {
        let draft = CabDraft {
            name: String::new(),
            make: Some(CabMake::Toyota),
            unit_color: Some(UnitColor::White),
            quantity: -1,
            price: dec!(-5),
            image: None,
        };
        let err = draft.validate().unwrap_err();
        let fields = err.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("price"));
    }
}
