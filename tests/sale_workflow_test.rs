//! End-to-end tests for the sell-cab workflow over the in-memory backend.

use std::sync::Arc;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;

use cabdesk::api::{BackendApi, InMemoryBackend};
use cabdesk::config::AppConfig;
use cabdesk::errors::{InventoryFault, SaleError, Severity};
use cabdesk::models::{
    AccessoryCategory, CabMake, NewAccessory, NewCab, NewCustomer, Role, StockStatus, Supplier,
    UnitColor, UserSnapshot,
};
use cabdesk::sale::{AccessoryOrder, SellCabRequest};
use cabdesk::AppContext;

struct Fixture {
    backend: Arc<InMemoryBackend>,
    context: AppContext,
    cab_id: i64,
    accessory_id: i64,
    customer_id: i64,
}

async fn fixture() -> Fixture {
    let backend = Arc::new(InMemoryBackend::new());
    let cab = backend
        .create_cab(NewCab {
            name: "City Sedan".into(),
            make: CabMake::Toyota,
            unit_color: UnitColor::White,
            quantity: 10,
            price: dec!(15000),
            image: "/images/placeholder.png".into(),
        })
        .await
        .unwrap();
    let accessory = backend
        .create_accessory(NewAccessory {
            name: "Dash Cam".into(),
            category: AccessoryCategory::Electronics,
            supplier: Supplier::PrimeAuto,
            quantity: 5,
            price: dec!(100),
            image: "/images/placeholder.png".into(),
        })
        .await
        .unwrap();
    let customer = backend.seed_customer(NewCustomer {
        full_name: "Alex Reyes".into(),
        email: "alex@example.com".into(),
        phone: "+639171234567".into(),
        address: "Quezon City".into(),
    });

    let (context, _events) = AppContext::new(AppConfig::default(), backend.clone());
    context.initialize_all().await.unwrap();

    Fixture {
        backend,
        context,
        cab_id: cab.id,
        accessory_id: accessory.id,
        customer_id: customer.id,
    }
}

fn seller() -> UserSnapshot {
    UserSnapshot {
        id: 1,
        full_name: "Admin".into(),
        role: Role::Admin,
    }
}

fn request(fixture: &Fixture, quantity: i32, accessory_quantity: i32) -> SellCabRequest {
    SellCabRequest {
        cab_id: fixture.cab_id,
        customer_id: fixture.customer_id,
        quantity,
        sold_by: seller(),
        accessories: if accessory_quantity == 0 {
            Vec::new()
        } else {
            vec![AccessoryOrder {
                accessory_id: fixture.accessory_id,
                quantity: accessory_quantity,
            }]
        },
    }
}

#[tokio::test]
async fn successful_sale_decrements_stock_and_updates_the_dashboard() {
    let f = fixture().await;

    // The worked example: stock 10, sell 3, with 2 accessories at 100.
    let outcome = f.context.sales.sell_cab(request(&f, 3, 2)).await.unwrap();
    assert_eq!(outcome.cab_total, dec!(45000));
    assert_eq!(outcome.accessories_total, dec!(200));
    assert_eq!(outcome.sale.total_price, dec!(45200));

    let cab = f.context.cabs.get(f.cab_id).await.unwrap();
    assert_eq!(cab.quantity, 7);
    assert_eq!(cab.status, StockStatus::LowStock);

    let accessory = f.context.accessories.get(f.accessory_id).await.unwrap();
    assert_eq!(accessory.quantity, 3);
    assert_eq!(accessory.status, StockStatus::InStock);

    let snapshot = f.context.dashboard.snapshot().await;
    assert_eq!(snapshot.total_sales, dec!(45200));
    assert_eq!(snapshot.sales_count, 2); // cab event + accessory bundle event
    assert_eq!(snapshot.recent_activity.len(), 1);

    assert_eq!(f.backend.sale_count(), 1);
}

#[tokio::test]
async fn sale_without_accessories_emits_a_single_dashboard_event() {
    let f = fixture().await;
    f.context.sales.sell_cab(request(&f, 1, 0)).await.unwrap();
    let snapshot = f.context.dashboard.snapshot().await;
    assert_eq!(snapshot.sales_count, 1);
    assert_eq!(snapshot.total_sales, dec!(15000));
}

#[tokio::test]
async fn zero_and_negative_quantities_are_rejected_without_side_effects() {
    let f = fixture().await;

    for quantity in [0, -2] {
        let err = f.context.sales.sell_cab(request(&f, quantity, 0)).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
    assert_eq!(f.backend.sale_count(), 0);
    assert_eq!(f.context.cabs.get(f.cab_id).await.unwrap().quantity, 10);
}

#[tokio::test]
async fn overselling_is_rejected_without_side_effects() {
    let f = fixture().await;
    let err = f.context.sales.sell_cab(request(&f, 11, 0)).await.unwrap_err();
    assert_matches!(err, SaleError::Validation(_));
    assert_eq!(f.backend.sale_count(), 0);
}

#[tokio::test]
async fn negative_accessory_quantity_is_rejected_up_front() {
    let f = fixture().await;
    let err = f.context.sales.sell_cab(request(&f, 1, -1)).await.unwrap_err();
    assert_eq!(err.kind(), "validation");
    assert_eq!(f.backend.sale_count(), 0);
}

#[tokio::test]
async fn failed_purchase_recording_leaves_inventory_untouched() {
    let f = fixture().await;
    f.backend.fail_once("record_sale");

    let err = f.context.sales.sell_cab(request(&f, 3, 2)).await.unwrap_err();
    assert_matches!(err, SaleError::Purchase(_));
    assert_eq!(err.severity(), Severity::Warning);

    assert_eq!(f.backend.sale_count(), 0);
    assert_eq!(f.context.cabs.get(f.cab_id).await.unwrap().quantity, 10);
    assert_eq!(
        f.context.accessories.get(f.accessory_id).await.unwrap().quantity,
        5
    );
}

#[tokio::test]
async fn insufficient_accessory_stock_reverses_the_purchase() {
    let f = fixture().await;

    // More accessories than exist; the pre-dispatch recheck catches it
    // after the purchase was recorded, and compensation voids the sale.
    let err = f.context.sales.sell_cab(request(&f, 1, 9)).await.unwrap_err();
    assert_matches!(
        err,
        SaleError::Inventory(InventoryFault::InsufficientStock { .. })
    );
    assert!(err.triggers_refetch());

    assert_eq!(f.backend.sale_count(), 0);
    assert_eq!(
        f.context.accessories.get(f.accessory_id).await.unwrap().quantity,
        5
    );
}

#[tokio::test]
async fn unknown_accessory_is_an_inventory_conflict() {
    let f = fixture().await;
    let mut req = request(&f, 1, 0);
    req.accessories = vec![AccessoryOrder {
        accessory_id: 999,
        quantity: 1,
    }];
    let err = f.context.sales.sell_cab(req).await.unwrap_err();
    assert_matches!(
        err,
        SaleError::Inventory(InventoryFault::UnknownAccessory { accessory_id: 999 })
    );
    assert_eq!(f.backend.sale_count(), 0);
}

#[tokio::test]
async fn accessory_update_failure_reverses_the_purchase() {
    let f = fixture().await;
    f.backend.fail_once("update_accessory");

    let err = f.context.sales.sell_cab(request(&f, 2, 1)).await.unwrap_err();
    assert_matches!(err, SaleError::Inventory(InventoryFault::UpdateFailed(_)));

    // The purchase was compensated and the caches resynchronized.
    assert_eq!(f.backend.sale_count(), 0);
    assert_eq!(f.context.cabs.get(f.cab_id).await.unwrap().quantity, 10);
    assert_eq!(
        f.context.accessories.get(f.accessory_id).await.unwrap().quantity,
        5
    );
}

#[tokio::test]
async fn cab_update_failure_restores_accessory_stock_and_reverses() {
    let f = fixture().await;
    f.backend.fail_once("update_cab");

    let err = f.context.sales.sell_cab(request(&f, 2, 2)).await.unwrap_err();
    assert_matches!(err, SaleError::Inventory(InventoryFault::UpdateFailed(_)));
    assert_eq!(err.severity(), Severity::Warning);

    // Accessory decrement went through first, then was compensated.
    assert_eq!(f.backend.sale_count(), 0);
    assert_eq!(
        f.context.accessories.get(f.accessory_id).await.unwrap().quantity,
        5
    );
    assert_eq!(f.context.cabs.get(f.cab_id).await.unwrap().quantity, 10);
}

#[tokio::test]
async fn failed_compensation_is_critical_and_keeps_the_sale_recorded() {
    let f = fixture().await;
    f.backend.fail_once("update_cab");
    f.backend.fail_once("void_sale");

    let err = f.context.sales.sell_cab(request(&f, 2, 0)).await.unwrap_err();
    assert_eq!(err.severity(), Severity::Critical);
    let sale_id = match err {
        SaleError::Critical { sale_id, .. } => sale_id,
        other => panic!("expected critical, got {:?}", other),
    };

    // The ledger and inventory are knowingly inconsistent: the purchase is
    // still recorded while the cab stock was never decremented.
    assert_eq!(f.backend.sale_count(), 1);
    assert!(f.backend.sale(sale_id).is_some());
    assert_eq!(f.context.cabs.get(f.cab_id).await.unwrap().quantity, 10);
}

#[tokio::test]
async fn dashboard_state_is_untouched_by_failed_sales() {
    let f = fixture().await;
    f.backend.fail_once("record_sale");
    let _ = f.context.sales.sell_cab(request(&f, 1, 0)).await;

    let snapshot = f.context.dashboard.snapshot().await;
    assert_eq!(snapshot.sales_count, 0);
    assert_eq!(snapshot.total_sales, rust_decimal::Decimal::ZERO);
    assert!(snapshot.recent_activity.is_empty());
}
