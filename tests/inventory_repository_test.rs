//! Repository behavior over the in-memory backend: cache authority,
//! rollback, filtering, and status derivation on the way through.

use std::sync::Arc;

use rust_decimal_macros::dec;

use cabdesk::api::{BackendApi, InMemoryBackend, MaterialQuery};
use cabdesk::errors::ServiceError;
use cabdesk::inventory::{FilterSet, InventoryRepository};
use cabdesk::models::{
    Cab, CabDraft, CabMake, CabPatch, Material, MaterialCategory, MaterialDraft, MaterialPatch,
    NewCab, StockStatus, Supplier, UnitColor,
};

async fn repo_with_cab() -> (Arc<InMemoryBackend>, InventoryRepository<Cab>, i64) {
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
    let repo = InventoryRepository::new(backend.clone() as Arc<dyn BackendApi>, None);
    repo.initialize().await.unwrap();
    (backend, repo, cab.id)
}

#[tokio::test]
async fn initialize_failure_keeps_existing_rows_and_records_the_error() {
    let (backend, repo, cab_id) = repo_with_cab().await;

    backend.fail_once("list_cabs");
    assert!(repo.initialize().await.is_err());

    // No silent data loss: the previous rows survive the failed refresh.
    assert!(repo.get(cab_id).await.is_some());
    assert!(repo.last_error().await.unwrap().contains("injected failure"));

    // The next successful refresh clears the error.
    repo.initialize().await.unwrap();
    assert!(repo.last_error().await.is_none());
}

#[tokio::test]
async fn add_with_missing_enumerated_fields_never_reaches_the_backend() {
    let (_backend, repo, _) = repo_with_cab().await;
    let draft = CabDraft {
        name: "Coupe".into(),
        make: None,
        unit_color: None,
        quantity: 2,
        price: dec!(18000),
        image: None,
    };
    let err = repo.add(draft).await.unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
    assert_eq!(repo.len().await, 1);
}

#[tokio::test]
async fn add_appends_the_backend_row_with_assigned_id_and_status() {
    let (_backend, repo, _) = repo_with_cab().await;
    let created = repo
        .add(CabDraft {
            name: "Coupe".into(),
            make: Some(CabMake::Mazda),
            unit_color: Some(UnitColor::Red),
            quantity: 2,
            price: dec!(18000),
            image: None,
        })
        .await
        .unwrap();
    assert!(created.id > 0);
    assert_eq!(created.status, StockStatus::LowStock);
    assert_eq!(repo.len().await, 2);
}

#[tokio::test]
async fn failed_update_restores_the_exact_pre_call_row() {
    let (backend, repo, cab_id) = repo_with_cab().await;
    let before = repo.get(cab_id).await.unwrap();

    backend.fail_once("update_cab");
    let patch = CabPatch {
        quantity: Some(2),
        price: Some(dec!(14000)),
        ..Default::default()
    };
    assert!(repo.update(cab_id, patch).await.is_err());

    assert_eq!(repo.get(cab_id).await.unwrap(), before);
}

#[tokio::test]
async fn successful_update_takes_the_backend_version_and_rederives_status() {
    let (_backend, repo, cab_id) = repo_with_cab().await;
    let updated = repo
        .update(cab_id, CabPatch {
            quantity: Some(7),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.quantity, 7);
    assert_eq!(updated.status, StockStatus::LowStock);
    assert_eq!(repo.get(cab_id).await.unwrap().status, StockStatus::LowStock);
}

#[tokio::test]
async fn update_of_unknown_row_is_not_found() {
    let (_backend, repo, _) = repo_with_cab().await;
    let err = repo
        .update(999, CabPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn delete_checks_local_existence_and_backend_confirmation() {
    let (backend, repo, cab_id) = repo_with_cab().await;

    assert!(matches!(
        repo.delete(999).await,
        Err(ServiceError::NotFound(_))
    ));

    backend.fail_once("delete_cab");
    assert!(repo.delete(cab_id).await.is_err());
    // The backend did not confirm, so the row stays.
    assert!(repo.get(cab_id).await.is_some());

    repo.delete(cab_id).await.unwrap();
    assert!(repo.get(cab_id).await.is_none());
}

#[tokio::test]
async fn filters_are_conjunctive_and_reset_is_idempotent() {
    let (_backend, repo, _) = repo_with_cab().await;
    repo.add(CabDraft {
        name: "Sport Coupe".into(),
        make: Some(CabMake::Mazda),
        unit_color: Some(UnitColor::Red),
        quantity: 9,
        price: dec!(22000),
        image: None,
    })
    .await
    .unwrap();

    repo.set_filters(FilterSet {
        make: Some("Mazda".into()),
        ..Default::default()
    })
    .await;
    repo.set_search("coupe").await;
    assert_eq!(repo.filtered().await.len(), 1);

    repo.set_search("sedan").await;
    assert!(repo.filtered().await.is_empty());

    repo.reset_filters().await;
    repo.reset_filters().await;
    assert_eq!(repo.filters().await, FilterSet::default());
    assert_eq!(repo.filtered().await.len(), 2);
}

#[tokio::test]
async fn value_and_stock_aggregates_follow_the_cache() {
    let (_backend, repo, cab_id) = repo_with_cab().await;
    assert_eq!(repo.total_value().await, dec!(150000));

    repo.update(cab_id, CabPatch {
        quantity: Some(0),
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(repo.out_of_stock_count().await, 1);
    assert_eq!(repo.total_value().await, dec!(0));
}

#[tokio::test]
async fn materials_paginate_and_filter_on_the_backend() {
    let backend = Arc::new(InMemoryBackend::new());
    let repo: InventoryRepository<Material> =
        InventoryRepository::new(backend.clone() as Arc<dyn BackendApi>, None);

    for i in 0..5 {
        repo.add(MaterialDraft {
            name: format!("Brake Pad {}", i),
            category: Some(MaterialCategory::Chassis),
            supplier: Some(Supplier::RoadMax),
            quantity: 4,
            price: Some(dec!(35)),
        })
        .await
        .unwrap();
    }
    repo.add(MaterialDraft {
        name: "Engine Oil".into(),
        category: Some(MaterialCategory::Consumables),
        supplier: Some(Supplier::PrimeAuto),
        quantity: 50,
        price: Some(dec!(12)),
    })
    .await
    .unwrap();

    let page = backend
        .list_materials_paginated(MaterialQuery {
            page: 1,
            limit: 4,
            search: Some("brake".into()),
            category: Some("Chassis".into()),
            supplier: None,
            status: Some("Low Stock".into()),
        })
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.last_page, 2);
    assert_eq!(page.data.len(), 4);
    assert!(page.data.iter().all(|m| m.status == StockStatus::LowStock));

    let status_patch = MaterialPatch {
        quantity: Some(0),
        ..Default::default()
    };
    let first_id = page.data[0].id;
    let updated = repo.update(first_id, status_patch).await.unwrap();
    assert_eq!(updated.status, StockStatus::OutOfStock);
}
