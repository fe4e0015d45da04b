//! Wire-level tests for the HTTP backend client.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cabdesk::api::{BackendApi, HttpBackend, MaterialQuery, NewSaleRequest, SaleAccessoryLine};
use cabdesk::auth::AuthSession;
use cabdesk::errors::ServiceError;
use cabdesk::models::{CabMake, NewCab, Role, UnitColor, User};

fn backend_for(server: &MockServer, auth: Arc<AuthSession>) -> HttpBackend {
    HttpBackend::new(&server.uri(), Duration::from_secs(5), auth).unwrap()
}

fn cab_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "name": "City Sedan",
        "make": "Toyota",
        "unit_color": "White",
        "quantity": 10,
        "price": "15000",
        "status": "In Stock",
        "image": "/images/placeholder.png"
    })
}

#[tokio::test]
async fn list_cabs_decodes_backend_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cabs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cab_json(1), cab_json(2)])))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Arc::new(AuthSession::ephemeral()));
    let cabs = backend.list_cabs().await.unwrap();
    assert_eq!(cabs.len(), 2);
    assert_eq!(cabs[0].name, "City Sedan");
    assert_eq!(cabs[0].quantity, 10);
}

#[tokio::test]
async fn bearer_token_is_attached_once_logged_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(header("authorization", "Bearer token-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "username": "admin",
            "full_name": "Admin",
            "email": "admin@example.com",
            "role": "Admin"
        }])))
        .mount(&server)
        .await;

    let auth = Arc::new(AuthSession::ephemeral());
    auth.login(
        "token-abc",
        User {
            id: 1,
            username: "admin".into(),
            full_name: "Admin".into(),
            email: "admin@example.com".into(),
            role: Role::Admin,
        },
    )
    .unwrap();

    let backend = backend_for(&server, auth);
    let users = backend.list_users().await.unwrap();
    assert_eq!(users[0].username, "admin");
}

#[tokio::test]
async fn status_codes_map_onto_the_error_taxonomy() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/cabs/1"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "cab 1 not found"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/cabs"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "name is required"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/accessories"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Arc::new(AuthSession::ephemeral()));

    match backend.delete_cab(1).await.unwrap_err() {
        ServiceError::NotFound(msg) => assert_eq!(msg, "cab 1 not found"),
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(matches!(
        backend.list_users().await.unwrap_err(),
        ServiceError::AuthError(_)
    ));
    match backend
        .create_cab(NewCab {
            name: String::new(),
            make: CabMake::Ford,
            unit_color: UnitColor::Black,
            quantity: 1,
            price: "9000".parse().unwrap(),
            image: "/images/placeholder.png".into(),
        })
        .await
        .unwrap_err()
    {
        ServiceError::ValidationError(msg) => assert_eq!(msg, "name is required"),
        other => panic!("expected ValidationError, got {:?}", other),
    }
    assert!(matches!(
        backend.list_accessories().await.unwrap_err(),
        ServiceError::Backend(_)
    ));
}

#[tokio::test]
async fn material_pagination_sends_the_documented_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/materials/paginated"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "10"))
        .and(query_param("search", "oil"))
        .and(query_param("status", "Low Stock"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [],
            "total": 0,
            "last_page": 1
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Arc::new(AuthSession::ephemeral()));
    let page = backend
        .list_materials_paginated(MaterialQuery {
            page: 2,
            limit: 10,
            search: Some("oil".into()),
            category: None,
            supplier: None,
            status: Some("Low Stock".into()),
        })
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(page.last_page, 1);
}

#[tokio::test]
async fn record_sale_posts_the_expected_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sales"))
        .and(body_partial_json(json!({
            "cab_id": 1,
            "customer_id": 7,
            "quantity": 3,
            "accessories": [{"accessory_id": 2, "quantity": 2}]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "7f0c0e0a-5b9b-4f6e-9d7a-111111111111",
            "customer_id": 7,
            "sold_by": "Admin",
            "sale_date": "2026-08-01T10:00:00Z",
            "total_price": "45200",
            "items": [
                {"kind": "Cab", "item_id": 1, "name": "City Sedan", "quantity": 3,
                 "unit_price": "15000", "subtotal": "45000"},
                {"kind": "Accessory", "item_id": 2, "name": "Dash Cam", "quantity": 2,
                 "unit_price": "100", "subtotal": "200"}
            ]
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Arc::new(AuthSession::ephemeral()));
    let sale = backend
        .record_sale(NewSaleRequest {
            cab_id: 1,
            customer_id: 7,
            quantity: 3,
            unit_price: "15000".parse().unwrap(),
            sold_by: "Admin".into(),
            accessories: vec![SaleAccessoryLine {
                accessory_id: 2,
                quantity: 2,
                unit_price: "100".parse().unwrap(),
            }],
        })
        .await
        .unwrap();
    assert_eq!(sale.items.len(), 2);
    assert_eq!(sale.total_price, "45200".parse().unwrap());
}
