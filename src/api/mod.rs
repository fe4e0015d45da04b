//! The REST backend contract the client core is written against.
//!
//! The dashboard never talks to a database directly; everything goes
//! through [`BackendApi`]. [`HttpBackend`] is the production
//! implementation, [`InMemoryBackend`] stands in for it in tests and
//! offline demos.

pub mod http;
pub mod memory;

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{
    Accessory, AccessoryPatch, ActionType, ActivityLogEntry, ActivityStatus, Cab, CabPatch,
    Customer, CustomerPatch, Material, MaterialPatch, NewAccessory, NewCab, NewCustomer,
    NewMaterial, NewUser, Sale, User, UserPatch, UserSnapshot,
};

/// Paginated listing envelope returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub last_page: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

/// Query string for the paginated materials listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Default for MaterialQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            search: None,
            category: None,
            supplier: None,
            status: None,
        }
    }
}

/// One accessory line bundled into a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleAccessoryLine {
    pub accessory_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Payload for the sale-recording endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSaleRequest {
    pub cab_id: i64,
    pub customer_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub sold_by: String,
    pub accessories: Vec<SaleAccessoryLine>,
}

/// Payload for appending to the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivityEntry {
    pub user: UserSnapshot,
    pub action: ActionType,
    pub details: String,
    pub status: ActivityStatus,
    pub is_system_action: bool,
}

/// Everything the dashboard expects of the REST backend. The backend is
/// authoritative: returned rows (ids, derived statuses) always replace
/// whatever the client computed locally.
#[async_trait]
pub trait BackendApi: Send + Sync {
    // Cabs
    async fn list_cabs(&self) -> Result<Vec<Cab>, ServiceError>;
    async fn create_cab(&self, input: NewCab) -> Result<Cab, ServiceError>;
    async fn update_cab(&self, id: i64, patch: CabPatch) -> Result<Cab, ServiceError>;
    async fn delete_cab(&self, id: i64) -> Result<(), ServiceError>;

    // Accessories
    async fn list_accessories(&self) -> Result<Vec<Accessory>, ServiceError>;
    async fn create_accessory(&self, input: NewAccessory) -> Result<Accessory, ServiceError>;
    async fn update_accessory(
        &self,
        id: i64,
        patch: AccessoryPatch,
    ) -> Result<Accessory, ServiceError>;
    async fn delete_accessory(&self, id: i64) -> Result<(), ServiceError>;

    // Materials
    async fn list_materials(&self) -> Result<Vec<Material>, ServiceError>;
    async fn list_materials_paginated(
        &self,
        query: MaterialQuery,
    ) -> Result<Page<Material>, ServiceError>;
    async fn create_material(&self, input: NewMaterial) -> Result<Material, ServiceError>;
    async fn update_material(
        &self,
        id: i64,
        patch: MaterialPatch,
    ) -> Result<Material, ServiceError>;
    async fn delete_material(&self, id: i64) -> Result<(), ServiceError>;

    // Customers
    async fn list_customers(&self) -> Result<Vec<Customer>, ServiceError>;
    async fn create_customer(&self, input: NewCustomer) -> Result<Customer, ServiceError>;
    async fn update_customer(
        &self,
        id: i64,
        patch: CustomerPatch,
    ) -> Result<Customer, ServiceError>;
    async fn delete_customer(&self, id: i64) -> Result<(), ServiceError>;

    // Users (bearer token required)
    async fn list_users(&self) -> Result<Vec<User>, ServiceError>;
    async fn create_user(&self, input: NewUser) -> Result<User, ServiceError>;
    async fn get_user(&self, id: i64) -> Result<User, ServiceError>;
    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User, ServiceError>;
    async fn delete_user(&self, id: i64) -> Result<(), ServiceError>;

    // Sales
    async fn record_sale(&self, request: NewSaleRequest) -> Result<Sale, ServiceError>;
    /// Compensating reversal of a previously recorded sale.
    async fn void_sale(&self, id: Uuid) -> Result<(), ServiceError>;

    // Activity log
    async fn append_activity(
        &self,
        entry: NewActivityEntry,
    ) -> Result<ActivityLogEntry, ServiceError>;
    async fn list_activity(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<Page<ActivityLogEntry>, ServiceError>;
}
