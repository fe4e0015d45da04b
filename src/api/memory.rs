use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BackendApi, MaterialQuery, NewActivityEntry, NewSaleRequest, Page};
use crate::errors::ServiceError;
use crate::models::{
    derive_status, Accessory, AccessoryPatch, ActivityLogEntry, Cab, CabPatch, Customer,
    CustomerPatch, ItemKind, Material, MaterialPatch, NewAccessory, NewCab, NewCustomer,
    NewMaterial, NewUser, Sale, SaleItem, User, UserPatch, ACCESSORY_THRESHOLDS, CAB_THRESHOLDS,
    MATERIAL_THRESHOLDS,
};

/// In-memory stand-in for the REST backend: assigns ids, derives statuses,
/// and enforces the customer foreign key the way the real service does.
///
/// `fail_once` injects a single failure for a named operation, which is how
/// the rollback and saga tests force mid-workflow errors.
#[derive(Default)]
pub struct InMemoryBackend {
    cabs: DashMap<i64, Cab>,
    accessories: DashMap<i64, Accessory>,
    materials: DashMap<i64, Material>,
    customers: DashMap<i64, Customer>,
    users: DashMap<i64, User>,
    sales: DashMap<Uuid, Sale>,
    activity: Mutex<Vec<ActivityLogEntry>>,
    next_id: AtomicI64,
    fail_ops: DashMap<String, ()>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    /// Makes the next call to the named operation (e.g. `"update_cab"`)
    /// fail once.
    pub fn fail_once(&self, op: &str) {
        self.fail_ops.insert(op.to_string(), ());
    }

    fn take_failure(&self, op: &str) -> Result<(), ServiceError> {
        if self.fail_ops.remove(op).is_some() {
            return Err(ServiceError::Backend(format!("injected failure: {}", op)));
        }
        Ok(())
    }

    fn assign_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Seeds a customer directly, returning the stored row.
    pub fn seed_customer(&self, input: NewCustomer) -> Customer {
        let customer = Customer {
            id: self.assign_id(),
            full_name: input.full_name,
            email: input.email,
            phone: input.phone,
            address: input.address,
            date_registered: Utc::now(),
        };
        self.customers.insert(customer.id, customer.clone());
        customer
    }

    pub fn sale_count(&self) -> usize {
        self.sales.len()
    }

    pub fn sale(&self, id: Uuid) -> Option<Sale> {
        self.sales.get(&id).map(|entry| entry.clone())
    }

    fn sorted<T: Clone>(map: &DashMap<i64, T>) -> Vec<T> {
        let mut keyed: Vec<(i64, T)> = map
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        keyed.sort_by_key(|(id, _)| *id);
        keyed.into_iter().map(|(_, row)| row).collect()
    }

    fn paginate<T: Clone>(rows: Vec<T>, page: u64, limit: u64) -> Page<T> {
        let limit = limit.max(1);
        let total = rows.len() as u64;
        let last_page = total.div_ceil(limit).max(1);
        let start = ((page.max(1) - 1) * limit) as usize;
        let data = rows.into_iter().skip(start).take(limit as usize).collect();
        Page {
            data,
            total,
            last_page,
        }
    }
}

#[async_trait]
impl BackendApi for InMemoryBackend {
    async fn list_cabs(&self) -> Result<Vec<Cab>, ServiceError> {
        self.take_failure("list_cabs")?;
        Ok(Self::sorted(&self.cabs))
    }

    async fn create_cab(&self, input: NewCab) -> Result<Cab, ServiceError> {
        self.take_failure("create_cab")?;
        let cab = Cab {
            id: self.assign_id(),
            status: derive_status(input.quantity, &CAB_THRESHOLDS),
            name: input.name,
            make: input.make,
            unit_color: input.unit_color,
            quantity: input.quantity,
            price: input.price,
            image: input.image,
        };
        self.cabs.insert(cab.id, cab.clone());
        Ok(cab)
    }

    async fn update_cab(&self, id: i64, patch: CabPatch) -> Result<Cab, ServiceError> {
        self.take_failure("update_cab")?;
        let mut entry = self
            .cabs
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("cab {} not found", id)))?;
        let cab = entry.value_mut();
        if let Some(name) = patch.name {
            cab.name = name;
        }
        if let Some(make) = patch.make {
            cab.make = make;
        }
        if let Some(color) = patch.unit_color {
            cab.unit_color = color;
        }
        if let Some(quantity) = patch.quantity {
            cab.quantity = quantity;
        }
        if let Some(price) = patch.price {
            cab.price = price;
        }
        if let Some(image) = patch.image {
            cab.image = image;
        }
        cab.status = derive_status(cab.quantity, &CAB_THRESHOLDS);
        Ok(cab.clone())
    }

    async fn delete_cab(&self, id: i64) -> Result<(), ServiceError> {
        self.take_failure("delete_cab")?;
        self.cabs
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("cab {} not found", id)))
    }

    async fn list_accessories(&self) -> Result<Vec<Accessory>, ServiceError> {
        self.take_failure("list_accessories")?;
        Ok(Self::sorted(&self.accessories))
    }

    async fn create_accessory(&self, input: NewAccessory) -> Result<Accessory, ServiceError> {
        self.take_failure("create_accessory")?;
        let accessory = Accessory {
            id: self.assign_id(),
            status: derive_status(input.quantity, &ACCESSORY_THRESHOLDS),
            name: input.name,
            category: input.category,
            supplier: input.supplier,
            quantity: input.quantity,
            price: input.price,
            image: input.image,
        };
        self.accessories.insert(accessory.id, accessory.clone());
        Ok(accessory)
    }

    async fn update_accessory(
        &self,
        id: i64,
        patch: AccessoryPatch,
    ) -> Result<Accessory, ServiceError> {
        self.take_failure("update_accessory")?;
        let mut entry = self
            .accessories
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("accessory {} not found", id)))?;
        let accessory = entry.value_mut();
        if let Some(name) = patch.name {
            accessory.name = name;
        }
        if let Some(category) = patch.category {
            accessory.category = category;
        }
        if let Some(supplier) = patch.supplier {
            accessory.supplier = supplier;
        }
        if let Some(quantity) = patch.quantity {
            accessory.quantity = quantity;
        }
        if let Some(price) = patch.price {
            accessory.price = price;
        }
        if let Some(image) = patch.image {
            accessory.image = image;
        }
        accessory.status = derive_status(accessory.quantity, &ACCESSORY_THRESHOLDS);
        Ok(accessory.clone())
    }

    async fn delete_accessory(&self, id: i64) -> Result<(), ServiceError> {
        self.take_failure("delete_accessory")?;
        self.accessories
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("accessory {} not found", id)))
    }

    async fn list_materials(&self) -> Result<Vec<Material>, ServiceError> {
        self.take_failure("list_materials")?;
        Ok(Self::sorted(&self.materials))
    }

    async fn list_materials_paginated(
        &self,
        query: MaterialQuery,
    ) -> Result<Page<Material>, ServiceError> {
        self.take_failure("list_materials_paginated")?;
        let needle = query.search.as_deref().unwrap_or("").to_lowercase();
        let rows: Vec<Material> = Self::sorted(&self.materials)
            .into_iter()
            .filter(|m| needle.is_empty() || m.name.to_lowercase().contains(&needle))
            .filter(|m| {
                query
                    .category
                    .as_deref()
                    .map_or(true, |c| m.category.to_string() == c)
            })
            .filter(|m| {
                query
                    .supplier
                    .as_deref()
                    .map_or(true, |s| m.supplier.to_string() == s)
            })
            .filter(|m| {
                query
                    .status
                    .as_deref()
                    .map_or(true, |s| m.status.to_string() == s)
            })
            .collect();
        Ok(Self::paginate(rows, query.page, query.limit))
    }

    async fn create_material(&self, input: NewMaterial) -> Result<Material, ServiceError> {
        self.take_failure("create_material")?;
        let material = Material {
            id: self.assign_id(),
            status: derive_status(input.quantity, &MATERIAL_THRESHOLDS),
            name: input.name,
            category: input.category,
            supplier: input.supplier,
            quantity: input.quantity,
            price: input.price,
        };
        self.materials.insert(material.id, material.clone());
        Ok(material)
    }

    async fn update_material(
        &self,
        id: i64,
        patch: MaterialPatch,
    ) -> Result<Material, ServiceError> {
        self.take_failure("update_material")?;
        let mut entry = self
            .materials
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("material {} not found", id)))?;
        let material = entry.value_mut();
        if let Some(name) = patch.name {
            material.name = name;
        }
        if let Some(category) = patch.category {
            material.category = category;
        }
        if let Some(supplier) = patch.supplier {
            material.supplier = supplier;
        }
        if let Some(quantity) = patch.quantity {
            material.quantity = quantity;
        }
        if let Some(price) = patch.price {
            material.price = Some(price);
        }
        material.status = derive_status(material.quantity, &MATERIAL_THRESHOLDS);
        Ok(material.clone())
    }

    async fn delete_material(&self, id: i64) -> Result<(), ServiceError> {
        self.take_failure("delete_material")?;
        self.materials
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("material {} not found", id)))
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, ServiceError> {
        self.take_failure("list_customers")?;
        Ok(Self::sorted(&self.customers))
    }

    async fn create_customer(&self, input: NewCustomer) -> Result<Customer, ServiceError> {
        self.take_failure("create_customer")?;
        Ok(self.seed_customer(input))
    }

    async fn update_customer(
        &self,
        id: i64,
        patch: CustomerPatch,
    ) -> Result<Customer, ServiceError> {
        self.take_failure("update_customer")?;
        let mut entry = self
            .customers
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("customer {} not found", id)))?;
        let merged = entry.value().merged(&patch);
        *entry.value_mut() = merged.clone();
        Ok(merged)
    }

    async fn delete_customer(&self, id: i64) -> Result<(), ServiceError> {
        self.take_failure("delete_customer")?;
        self.customers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("customer {} not found", id)))
    }

    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        self.take_failure("list_users")?;
        Ok(Self::sorted(&self.users))
    }

    async fn create_user(&self, input: NewUser) -> Result<User, ServiceError> {
        self.take_failure("create_user")?;
        let user = User {
            id: self.assign_id(),
            username: input.username,
            full_name: input.full_name,
            email: input.email,
            role: input.role,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<User, ServiceError> {
        self.take_failure("get_user")?;
        self.users
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", id)))
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User, ServiceError> {
        self.take_failure("update_user")?;
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", id)))?;
        let user = entry.value_mut();
        if let Some(full_name) = patch.full_name {
            user.full_name = full_name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> Result<(), ServiceError> {
        self.take_failure("delete_user")?;
        self.users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", id)))
    }

    async fn record_sale(&self, request: NewSaleRequest) -> Result<Sale, ServiceError> {
        self.take_failure("record_sale")?;
        if !self.customers.contains_key(&request.customer_id) {
            return Err(ServiceError::ValidationError(format!(
                "customer {} does not exist",
                request.customer_id
            )));
        }
        let cab_name = self
            .cabs
            .get(&request.cab_id)
            .map(|cab| cab.name.clone())
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("cab {} does not exist", request.cab_id))
            })?;

        let mut items = vec![SaleItem::new(
            ItemKind::Cab,
            request.cab_id,
            cab_name,
            request.quantity,
            request.unit_price,
        )];
        for line in &request.accessories {
            let name = self
                .accessories
                .get(&line.accessory_id)
                .map(|a| a.name.clone())
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "accessory {} does not exist",
                        line.accessory_id
                    ))
                })?;
            items.push(SaleItem::new(
                ItemKind::Accessory,
                line.accessory_id,
                name,
                line.quantity,
                line.unit_price,
            ));
        }

        let sale = Sale::compose(
            Uuid::new_v4(),
            request.customer_id,
            request.sold_by,
            Utc::now(),
            items,
        )?;
        self.sales.insert(sale.id, sale.clone());
        Ok(sale)
    }

    async fn void_sale(&self, id: Uuid) -> Result<(), ServiceError> {
        self.take_failure("void_sale")?;
        self.sales
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("sale {} not found", id)))
    }

    async fn append_activity(
        &self,
        entry: NewActivityEntry,
    ) -> Result<ActivityLogEntry, ServiceError> {
        self.take_failure("append_activity")?;
        let record = ActivityLogEntry {
            id: self.assign_id(),
            timestamp: Utc::now(),
            user: entry.user,
            action_type: entry.action,
            details: entry.details,
            status: entry.status,
            is_system_action: entry.is_system_action,
        };
        self.activity.lock().await.push(record.clone());
        Ok(record)
    }

    async fn list_activity(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<Page<ActivityLogEntry>, ServiceError> {
        self.take_failure("list_activity")?;
        let mut rows = self.activity.lock().await.clone();
        rows.reverse();
        Ok(Self::paginate(rows, page, limit))
    }
}
