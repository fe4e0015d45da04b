use async_trait::async_trait;
use rust_decimal::Decimal;
use validator::Validate;

use super::{FilterSet, InventoryEntity};
use crate::api::BackendApi;
use crate::errors::ServiceError;
use crate::images;
use crate::models::{
    Accessory, AccessoryDraft, AccessoryPatch, Cab, CabDraft, CabPatch, ItemKind, Material,
    MaterialDraft, MaterialPatch, NewAccessory, NewCab, NewMaterial, StatusThresholds, StockStatus,
    ACCESSORY_THRESHOLDS, CAB_THRESHOLDS, MATERIAL_THRESHOLDS,
};

fn check_patch_name(name: &Option<String>) -> Result<(), ServiceError> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError("Name must not be empty".into()));
        }
    }
    Ok(())
}

fn check_patch_quantity(quantity: Option<i32>) -> Result<(), ServiceError> {
    if let Some(q) = quantity {
        if q < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must not be negative".into(),
            ));
        }
    }
    Ok(())
}

fn check_patch_price(price: Option<Decimal>) -> Result<(), ServiceError> {
    if let Some(p) = price {
        if p.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "Price must not be negative".into(),
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl InventoryEntity for Cab {
    type Draft = CabDraft;
    type Input = NewCab;
    type Patch = CabPatch;

    const KIND: ItemKind = ItemKind::Cab;

    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn quantity(&self) -> i32 {
        self.quantity
    }
    fn price(&self) -> Decimal {
        self.price
    }
    fn status(&self) -> StockStatus {
        self.status
    }
    fn thresholds() -> &'static StatusThresholds {
        &CAB_THRESHOLDS
    }

    fn quantity_patch(quantity: i32) -> CabPatch {
        CabPatch {
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    fn prepare(draft: CabDraft) -> Result<NewCab, ServiceError> {
        draft
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let make = draft
            .make
            .ok_or_else(|| ServiceError::ValidationError("Make is required".into()))?;
        let unit_color = draft
            .unit_color
            .ok_or_else(|| ServiceError::ValidationError("Unit color is required".into()))?;
        Ok(NewCab {
            name: draft.name,
            make,
            unit_color,
            quantity: draft.quantity,
            price: draft.price,
            image: images::sanitize_or_default(draft.image.as_deref()),
        })
    }

    fn merged(&self, patch: &CabPatch) -> Result<Cab, ServiceError> {
        check_patch_name(&patch.name)?;
        check_patch_quantity(patch.quantity)?;
        check_patch_price(patch.price)?;
        let mut row = self.clone();
        if let Some(name) = &patch.name {
            row.name = name.clone();
        }
        if let Some(make) = patch.make {
            row.make = make;
        }
        if let Some(color) = patch.unit_color {
            row.unit_color = color;
        }
        if let Some(quantity) = patch.quantity {
            row.quantity = quantity;
        }
        if let Some(price) = patch.price {
            row.price = price;
        }
        if let Some(image) = &patch.image {
            row.image = images::sanitize_or_default(Some(image));
        }
        row.status = Self::derive(row.quantity);
        Ok(row)
    }

    fn matches(&self, filters: &FilterSet) -> bool {
        let make = self.make.to_string();
        let color = self.unit_color.to_string();
        filters.matches_equality(&filters.make, &make)
            && filters.matches_equality(&filters.color, &color)
            && filters.matches_status(self.status)
            && filters.matches_search(&[&self.name, &make])
    }

    async fn fetch_all(api: &dyn BackendApi) -> Result<Vec<Cab>, ServiceError> {
        api.list_cabs().await
    }
    async fn create(api: &dyn BackendApi, input: NewCab) -> Result<Cab, ServiceError> {
        api.create_cab(input).await
    }
    async fn push(api: &dyn BackendApi, id: i64, patch: CabPatch) -> Result<Cab, ServiceError> {
        api.update_cab(id, patch).await
    }
    async fn remove(api: &dyn BackendApi, id: i64) -> Result<(), ServiceError> {
        api.delete_cab(id).await
    }
}

#[async_trait]
impl InventoryEntity for Accessory {
    type Draft = AccessoryDraft;
    type Input = NewAccessory;
    type Patch = AccessoryPatch;

    const KIND: ItemKind = ItemKind::Accessory;

    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn quantity(&self) -> i32 {
        self.quantity
    }
    fn price(&self) -> Decimal {
        self.price
    }
    fn status(&self) -> StockStatus {
        self.status
    }
    fn thresholds() -> &'static StatusThresholds {
        &ACCESSORY_THRESHOLDS
    }

    fn quantity_patch(quantity: i32) -> AccessoryPatch {
        AccessoryPatch {
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    fn prepare(draft: AccessoryDraft) -> Result<NewAccessory, ServiceError> {
        draft
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let category = draft
            .category
            .ok_or_else(|| ServiceError::ValidationError("Category is required".into()))?;
        let supplier = draft
            .supplier
            .ok_or_else(|| ServiceError::ValidationError("Supplier is required".into()))?;
        Ok(NewAccessory {
            name: draft.name,
            category,
            supplier,
            quantity: draft.quantity,
            price: draft.price,
            image: images::sanitize_or_default(draft.image.as_deref()),
        })
    }

    fn merged(&self, patch: &AccessoryPatch) -> Result<Accessory, ServiceError> {
        check_patch_name(&patch.name)?;
        check_patch_quantity(patch.quantity)?;
        check_patch_price(patch.price)?;
        let mut row = self.clone();
        if let Some(name) = &patch.name {
            row.name = name.clone();
        }
        if let Some(category) = patch.category {
            row.category = category;
        }
        if let Some(supplier) = patch.supplier {
            row.supplier = supplier;
        }
        if let Some(quantity) = patch.quantity {
            row.quantity = quantity;
        }
        if let Some(price) = patch.price {
            row.price = price;
        }
        if let Some(image) = &patch.image {
            row.image = images::sanitize_or_default(Some(image));
        }
        row.status = Self::derive(row.quantity);
        Ok(row)
    }

    fn matches(&self, filters: &FilterSet) -> bool {
        let category = self.category.to_string();
        let supplier = self.supplier.to_string();
        filters.matches_equality(&filters.category, &category)
            && filters.matches_equality(&filters.supplier, &supplier)
            && filters.matches_status(self.status)
            && filters.matches_search(&[&self.name, &category])
    }

    async fn fetch_all(api: &dyn BackendApi) -> Result<Vec<Accessory>, ServiceError> {
        api.list_accessories().await
    }
    async fn create(api: &dyn BackendApi, input: NewAccessory) -> Result<Accessory, ServiceError> {
        api.create_accessory(input).await
    }
    async fn push(
        api: &dyn BackendApi,
        id: i64,
        patch: AccessoryPatch,
    ) -> Result<Accessory, ServiceError> {
        api.update_accessory(id, patch).await
    }
    async fn remove(api: &dyn BackendApi, id: i64) -> Result<(), ServiceError> {
        api.delete_accessory(id).await
    }
}

#[async_trait]
impl InventoryEntity for Material {
    type Draft = MaterialDraft;
    type Input = NewMaterial;
    type Patch = MaterialPatch;

    const KIND: ItemKind = ItemKind::Material;

    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn quantity(&self) -> i32 {
        self.quantity
    }
    fn price(&self) -> Decimal {
        self.price.unwrap_or(Decimal::ZERO)
    }
    fn status(&self) -> StockStatus {
        self.status
    }
    fn thresholds() -> &'static StatusThresholds {
        &MATERIAL_THRESHOLDS
    }

    fn quantity_patch(quantity: i32) -> MaterialPatch {
        MaterialPatch {
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    fn prepare(draft: MaterialDraft) -> Result<NewMaterial, ServiceError> {
        draft
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        check_patch_price(draft.price)?;
        let category = draft
            .category
            .ok_or_else(|| ServiceError::ValidationError("Category is required".into()))?;
        let supplier = draft
            .supplier
            .ok_or_else(|| ServiceError::ValidationError("Supplier is required".into()))?;
        Ok(NewMaterial {
            name: draft.name,
            category,
            supplier,
            quantity: draft.quantity,
            price: draft.price,
        })
    }

    fn merged(&self, patch: &MaterialPatch) -> Result<Material, ServiceError> {
        check_patch_name(&patch.name)?;
        check_patch_quantity(patch.quantity)?;
        check_patch_price(patch.price)?;
        let mut row = self.clone();
        if let Some(name) = &patch.name {
            row.name = name.clone();
        }
        if let Some(category) = patch.category {
            row.category = category;
        }
        if let Some(supplier) = patch.supplier {
            row.supplier = supplier;
        }
        if let Some(quantity) = patch.quantity {
            row.quantity = quantity;
        }
        if let Some(price) = patch.price {
            row.price = Some(price);
        }
        row.status = Self::derive(row.quantity);
        Ok(row)
    }

    fn matches(&self, filters: &FilterSet) -> bool {
        let category = self.category.to_string();
        let supplier = self.supplier.to_string();
        filters.matches_equality(&filters.category, &category)
            && filters.matches_equality(&filters.supplier, &supplier)
            && filters.matches_status(self.status)
            && filters.matches_search(&[&self.name, &category])
    }

    async fn fetch_all(api: &dyn BackendApi) -> Result<Vec<Material>, ServiceError> {
        api.list_materials().await
    }
    async fn create(api: &dyn BackendApi, input: NewMaterial) -> Result<Material, ServiceError> {
        api.create_material(input).await
    }
    async fn push(
        api: &dyn BackendApi,
        id: i64,
        patch: MaterialPatch,
    ) -> Result<Material, ServiceError> {
        api.update_material(id, patch).await
    }
    async fn remove(api: &dyn BackendApi, id: i64) -> Result<(), ServiceError> {
        api.delete_material(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessoryCategory, CabMake, Supplier, UnitColor};
    use rust_decimal_macros::dec;

    fn cab() -> Cab {
        Cab {
            id: 1,
            name: "City Sedan".into(),
            make: CabMake::Toyota,
            unit_color: UnitColor::White,
            quantity: 10,
            price: dec!(15000),
            status: Cab::derive(10),
            image: images::DEFAULT_IMAGE.into(),
        }
    }

    #[test]
    fn prepare_rejects_missing_enumerated_fields() {
        let draft = CabDraft {
            name: "City Sedan".into(),
            make: None,
            unit_color: Some(UnitColor::White),
            quantity: 3,
            price: dec!(15000),
            image: None,
        };
        let err = Cab::prepare(draft).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn merged_rederives_status_from_quantity() {
        let merged = cab().merged(&Cab::quantity_patch(0)).unwrap();
        assert_eq!(merged.quantity, 0);
        assert_eq!(merged.status, StockStatus::OutOfStock);

        let merged = cab().merged(&Cab::quantity_patch(5)).unwrap();
        assert_eq!(merged.status, StockStatus::LowStock);
    }

    #[test]
    fn merged_rejects_negative_quantity() {
        assert!(cab().merged(&Cab::quantity_patch(-1)).is_err());
    }

    #[test]
    fn merged_sanitizes_patched_images() {
        let patch = CabPatch {
            image: Some("data:text/html;base64,PGI+aGk8L2I+".into()),
            ..Default::default()
        };
        let merged = cab().merged(&patch).unwrap();
        assert_eq!(merged.image, images::DEFAULT_IMAGE);
    }

    #[test]
    fn accessory_filters_apply_conjunctively() {
        let accessory = Accessory {
            id: 2,
            name: "Dash Cam".into(),
            category: AccessoryCategory::Electronics,
            supplier: Supplier::PrimeAuto,
            quantity: 4,
            price: dec!(100),
            status: Accessory::derive(4),
            image: images::DEFAULT_IMAGE.into(),
        };
        let mut filters = FilterSet {
            category: Some("Electronics".into()),
            search: "dash".into(),
            ..Default::default()
        };
        assert!(accessory.matches(&filters));
        filters.supplier = Some("RoadMax".into());
        assert!(!accessory.matches(&filters));
    }
}
