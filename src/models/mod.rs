//! Domain types shared across repositories, services, and the backend
//! contract.

pub mod activity;
pub mod customer;
pub mod inventory;
pub mod sale;
pub mod user;

pub use activity::{ActionType, ActivityLogEntry, ActivityStatus, UserSnapshot};
pub use customer::{Customer, CustomerPatch, NewCustomer};
pub use inventory::{
    derive_status, Accessory, AccessoryCategory, AccessoryDraft, AccessoryPatch, Cab, CabDraft,
    CabMake, CabPatch, Material, MaterialCategory, MaterialDraft, MaterialPatch, NewAccessory,
    NewCab, NewMaterial, StatusThresholds, StockStatus, Supplier, UnitColor,
    ACCESSORY_THRESHOLDS, CAB_THRESHOLDS, MATERIAL_THRESHOLDS,
};
pub use sale::{ItemKind, Sale, SaleCategory, SaleItem};
pub use user::{NewUser, Role, User, UserPatch};
