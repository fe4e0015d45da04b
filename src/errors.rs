use serde::Serialize;
use uuid::Uuid;

/// Errors produced by repositories, services, and the backend client.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(
        #[from]
        #[serde(skip)]
        reqwest::Error,
    ),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Serialization error: {0}")]
    Serialization(
        #[from]
        #[serde(skip)]
        serde_json::Error,
    ),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// True for failures the caller can retry after re-synchronizing from
    /// the backend, as opposed to bad input or auth problems.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::Network(_) | ServiceError::Backend(_) | ServiceError::InternalError(_)
        )
    }
}

/// Stock conflicts detected while applying a sale to inventory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryFault {
    #[error("requested quantity for accessory {accessory_id} is negative")]
    NegativeQuantity { accessory_id: i64 },

    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        name: String,
        requested: i32,
        available: i32,
    },

    #[error("unknown accessory {accessory_id}")]
    UnknownAccessory { accessory_id: i64 },

    #[error("stock update failed: {0}")]
    UpdateFailed(String),
}

/// How severe a sale failure is from the operator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// Classified outcome of a failed sell-cab workflow.
///
/// The variants mirror the stages of the workflow: `Validation` failures
/// happen before any remote call, `Purchase` failures before inventory is
/// touched, `Inventory` failures leave the backend authoritative (the
/// orchestrator re-fetches both repositories), and `Critical` means a
/// purchase stayed recorded while inventory could not be reconciled and the
/// compensating reversal failed too.
#[derive(Debug, thiserror::Error)]
pub enum SaleError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("inventory conflict: {0}")]
    Inventory(#[from] InventoryFault),

    #[error("failed to record purchase: {0}")]
    Purchase(#[source] ServiceError),

    #[error("sale {sale_id} recorded but inventory is inconsistent: {detail}")]
    Critical { sale_id: Uuid, detail: String },
}

impl SaleError {
    pub fn severity(&self) -> Severity {
        match self {
            SaleError::Critical { .. } => Severity::Critical,
            _ => Severity::Warning,
        }
    }

    /// Inventory conflicts are resolved by re-fetching repository state from
    /// the backend; other kinds are not.
    pub fn triggers_refetch(&self) -> bool {
        matches!(self, SaleError::Inventory(_))
    }

    /// Stable machine-readable classification for logs and notifications.
    pub fn kind(&self) -> &'static str {
        match self {
            SaleError::Validation(_) => "validation",
            SaleError::Inventory(_) => "inventory",
            SaleError::Purchase(_) => "purchase",
            SaleError::Critical { .. } => "critical",
        }
    }
}
