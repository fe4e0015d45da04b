//! Per-entity inventory repositories.
//!
//! A repository owns the client-side cache for one entity type. The cache
//! is the only mutable source of truth in the client; the backend stays
//! authoritative, so every successful write replaces local rows with what
//! the backend returned, and every failed write rolls the cache back to
//! its pre-call snapshot.

pub mod entities;
pub mod filter;
pub mod rollback;

pub use filter::FilterSet;
pub use rollback::with_rollback;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::api::BackendApi;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{derive_status, ItemKind, StatusThresholds, StockStatus};

/// An inventory row type the generic repository knows how to manage.
#[async_trait]
pub trait InventoryEntity: Clone + Send + Sync + 'static {
    /// Unvalidated form input for creation.
    type Draft: Debug + Send + Sync;
    /// Validated create payload.
    type Input: Debug + Send + Sync;
    /// Partial update merged onto an existing row.
    type Patch: Clone + Debug + Send + Sync;

    const KIND: ItemKind;

    fn id(&self) -> i64;
    fn name(&self) -> &str;
    fn quantity(&self) -> i32;
    fn price(&self) -> Decimal;
    fn status(&self) -> StockStatus;
    fn thresholds() -> &'static StatusThresholds;

    /// The entity's quantity-to-status rule.
    fn derive(quantity: i32) -> StockStatus {
        derive_status(quantity, Self::thresholds())
    }

    /// A patch that only changes the quantity; used by the sale workflow.
    fn quantity_patch(quantity: i32) -> Self::Patch;

    /// Validates form input locally and produces the create payload.
    /// Rejection here means no remote call was made.
    fn prepare(draft: Self::Draft) -> Result<Self::Input, ServiceError>;

    /// Applies a partial update to a copy of this row, re-validating and
    /// re-deriving status.
    fn merged(&self, patch: &Self::Patch) -> Result<Self, ServiceError>;

    fn matches(&self, filters: &FilterSet) -> bool;

    async fn fetch_all(api: &dyn BackendApi) -> Result<Vec<Self>, ServiceError>;
    async fn create(api: &dyn BackendApi, input: Self::Input) -> Result<Self, ServiceError>;
    async fn push(api: &dyn BackendApi, id: i64, patch: Self::Patch) -> Result<Self, ServiceError>;
    async fn remove(api: &dyn BackendApi, id: i64) -> Result<(), ServiceError>;
}

/// Client-side cache plus CRUD for one inventory entity type.
pub struct InventoryRepository<T: InventoryEntity> {
    api: Arc<dyn BackendApi>,
    rows: RwLock<Vec<T>>,
    filters: RwLock<FilterSet>,
    last_error: RwLock<Option<String>>,
    event_sender: Option<EventSender>,
}

impl<T: InventoryEntity> InventoryRepository<T> {
    pub fn new(api: Arc<dyn BackendApi>, event_sender: Option<EventSender>) -> Self {
        Self {
            api,
            rows: RwLock::new(Vec::new()),
            filters: RwLock::new(FilterSet::default()),
            last_error: RwLock::new(None),
            event_sender,
        }
    }

    /// Replaces the cache with the backend's rows. On failure the existing
    /// rows are left untouched and the error is kept for display.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn initialize(&self) -> Result<(), ServiceError> {
        match T::fetch_all(self.api.as_ref()).await {
            Ok(fetched) => {
                info!(count = fetched.len(), "Inventory refreshed from backend");
                *self.rows.write().await = fetched;
                *self.last_error.write().await = None;
                self.emit(Event::InventoryRefetched { kind: T::KIND }).await;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Inventory refresh failed, keeping cached rows");
                *self.last_error.write().await = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Validates the draft locally, creates the row remotely, and appends
    /// the backend's version (assigned id, derived status) to the cache.
    #[instrument(skip(self, draft), fields(kind = %T::KIND))]
    pub async fn add(&self, draft: T::Draft) -> Result<T, ServiceError> {
        let input = T::prepare(draft)?;
        let created = T::create(self.api.as_ref(), input).await?;
        info!(id = created.id(), "Inventory row created");
        self.rows.write().await.push(created.clone());
        Ok(created)
    }

    /// Merges a partial update onto the cached row, applies it
    /// optimistically, and pushes it to the backend. A failed push restores
    /// the pre-call row exactly.
    #[instrument(skip(self, patch), fields(kind = %T::KIND, id = id))]
    pub async fn update(&self, id: i64, patch: T::Patch) -> Result<T, ServiceError> {
        let current = self
            .get(id)
            .await
            .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", T::KIND, id)))?;
        let old_quantity = current.quantity();
        let optimistic = current.merged(&patch)?;

        let confirmed = with_rollback(
            &self.rows,
            |row| row.id() == id,
            optimistic,
            T::push(self.api.as_ref(), id, patch.clone()),
        )
        .await?;

        {
            let mut rows = self.rows.write().await;
            if let Some(slot) = rows.iter_mut().find(|row| row.id() == id) {
                *slot = confirmed.clone();
            }
        }

        if confirmed.quantity() != old_quantity {
            self.emit(Event::InventoryAdjusted {
                kind: T::KIND,
                item_id: id,
                old_quantity,
                new_quantity: confirmed.quantity(),
            })
            .await;
        }
        Ok(confirmed)
    }

    /// Deletes remotely, then removes from the cache only after the backend
    /// confirmed.
    #[instrument(skip(self), fields(kind = %T::KIND, id = id))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        if self.get(id).await.is_none() {
            return Err(ServiceError::NotFound(format!(
                "{} {} not found",
                T::KIND,
                id
            )));
        }
        T::remove(self.api.as_ref(), id).await?;
        self.rows.write().await.retain(|row| row.id() != id);
        info!("Inventory row deleted");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Option<T> {
        self.rows
            .read()
            .await
            .iter()
            .find(|row| row.id() == id)
            .cloned()
    }

    pub async fn all(&self) -> Vec<T> {
        self.rows.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Rows passing the active filters and committed search text.
    pub async fn filtered(&self) -> Vec<T> {
        let filters = self.filters.read().await.clone();
        self.rows
            .read()
            .await
            .iter()
            .filter(|row| row.matches(&filters))
            .cloned()
            .collect()
    }

    pub async fn set_filters(&self, filters: FilterSet) {
        *self.filters.write().await = filters;
    }

    /// Commits search text. Debouncing raw keystrokes happens upstream in
    /// [`crate::search::Debouncer`]; by the time text arrives here it is
    /// final.
    pub async fn set_search(&self, text: impl Into<String>) {
        self.filters.write().await.search = text.into();
    }

    /// Clears every filter and the committed search text. Idempotent.
    pub async fn reset_filters(&self) {
        *self.filters.write().await = FilterSet::default();
    }

    pub async fn filters(&self) -> FilterSet {
        self.filters.read().await.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub async fn low_stock_count(&self) -> usize {
        self.rows
            .read()
            .await
            .iter()
            .filter(|row| row.status() == StockStatus::LowStock)
            .count()
    }

    pub async fn out_of_stock_count(&self) -> usize {
        self.rows
            .read()
            .await
            .iter()
            .filter(|row| row.status() == StockStatus::OutOfStock)
            .count()
    }

    /// Total value of cached stock, `Σ price × quantity`.
    pub async fn total_value(&self) -> Decimal {
        self.rows
            .read()
            .await
            .iter()
            .map(|row| row.price() * Decimal::from(row.quantity()))
            .sum()
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send inventory event");
            }
        }
    }
}
