use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::api::BackendApi;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::inventory::with_rollback;
use crate::models::{Customer, CustomerPatch, NewCustomer};

/// Service for managing customers. Customers are created, edited, and
/// deleted independently of sales; sales only reference them by id.
pub struct CustomerService {
    api: Arc<dyn BackendApi>,
    rows: RwLock<Vec<Customer>>,
    event_sender: Option<EventSender>,
}

impl CustomerService {
    pub fn new(api: Arc<dyn BackendApi>, event_sender: Option<EventSender>) -> Self {
        Self {
            api,
            rows: RwLock::new(Vec::new()),
            event_sender,
        }
    }

    /// Refreshes the customer cache; a failed fetch leaves it untouched.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), ServiceError> {
        let fetched = self.api.list_customers().await?;
        info!(count = fetched.len(), "Customers refreshed from backend");
        *self.rows.write().await = fetched;
        Ok(())
    }

    /// Creates a new customer after local validation.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: NewCustomer) -> Result<Customer, ServiceError> {
        input
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let created = self.api.create_customer(input).await?;
        self.rows.write().await.push(created.clone());
        self.emit(Event::CustomerCreated(created.id)).await;
        Ok(created)
    }

    /// Merges a partial update onto the cached row and pushes it; a failed
    /// push restores the pre-call row.
    #[instrument(skip(self, patch), fields(customer_id = id))]
    pub async fn update(&self, id: i64, patch: CustomerPatch) -> Result<Customer, ServiceError> {
        patch
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let current = self
            .get(id)
            .await
            .ok_or_else(|| ServiceError::NotFound(format!("customer {} not found", id)))?;
        let optimistic = current.merged(&patch);

        let confirmed = with_rollback(
            &self.rows,
            |row: &Customer| row.id == id,
            optimistic,
            self.api.update_customer(id, patch.clone()),
        )
        .await?;

        {
            let mut rows = self.rows.write().await;
            if let Some(slot) = rows.iter_mut().find(|row| row.id == id) {
                *slot = confirmed.clone();
            }
        }
        self.emit(Event::CustomerUpdated(id)).await;
        Ok(confirmed)
    }

    /// Deletes remotely, then drops the cached row.
    #[instrument(skip(self), fields(customer_id = id))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        if self.get(id).await.is_none() {
            return Err(ServiceError::NotFound(format!("customer {} not found", id)));
        }
        self.api.delete_customer(id).await?;
        self.rows.write().await.retain(|row| row.id != id);
        self.emit(Event::CustomerDeleted(id)).await;
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Option<Customer> {
        self.rows
            .read()
            .await
            .iter()
            .find(|row| row.id == id)
            .cloned()
    }

    pub async fn all(&self) -> Vec<Customer> {
        self.rows.read().await.clone()
    }

    /// Case-insensitive substring search over name and email.
    pub async fn search(&self, term: &str) -> Vec<Customer> {
        let needle = term.to_lowercase();
        self.rows
            .read()
            .await
            .iter()
            .filter(|row| {
                row.full_name.to_lowercase().contains(&needle)
                    || row.email.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send customer event");
            }
        }
    }
}
