use std::sync::Arc;

use tracing::{info, instrument, warn};
use validator::Validate;

use crate::api::BackendApi;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{NewUser, User, UserPatch};

/// Service for managing operator accounts. Every call goes out with the
/// session bearer token; the backend rejects unauthenticated access.
pub struct UserService {
    api: Arc<dyn BackendApi>,
    event_sender: Option<EventSender>,
}

impl UserService {
    pub fn new(api: Arc<dyn BackendApi>, event_sender: Option<EventSender>) -> Self {
        Self { api, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<User>, ServiceError> {
        self.api.list_users().await
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create(&self, input: NewUser) -> Result<User, ServiceError> {
        input
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let created = self.api.create_user(input).await?;
        info!(user_id = created.id, "User created");
        self.emit(Event::UserCreated(created.id)).await;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<User, ServiceError> {
        self.api.get_user(id).await
    }

    #[instrument(skip(self, patch), fields(user_id = id))]
    pub async fn update(&self, id: i64, patch: UserPatch) -> Result<User, ServiceError> {
        patch
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let updated = self.api.update_user(id, patch).await?;
        self.emit(Event::UserUpdated(id)).await;
        Ok(updated)
    }

    #[instrument(skip(self), fields(user_id = id))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.api.delete_user(id).await?;
        self.emit(Event::UserDeleted(id)).await;
        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send user event");
            }
        }
    }
}
