use std::sync::Arc;

use tracing::{instrument, warn};

use crate::api::{BackendApi, NewActivityEntry, Page};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{ActionType, ActivityLogEntry, ActivityStatus, UserSnapshot};

/// Append-only audit trail client. Entries carry a denormalized user
/// snapshot and are never edited or removed once written.
pub struct ActivityLogService {
    api: Arc<dyn BackendApi>,
    event_sender: Option<EventSender>,
}

impl ActivityLogService {
    pub fn new(api: Arc<dyn BackendApi>, event_sender: Option<EventSender>) -> Self {
        Self { api, event_sender }
    }

    /// Appends one entry to the log.
    #[instrument(skip(self, user, details), fields(action = %action, user_id = user.id))]
    pub async fn record(
        &self,
        user: &UserSnapshot,
        action: ActionType,
        details: impl Into<String> + std::fmt::Debug,
        status: ActivityStatus,
        is_system_action: bool,
    ) -> Result<ActivityLogEntry, ServiceError> {
        let entry = self
            .api
            .append_activity(NewActivityEntry {
                user: user.clone(),
                action,
                details: details.into(),
                status,
                is_system_action,
            })
            .await?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::ActivityRecorded {
                    entry_id: entry.id,
                    action,
                })
                .await
            {
                warn!(error = %e, "Failed to send activity event");
            }
        }
        Ok(entry)
    }

    /// Convenience wrapper for successful login entries.
    pub async fn record_login(&self, user: &UserSnapshot) -> Result<ActivityLogEntry, ServiceError> {
        self.record(
            user,
            ActionType::Login,
            format!("{} logged in", user.full_name),
            ActivityStatus::Successful,
            false,
        )
        .await
    }

    /// Convenience wrapper for logout entries.
    pub async fn record_logout(
        &self,
        user: &UserSnapshot,
    ) -> Result<ActivityLogEntry, ServiceError> {
        self.record(
            user,
            ActionType::Logout,
            format!("{} logged out", user.full_name),
            ActivityStatus::Successful,
            false,
        )
        .await
    }

    /// Paginated log listing, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, limit: u64) -> Result<Page<ActivityLogEntry>, ServiceError> {
        self.api.list_activity(page, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryBackend;
    use crate::models::Role;

    fn snapshot() -> UserSnapshot {
        UserSnapshot {
            id: 1,
            full_name: "Admin".into(),
            role: Role::Admin,
        }
    }

    #[tokio::test]
    async fn entries_are_listed_newest_first_with_pagination() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = ActivityLogService::new(backend, None);
        let user = snapshot();

        for i in 0..3 {
            service
                .record(
                    &user,
                    ActionType::Updated,
                    format!("edit {}", i),
                    ActivityStatus::Successful,
                    false,
                )
                .await
                .unwrap();
        }

        let page = service.list(1, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.last_page, 2);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].details, "edit 2");
    }

    #[tokio::test]
    async fn login_and_logout_are_recorded_as_user_actions() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = ActivityLogService::new(backend, None);
        let user = snapshot();

        let login = service.record_login(&user).await.unwrap();
        assert_eq!(login.action_type, ActionType::Login);
        assert!(!login.is_system_action);

        let logout = service.record_logout(&user).await.unwrap();
        assert_eq!(logout.action_type, ActionType::Logout);
    }
}
