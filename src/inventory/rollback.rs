use std::future::Future;

use tokio::sync::RwLock;

use crate::errors::ServiceError;

/// Optimistic-update wrapper: swap the matching row for its optimistic
/// version, run the remote call, and restore the snapshot if the call
/// fails. The caller is responsible for writing the backend's confirmed
/// row on success.
///
/// The lock is only held while swapping rows, never across the remote
/// await, so independent updates can stay in flight concurrently.
pub async fn with_rollback<T, R, Fut>(
    rows: &RwLock<Vec<T>>,
    locate: impl Fn(&T) -> bool,
    optimistic: T,
    remote: Fut,
) -> Result<R, ServiceError>
where
    T: Clone,
    Fut: Future<Output = Result<R, ServiceError>>,
{
    let snapshot = {
        let mut guard = rows.write().await;
        let slot = guard
            .iter_mut()
            .find(|row| locate(row))
            .ok_or_else(|| ServiceError::NotFound("row disappeared before update".into()))?;
        std::mem::replace(slot, optimistic)
    };

    match remote.await {
        Ok(confirmed) => Ok(confirmed),
        Err(err) => {
            let mut guard = rows.write().await;
            if let Some(slot) = guard.iter_mut().find(|row| locate(row)) {
                *slot = snapshot;
            }
            Err(err)
        }
    }
}
