//! Per-user refresh token store.
//!
//! Entries live for [`REFRESH_TOKEN_TTL`] after creation. Lookups ignore
//! older entries and [`spawn_purge_task`] deletes them in the background.

use std::{sync::Arc, time::Duration};

use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::repo::UserRepo;

pub const REFRESH_TOKEN_TTL: TimeDuration = TimeDuration::days(30);

fn cutoff(now: OffsetDateTime) -> OffsetDateTime {
    now - REFRESH_TOKEN_TTL
}

/// Appends a new entry. Duplicates are kept; each login owns its entry.
#[instrument(skip(repo, token))]
pub async fn add_refresh_token(repo: &dyn UserRepo, user_id: Uuid, token: &str) -> anyhow::Result<()> {
    repo.add_refresh_token(user_id, token, OffsetDateTime::now_utc()).await?;
    debug!(%user_id, "refresh token stored");
    Ok(())
}

/// Removes every entry equal to `token`. Missing tokens are not an error.
#[instrument(skip(repo, token))]
pub async fn remove_refresh_token(repo: &dyn UserRepo, user_id: Uuid, token: &str) -> anyhow::Result<()> {
    let removed = repo.remove_refresh_token(user_id, token).await?;
    debug!(%user_id, removed, "refresh token removed");
    Ok(())
}

#[instrument(skip(repo))]
pub async fn clear_all_refresh_tokens(repo: &dyn UserRepo, user_id: Uuid) -> anyhow::Result<()> {
    let removed = repo.clear_refresh_tokens(user_id).await?;
    info!(%user_id, removed, "refresh tokens cleared");
    Ok(())
}

/// Exact string membership among unexpired entries.
pub async fn has_refresh_token(repo: &dyn UserRepo, user_id: Uuid, token: &str) -> anyhow::Result<bool> {
    repo.has_refresh_token(user_id, token, cutoff(OffsetDateTime::now_utc()))
        .await
}

pub async fn purge_expired(repo: &dyn UserRepo, now: OffsetDateTime) -> anyhow::Result<u64> {
    repo.purge_refresh_tokens(cutoff(now)).await
}

pub fn spawn_purge_task(repo: Arc<dyn UserRepo>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match purge_expired(repo.as_ref(), OffsetDateTime::now_utc()).await {
                Ok(0) => {}
                Ok(n) => info!(purged = n, "expired refresh tokens purged"),
                Err(e) => error!(error = %e, "refresh token purge failed"),
            }
        }
    })
}
