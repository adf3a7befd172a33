//! Listener profile repository implementation.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use tokio::sync::watch;
use uuid::Uuid;

use solace_core::error::{AppError, ErrorKind};
use solace_core::result::AppResult;
use solace_entity::listener::model::ListenerProfile;
use solace_entity::listener::status::AppStatus;
use solace_entity::listener::store::ProfileStore;

/// Repository for listener profile reads, writes and live subscriptions.
///
/// Live subscriptions are served by an in-process watch hub that every
/// repository write publishes into; the engine runs as a single-process
/// daemon, so writes that bypass the repository are out of contract.
#[derive(Debug)]
pub struct ListenerRepository {
    pool: PgPool,
    watchers: DashMap<Uuid, watch::Sender<Option<ListenerProfile>>>,
}

impl ListenerRepository {
    /// Create a new listener repository.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            watchers: DashMap::new(),
        }
    }

    /// Profiles that are both `Available` and flagged online, the
    /// matching query shape used by the seeker-facing search.
    pub async fn find_matchable(&self) -> AppResult<Vec<ListenerProfile>> {
        sqlx::query_as::<_, ListenerProfile>(
            "SELECT * FROM listeners
             WHERE app_status = 'available' AND is_online = TRUE
             ORDER BY last_seen_at DESC NULLS LAST",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to query matchable listeners", e)
        })
    }

    /// Publish an updated profile to any live subscribers.
    fn publish(&self, listener_id: Uuid, profile: Option<ListenerProfile>) {
        if let Some(sender) = self.watchers.get(&listener_id) {
            let _ = sender.send(profile);
        }
    }
}

#[async_trait]
impl ProfileStore for ListenerRepository {
    async fn get(&self, listener_id: Uuid) -> AppResult<Option<ListenerProfile>> {
        sqlx::query_as::<_, ListenerProfile>("SELECT * FROM listeners WHERE id = $1")
            .bind(listener_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find listener by id", e)
            })
    }

    async fn watch(&self, listener_id: Uuid) -> AppResult<watch::Receiver<Option<ListenerProfile>>> {
        let current = self.get(listener_id).await?;
        let entry = self
            .watchers
            .entry(listener_id)
            .or_insert_with(|| watch::channel(None).0);
        let _ = entry.send(current);
        Ok(entry.subscribe())
    }

    async fn create(&self, profile: &ListenerProfile) -> AppResult<ListenerProfile> {
        let created = sqlx::query_as::<_, ListenerProfile>(
            "INSERT INTO listeners
                (id, display_name, app_status, is_online, account_status, is_admin,
                 last_seen_at, offline_reason, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(profile.id)
        .bind(&profile.display_name)
        .bind(profile.app_status)
        .bind(profile.is_online)
        .bind(profile.account_status)
        .bind(profile.is_admin)
        .bind(profile.last_seen_at)
        .bind(&profile.offline_reason)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create listener", e))?;

        self.publish(created.id, Some(created.clone()));
        Ok(created)
    }

    async fn set_app_status(&self, listener_id: Uuid, status: AppStatus) -> AppResult<()> {
        let updated = sqlx::query_as::<_, ListenerProfile>(
            "UPDATE listeners SET app_status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(listener_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update app status", e)
        })?;

        match updated {
            Some(profile) => {
                self.publish(listener_id, Some(profile));
                Ok(())
            }
            None => Err(AppError::not_found(format!(
                "Listener {listener_id} not found"
            ))),
        }
    }

    async fn set_online_flag(
        &self,
        listener_id: Uuid,
        online: bool,
        reason: Option<&str>,
    ) -> AppResult<bool> {
        // The marker only describes forced-offline writes.
        let reason = if online { None } else { reason };

        let updated = sqlx::query_as::<_, ListenerProfile>(
            "UPDATE listeners
             SET is_online = $2, offline_reason = $3, last_seen_at = NOW(), updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(listener_id)
        .bind(online)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update online flag", e)
        })?;

        match updated {
            Some(profile) => {
                self.publish(listener_id, Some(profile));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_online_ids(&self) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM listeners WHERE is_online = TRUE")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list online listeners", e)
            })
    }
}
