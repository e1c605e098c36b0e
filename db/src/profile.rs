use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::profile::Profile;

pub async fn get_profile_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<Profile>> {
    sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Returns `false` when no profile row exists for `user_id`.
pub async fn update_tier<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    tier: &str,
) -> Res<bool> {
    let result = sqlx::query("UPDATE profiles SET tier = $1, updated_at = now() WHERE id = $2")
        .bind(tier)
        .bind(user_id)
        .execute(executor)
        .await
        .map_err(AppError::from)?;

    Ok(result.rows_affected() > 0)
}
