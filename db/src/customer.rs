use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::customer::Customer;

pub async fn get_customer_by_user_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Option<Customer>> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_customer_by_stripe_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    stripe_customer_id: &str,
) -> Res<Option<Customer>> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE stripe_customer_id = $1")
        .bind(stripe_customer_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}
