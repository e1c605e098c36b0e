use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::{dtos::subscription::SubscriptionUpsert, models::subscription::Subscription};

pub async fn get_subscription_by_customer_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    customer_id: &str,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Inserts or fully overwrites the row for `data.customer_id`. Columns absent
/// from `data` are written as NULL, never merged with the previous row.
pub async fn upsert_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: &SubscriptionUpsert,
) -> Res<()> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions (
            customer_id, subscription_id, price_id, status,
            current_period_start, current_period_end, cancel_at_period_end,
            payment_method_brand, payment_method_last4, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        ON CONFLICT (customer_id) DO UPDATE SET
            subscription_id = EXCLUDED.subscription_id,
            price_id = EXCLUDED.price_id,
            status = EXCLUDED.status,
            current_period_start = EXCLUDED.current_period_start,
            current_period_end = EXCLUDED.current_period_end,
            cancel_at_period_end = EXCLUDED.cancel_at_period_end,
            payment_method_brand = EXCLUDED.payment_method_brand,
            payment_method_last4 = EXCLUDED.payment_method_last4,
            updated_at = now()
        "#,
    )
    .bind(&data.customer_id)
    .bind(&data.subscription_id)
    .bind(&data.price_id)
    .bind(&data.status)
    .bind(data.current_period_start)
    .bind(data.current_period_end)
    .bind(data.cancel_at_period_end)
    .bind(&data.payment_method_brand)
    .bind(&data.payment_method_last4)
    .execute(executor)
    .await
    .map_err(AppError::from)?;

    Ok(())
}
