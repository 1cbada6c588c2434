//! Seeds the appointment catalog: one slot every SEED_SLOT_MINUTES minutes,
//! starting tomorrow 00:00 UTC, for SEED_DAYS days. Idempotent; re-running
//! skips slots that already exist. Users and reservations are never seeded.

use anyhow::Context;
use time::{Duration, OffsetDateTime, Time};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "melonbook_seed=info,sqlx=warn".to_string());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
    let days: i64 = std::env::var("SEED_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let slot_minutes: i64 = std::env::var("SEED_SLOT_MINUTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    anyhow::ensure!(days > 0, "SEED_DAYS must be positive");
    anyhow::ensure!(
        slot_minutes > 0 && 24 * 60 % slot_minutes == 0,
        "SEED_SLOT_MINUTES must divide a day"
    );

    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations").run(&db).await?;

    let start = (OffsetDateTime::now_utc().date() + Duration::days(1)).with_time(Time::MIDNIGHT);
    let start = start.assume_utc();
    let end = start + Duration::days(days);
    let step = Duration::minutes(slot_minutes);

    let mut slot_at = start;
    let mut created: u64 = 0;
    while slot_at < end {
        let result = sqlx::query(
            r#"
            INSERT INTO appointments (slot_at)
            VALUES ($1)
            ON CONFLICT (slot_at) DO NOTHING
            "#,
        )
        .bind(slot_at)
        .execute(&db)
        .await?;
        created += result.rows_affected();
        slot_at += step;
    }

    tracing::info!(
        %start,
        %end,
        slot_minutes,
        created,
        "appointment catalog seeded"
    );
    Ok(())
}
