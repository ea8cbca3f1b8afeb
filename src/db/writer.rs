use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::api::health::HealthState;
use crate::db::models::ActivityRow;
use crate::error::Result;
use crate::types::{DbEvent, NewLead};

/// Receives DbEvents from the HTTP handlers and persists them to SQLite.
/// Runs as a dedicated background task so requests never await the database.
pub struct DbWriter {
    pool: sqlx::SqlitePool,
    rx: mpsc::Receiver<DbEvent>,
    health: Arc<HealthState>,
}

impl DbWriter {
    pub fn new(pool: sqlx::SqlitePool, rx: mpsc::Receiver<DbEvent>, health: Arc<HealthState>) -> Self {
        Self { pool, rx, health }
    }

    /// Drains the channel until every sender is dropped. Write errors are logged, not fatal.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            self.health.dec_write_queue_pending();
            let result = match &event {
                DbEvent::Lead(lead) => self.write_lead(lead).await,
                DbEvent::Activity(name) => self.bump_activity(name).await,
            };
            if let Err(e) = result {
                error!("DB write error: {e}");
            }
        }
        info!("DB writer channel closed, exiting");
    }

    async fn write_lead(&self, lead: &NewLead) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO leads (email, session_id, source, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&lead.email)
        .bind(&lead.session_id)
        .bind(&lead.source)
        .bind(now_secs())
        .execute(&self.pool)
        .await?;
        debug!(source = ?lead.source, "Lead stored");
        Ok(())
    }

    async fn bump_activity(&self, event: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity (event, count, updated_at)
            VALUES (?, 1, ?)
            ON CONFLICT(event) DO UPDATE SET
                count = count + 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(event)
        .bind(now_secs())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub async fn lead_count(pool: &sqlx::SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn activity_counts(pool: &sqlx::SqlitePool) -> Result<Vec<ActivityRow>> {
    let rows = sqlx::query_as::<_, ActivityRow>(
        "SELECT event, count, updated_at FROM activity ORDER BY event",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> sqlx::SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    async fn drain(pool: &sqlx::SqlitePool, events: Vec<DbEvent>) -> Arc<HealthState> {
        let health = Arc::new(HealthState::new());
        let (tx, rx) = mpsc::channel(16);
        for event in events {
            health.inc_write_queue_pending();
            tx.send(event).await.unwrap();
        }
        drop(tx);
        DbWriter::new(pool.clone(), rx, Arc::clone(&health)).run().await;
        health
    }

    #[tokio::test]
    async fn leads_are_inserted() {
        let pool = memory_pool().await;
        let health = drain(
            &pool,
            vec![
                DbEvent::Lead(NewLead {
                    email: "a@example.com".into(),
                    session_id: Some("s1".into()),
                    source: Some("pricing".into()),
                }),
                DbEvent::Lead(NewLead {
                    email: "b@example.com".into(),
                    session_id: None,
                    source: None,
                }),
            ],
        )
        .await;

        assert_eq!(lead_count(&pool).await.unwrap(), 2);
        let leads: Vec<(String, Option<String>, i64)> =
            sqlx::query_as("SELECT email, session_id, created_at FROM leads ORDER BY id")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(leads[0].0, "a@example.com");
        assert_eq!(leads[0].1.as_deref(), Some("s1"));
        assert!(leads[0].2 > 0);
        assert_eq!(leads[1].1, None);
        assert_eq!(health.write_queue_pending(), 0);
    }

    #[tokio::test]
    async fn activity_counters_upsert() {
        let pool = memory_pool().await;
        drain(
            &pool,
            vec![
                DbEvent::Activity("pricing_analysis"),
                DbEvent::Activity("listing_search"),
                DbEvent::Activity("pricing_analysis"),
            ],
        )
        .await;

        let counts = activity_counts(&pool).await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].event, "listing_search");
        assert_eq!(counts[0].count, 1);
        assert_eq!(counts[1].event, "pricing_analysis");
        assert_eq!(counts[1].count, 2);
    }
}
