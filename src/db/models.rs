/// Row types for the tables in migrations/0001_init.sql.

#[derive(Debug, sqlx::FromRow, serde::Serialize)]
pub struct ActivityRow {
    pub event: String,
    pub count: i64,
    pub updated_at: i64,
}
