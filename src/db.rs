use anyhow::Context;
use sqlx::MySqlPool;
use tracing::info;

use crate::store::mysql::SCHEMA;

/// Connects and makes sure the document table exists.
pub async fn init_db(database_url: &str) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::query(SCHEMA)
        .execute(&pool)
        .await
        .context("Failed to create the documents table")?;

    info!("Database ready");
    Ok(pool)
}
