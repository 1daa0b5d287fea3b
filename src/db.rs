use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::OnceCell;
use tracing::{debug, info};

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Process-wide connection pool. The first caller connects; later callers
/// get a clone of the same pool.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    if let Some(pool) = POOL.get() {
        debug!("reusing database pool");
        return Ok(pool.clone());
    }

    let pool = POOL
        .get_or_try_init(|| async {
            let pool = PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(database_url)
                .await
                .context("connect to database")?;
            info!(max_connections, "database connected");
            Ok::<_, anyhow::Error>(pool)
        })
        .await?;
    Ok(pool.clone())
}
