use sqlx::postgres::PgPoolOptions;

/// Connect to Postgres with a bounded pool. Fails fast at boot rather than
/// lazily on the first request.
pub async fn connect_pg(database_url: &str, max_connections: u32) -> anyhow::Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}
