use sqlx::postgres::PgPool;

use crate::types::AppResult;

pub async fn health_check(pool: &PgPool) -> AppResult<()> {
    let _result = sqlx::query("SELECT 1").fetch_one(pool).await?;

    Ok(())
}
