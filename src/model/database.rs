use crate::model::error::DatabaseResult;
use sqlx::SqlitePool;

#[derive(Debug, Clone)]
pub struct DbConnection {
    pool: SqlitePool, // cloning is cheap, pool is just a wrapper around Arc<>
}

impl DbConnection {
    pub fn connect(connection_str: &str) -> DatabaseResult<Self> {
        let pool = SqlitePool::connect_lazy(connection_str)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}
