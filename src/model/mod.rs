mod database;
pub use database::DbConnection;

pub mod entity;

mod error;
pub use error::{DatabaseError, DatabaseResult};

mod repo;
pub use repo::{EntityRepository, Page, PaginatableRepository, ResourceType, ResourceTyped};

use sqlx::{Sqlite, SqlitePool, Transaction};

#[derive(Debug, Clone)]
pub struct ModelManager {
    database: DbConnection,
}

impl ModelManager {
    pub fn new(conn: DbConnection) -> Self {
        Self { database: conn }
    }

    pub fn executor(&self) -> &SqlitePool {
        self.database.pool()
    }

    /// Transactional boundary for mutating operations. Either every write
    /// issued on the returned transaction commits, or none of them do.
    pub async fn begin(&self) -> DatabaseResult<Transaction<'static, Sqlite>> {
        Ok(self.database.pool().begin().await?)
    }
}
