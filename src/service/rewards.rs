use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::model::{DatabaseError, DatabaseResult};

/// Accumulates a user's total points and completed-module count.
///
/// The ledger performs no deduplication: at-most-once semantics are the
/// grader's responsibility, which is why `award` runs on the grader's open
/// transaction.
#[derive(Debug, Clone)]
pub struct RewardsLedger;

impl RewardsLedger {
    pub async fn award(
        conn: &mut SqliteConnection,
        user_id: Uuid,
        points: i64,
    ) -> DatabaseResult<()> {
        let result = sqlx::query(
            "UPDATE users SET total_points = total_points + ?, \
             modules_completed = modules_completed + 1 WHERE id = ?",
        )
        .bind(points)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::SqlxError(sqlx::Error::RowNotFound));
        }
        Ok(())
    }
}
