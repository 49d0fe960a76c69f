use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};

/// Closed status set for a progress record. Transitions are monotonic:
/// not_started -> in_progress -> completed, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    /// Explicit transition table. Staying on the current status is always
    /// allowed; regressions are not.
    pub fn can_advance(self, to: ProgressStatus) -> bool {
        use ProgressStatus::*;
        match (self, to) {
            (a, b) if a == b => true,
            (NotStarted, InProgress) | (NotStarted, Completed) | (InProgress, Completed) => true,
            _ => false,
        }
    }
}

impl From<&str> for ProgressStatus {
    fn from(value: &str) -> Self {
        match value {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::NotStarted,
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Per-user, per-module progress record. Unique on (user_id, module_id).
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ProgressEntity {
    id: Uuid,
    user_id: Uuid,
    module_id: Uuid,
    status: String,
    progress_percentage: f64,
    current_section_id: Option<i64>,
    completed_sections: Json<Vec<i64>>,
    quiz_score: Option<i64>,
    quiz_attempts: i64,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    last_accessed_at: DateTime<Utc>,
    time_spent_minutes: i64,
}

impl ResourceTyped for ProgressEntity {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Progress
    }
}

impl ProgressEntity {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn module_id(&self) -> Uuid {
        self.module_id
    }

    pub fn status(&self) -> ProgressStatus {
        ProgressStatus::from(self.status.as_str())
    }

    pub fn progress_percentage(&self) -> f64 {
        self.progress_percentage
    }

    pub fn current_section_id(&self) -> Option<i64> {
        self.current_section_id
    }

    pub fn completed_sections(&self) -> &[i64] {
        &self.completed_sections
    }

    pub fn completed_section_set(&self) -> BTreeSet<i64> {
        self.completed_sections.iter().copied().collect()
    }

    pub fn quiz_score(&self) -> Option<i64> {
        self.quiz_score
    }

    pub fn quiz_attempts(&self) -> i64 {
        self.quiz_attempts
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    pub fn time_spent_minutes(&self) -> i64 {
        self.time_spent_minutes
    }
}

impl ProgressEntity {
    /// Inserts a fresh not-started record for (user, module).
    pub async fn create(
        conn: &mut SqliteConnection,
        user_id: Uuid,
        module_id: Uuid,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let status = ProgressStatus::NotStarted.to_string();
        sqlx::query(
            "INSERT INTO progress (id, user_id, module_id, status, progress_percentage, \
             completed_sections, quiz_attempts, started_at, last_accessed_at, time_spent_minutes) \
             VALUES (?, ?, ?, ?, 0, '[]', 0, ?, ?, 0)",
        )
        .bind(id)
        .bind(user_id)
        .bind(module_id)
        .bind(&status)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(ProgressEntity {
            id,
            user_id,
            module_id,
            status,
            progress_percentage: 0.0,
            current_section_id: None,
            completed_sections: Json(Vec::new()),
            quiz_score: None,
            quiz_attempts: 0,
            started_at: now,
            completed_at: None,
            last_accessed_at: now,
            time_spent_minutes: 0,
        })
    }

    pub async fn find_by_user_module(
        mm: &ModelManager,
        user_id: Uuid,
        module_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM progress WHERE user_id = ? AND module_id = ?")
            .bind(user_id)
            .bind(module_id)
            .fetch_one(mm.executor())
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }
        Ok(Some(result?))
    }

    /// Composite-key lookup on an open transaction, so the read and the
    /// subsequent write see the same row version.
    pub async fn find_by_user_module_tx(
        conn: &mut SqliteConnection,
        user_id: Uuid,
        module_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM progress WHERE user_id = ? AND module_id = ?")
            .bind(user_id)
            .bind(module_id)
            .fetch_one(&mut *conn)
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }
        Ok(Some(result?))
    }

    pub async fn list_for_user(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM progress WHERE user_id = ? ORDER BY started_at")
            .bind(user_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    /// Resume: refreshes `last_accessed_at` and nothing else.
    pub async fn touch(
        mut self,
        conn: &mut SqliteConnection,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE progress SET last_accessed_at = ? WHERE id = ?")
            .bind(now)
            .bind(self.id)
            .execute(&mut *conn)
            .await?;

        self.last_accessed_at = now;
        Ok(self)
    }

    /// Persists a section-study update computed by the tracker.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_study_update(
        mut self,
        conn: &mut SqliteConnection,
        current_section_id: i64,
        delta_minutes: i64,
        sections: Vec<i64>,
        percentage: f64,
        status: ProgressStatus,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Self> {
        let status = status.to_string();
        sqlx::query(
            "UPDATE progress SET current_section_id = ?, time_spent_minutes = time_spent_minutes + ?, \
             completed_sections = ?, progress_percentage = ?, status = ?, last_accessed_at = ? \
             WHERE id = ?",
        )
        .bind(current_section_id)
        .bind(delta_minutes)
        .bind(Json(&sections))
        .bind(percentage)
        .bind(&status)
        .bind(now)
        .bind(self.id)
        .execute(&mut *conn)
        .await?;

        self.current_section_id = Some(current_section_id);
        self.time_spent_minutes += delta_minutes;
        self.completed_sections = Json(sections);
        self.progress_percentage = percentage;
        self.status = status;
        self.last_accessed_at = now;
        Ok(self)
    }

    /// Records one graded attempt: attempts always grow, the latest score
    /// overwrites the previous one.
    pub async fn bump_quiz(
        mut self,
        conn: &mut SqliteConnection,
        score: i64,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Self> {
        sqlx::query(
            "UPDATE progress SET quiz_attempts = quiz_attempts + 1, quiz_score = ?, \
             last_accessed_at = ? WHERE id = ?",
        )
        .bind(score)
        .bind(now)
        .bind(self.id)
        .execute(&mut *conn)
        .await?;

        self.quiz_attempts += 1;
        self.quiz_score = Some(score);
        self.last_accessed_at = now;
        Ok(self)
    }

    /// Conditional completion write. The prior-status check lives in the
    /// statement itself, so it is atomic with the status write: returns true
    /// only for the first transition to completed.
    pub async fn mark_completed(
        conn: &mut SqliteConnection,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE progress SET status = ?, completed_at = ?, progress_percentage = 100 \
             WHERE id = ? AND status <> ?",
        )
        .bind(ProgressStatus::Completed.to_string())
        .bind(now)
        .bind(id)
        .bind(ProgressStatus::Completed.to_string())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// Read-side aggregates consumed by analytics.
impl ProgressEntity {
    pub async fn count_completed(mm: &ModelManager) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM progress WHERE status = ?")
            .bind(ProgressStatus::Completed.to_string())
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn avg_quiz_score(mm: &ModelManager) -> DatabaseResult<Option<f64>> {
        let result: Option<f64> =
            sqlx::query_scalar("SELECT AVG(quiz_score) FROM progress WHERE quiz_score IS NOT NULL")
                .fetch_one(mm.executor())
                .await?;
        Ok(result)
    }

    pub async fn count_distinct_active_since(
        mm: &ModelManager,
        since: DateTime<Utc>,
    ) -> DatabaseResult<i64> {
        let result: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM progress WHERE started_at >= ?")
                .bind(since)
                .fetch_one(mm.executor())
                .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::ProgressStatus::*;

    #[test]
    fn transition_table_is_monotonic() {
        assert!(NotStarted.can_advance(InProgress));
        assert!(NotStarted.can_advance(Completed));
        assert!(InProgress.can_advance(Completed));

        assert!(!InProgress.can_advance(NotStarted));
        assert!(!Completed.can_advance(InProgress));
        assert!(!Completed.can_advance(NotStarted));
    }

    #[test]
    fn staying_put_is_allowed() {
        for s in [NotStarted, InProgress, Completed] {
            assert!(s.can_advance(s));
        }
    }

    #[test]
    fn status_round_trips_through_storage_tag() {
        for s in [NotStarted, InProgress, Completed] {
            assert_eq!(super::ProgressStatus::from(s.to_string().as_str()), s);
        }
    }
}
