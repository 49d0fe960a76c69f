use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::auth::Actor;
use crate::model::entity::{ModuleEntity, ProgressEntity, UserEntity};
use crate::model::{EntityRepository, ModelManager, ResourceType};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::round2;

/// A user counts as an active learner with any progress started inside this
/// trailing window.
pub const ACTIVE_LEARNER_WINDOW_DAYS: i64 = 7;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Read-only statistics over progress, assessment and user state. Never
/// mutates anything; aggregation happens in SQL rather than by walking full
/// tables in memory.
#[derive(Debug, Clone)]
pub struct AnalyticsAggregator {
    mm: ModelManager,
}

#[derive(Debug, Serialize)]
pub struct OverallStats {
    pub total_users: i64,
    pub total_modules: i64,
    pub total_completions: i64,
    pub avg_score: f64,
    pub active_learners: i64,
}

#[derive(Debug, Serialize)]
pub struct DepartmentStats {
    pub department: String,
    pub total_users: i64,
    pub avg_progress: f64,
    pub avg_score: f64,
    pub completion_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct UserProgressSummary {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub department: Option<String>,
    pub modules_completed: i64,
    pub avg_score: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct DepartmentRow {
    department: String,
    total_users: i64,
    completed: i64,
    progress_rows: i64,
    avg_score: Option<f64>,
}

#[derive(Debug, FromRow)]
struct PerformerRow {
    user_id: Uuid,
    full_name: String,
    email: String,
    department: Option<String>,
    modules_completed: i64,
    avg_score: Option<f64>,
    last_activity: Option<DateTime<Utc>>,
}

impl PerformerRow {
    fn into_summary(self) -> UserProgressSummary {
        UserProgressSummary {
            user_id: self.user_id,
            full_name: self.full_name,
            email: self.email,
            department: self.department,
            modules_completed: self.modules_completed,
            avg_score: round2(self.avg_score.unwrap_or(0.0)),
            last_activity: self.last_activity,
        }
    }
}

impl AnalyticsAggregator {
    pub fn new(mm: ModelManager) -> Self {
        Self { mm }
    }

    /// Platform-wide dashboard numbers. Elevated roles only.
    #[tracing::instrument(skip(self, actor))]
    pub async fn overview(&self, actor: &Actor) -> ServiceResult<OverallStats> {
        self.overview_at(actor, Utc::now()).await
    }

    /// Same as [`overview`](Self::overview) with an explicit evaluation
    /// instant for the trailing active-learner window.
    pub async fn overview_at(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ServiceResult<OverallStats> {
        require_elevated(actor)?;

        let total_users = UserEntity::count(&self.mm).await?;
        let total_modules = ModuleEntity::count(&self.mm).await?;
        let total_completions = ProgressEntity::count_completed(&self.mm).await?;
        let avg_score = ProgressEntity::avg_quiz_score(&self.mm).await?.unwrap_or(0.0);
        let since = now - Duration::days(ACTIVE_LEARNER_WINDOW_DAYS);
        let active_learners = ProgressEntity::count_distinct_active_since(&self.mm, since).await?;

        Ok(OverallStats {
            total_users,
            total_modules,
            total_completions,
            avg_score: round2(avg_score),
            active_learners,
        })
    }

    /// Per-department statistics, grouped over users with a department set.
    /// Elevated roles only.
    #[tracing::instrument(skip(self, actor))]
    pub async fn department_stats(&self, actor: &Actor) -> ServiceResult<Vec<DepartmentStats>> {
        require_elevated(actor)?;

        let rows: Vec<DepartmentRow> = sqlx::query_as(
            "SELECT u.department AS department, \
                    COUNT(DISTINCT u.id) AS total_users, \
                    SUM(CASE WHEN p.status = 'completed' THEN 1 ELSE 0 END) AS completed, \
                    COUNT(p.id) AS progress_rows, \
                    AVG(p.quiz_score) AS avg_score \
             FROM users u \
             LEFT JOIN progress p ON p.user_id = u.id \
             WHERE u.department IS NOT NULL \
             GROUP BY u.department \
             ORDER BY u.department",
        )
        .fetch_all(self.mm.executor())
        .await
        .map_err(crate::model::DatabaseError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| DepartmentStats {
                avg_progress: round2(ratio(row.completed, row.total_users) * 100.0),
                avg_score: round2(row.avg_score.unwrap_or(0.0)),
                completion_rate: round2(ratio(row.completed, row.progress_rows) * 100.0),
                department: row.department,
                total_users: row.total_users,
            })
            .collect())
    }

    /// Leaderboard of users with at least one completed module, ranked by
    /// completions then average score; ties keep user-creation order.
    /// Elevated roles only.
    #[tracing::instrument(skip(self, actor))]
    pub async fn top_performers(
        &self,
        actor: &Actor,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<UserProgressSummary>> {
        require_elevated(actor)?;

        let rows: Vec<PerformerRow> = sqlx::query_as(
            "SELECT u.id AS user_id, u.full_name, u.email, u.department, \
                    SUM(CASE WHEN p.status = 'completed' THEN 1 ELSE 0 END) AS modules_completed, \
                    AVG(CASE WHEN p.status = 'completed' THEN p.quiz_score END) AS avg_score, \
                    MAX(COALESCE(p.completed_at, p.started_at)) AS last_activity \
             FROM users u \
             JOIN progress p ON p.user_id = u.id \
             GROUP BY u.id \
             HAVING modules_completed > 0 \
             ORDER BY u.created_at, u.rowid",
        )
        .fetch_all(self.mm.executor())
        .await
        .map_err(crate::model::DatabaseError::from)?;

        let mut performers: Vec<UserProgressSummary> =
            rows.into_iter().map(PerformerRow::into_summary).collect();

        // stable sort: equal entries keep their input (creation) order
        performers.sort_by(|a, b| {
            b.modules_completed
                .cmp(&a.modules_completed)
                .then_with(|| b.avg_score.total_cmp(&a.avg_score))
        });
        performers.truncate(limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT));

        Ok(performers)
    }

    /// Progress summary for one user. Visible to the user themselves and to
    /// elevated roles.
    #[tracing::instrument(skip(self, actor))]
    pub async fn user_summary(
        &self,
        actor: &Actor,
        user_id: Uuid,
    ) -> ServiceResult<UserProgressSummary> {
        if !actor.can_view_user(user_id) {
            return Err(ServiceError::Forbidden);
        }

        let row: Option<PerformerRow> = sqlx::query_as(
            "SELECT u.id AS user_id, u.full_name, u.email, u.department, \
                    SUM(CASE WHEN p.status = 'completed' THEN 1 ELSE 0 END) AS modules_completed, \
                    AVG(CASE WHEN p.status = 'completed' THEN p.quiz_score END) AS avg_score, \
                    MAX(COALESCE(p.completed_at, p.started_at)) AS last_activity \
             FROM users u \
             LEFT JOIN progress p ON p.user_id = u.id \
             WHERE u.id = ? \
             GROUP BY u.id",
        )
        .bind(user_id)
        .fetch_optional(self.mm.executor())
        .await
        .map_err(crate::model::DatabaseError::from)?;

        row.map(PerformerRow::into_summary)
            .ok_or_else(|| ServiceError::not_found(ResourceType::User))
    }
}

fn require_elevated(actor: &Actor) -> ServiceResult<()> {
    if actor.role().is_elevated() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

/// Zero-denominator aggregates resolve to 0, never to NaN or an error.
fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

#[cfg(test)]
mod test {
    use super::ratio;

    #[test]
    fn ratio_guards_zero_denominator() {
        assert_eq!(ratio(2, 0), 0.0);
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(2, 3), 2.0 / 3.0);
    }
}
