use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};

/// One graded quiz submission. Records accumulate, one row per submission.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AssessmentEntity {
    id: Uuid,
    user_id: Uuid,
    module_id: Uuid,
    answers: Json<Vec<i64>>,
    score: i64,
    passed: bool,
    submitted_at: DateTime<Utc>,
}

impl ResourceTyped for AssessmentEntity {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Assessment
    }
}

impl AssessmentEntity {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn module_id(&self) -> Uuid {
        self.module_id
    }

    pub fn answers(&self) -> &[i64] {
        &self.answers
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

#[derive(Debug)]
pub struct AssessmentCreate {
    pub user_id: Uuid,
    pub module_id: Uuid,
    pub answers: Vec<i64>,
    pub score: i64,
    pub passed: bool,
}

impl AssessmentEntity {
    pub async fn create(
        conn: &mut SqliteConnection,
        data: AssessmentCreate,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO assessments (id, user_id, module_id, answers, score, passed, submitted_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(data.user_id)
        .bind(data.module_id)
        .bind(Json(&data.answers))
        .bind(data.score)
        .bind(data.passed)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(AssessmentEntity {
            id,
            user_id: data.user_id,
            module_id: data.module_id,
            answers: Json(data.answers),
            score: data.score,
            passed: data.passed,
            submitted_at: now,
        })
    }

    pub async fn list_for_user_module(
        mm: &ModelManager,
        user_id: Uuid,
        module_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM assessments WHERE user_id = ? AND module_id = ? ORDER BY submitted_at",
        )
        .bind(user_id)
        .bind(module_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn count_for_user(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assessments WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }
}
