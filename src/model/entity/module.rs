use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::impl_paginatable_for;
use crate::model::repo::ResourceTyped;
use crate::model::{EntityRepository, ModelManager, error::DatabaseResult};

/// One reading unit inside a module. Sections are ordered by `order_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSection {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub order_index: i64,
    pub estimated_time_minutes: i64,
}

/// Multiple-choice question; `correct_answer_index` points into `options`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: i64,
    pub explanation: String,
    pub points: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleDifficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl From<&str> for ModuleDifficulty {
    fn from(value: &str) -> Self {
        match value {
            "advanced" => Self::Advanced,
            "intermediate" => Self::Intermediate,
            _ => Self::Beginner,
        }
    }
}

impl std::fmt::Display for ModuleDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ModuleEntity {
    id: Uuid,
    title: String,
    description: String,
    difficulty: String,
    category: String,
    points_reward: i64,
    sections: Json<Vec<ContentSection>>,
    questions: Json<Vec<QuizQuestion>>,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for ModuleEntity {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Module
    }
}

impl ModuleEntity {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn difficulty(&self) -> ModuleDifficulty {
        ModuleDifficulty::from(self.difficulty.as_str())
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn points_reward(&self) -> i64 {
        self.points_reward
    }

    pub fn sections(&self) -> &[ContentSection] {
        &self.sections
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn total_sections(&self) -> usize {
        self.sections.len()
    }
}

#[derive(Debug)]
pub struct ModuleCreate {
    pub title: String,
    pub description: String,
    pub difficulty: ModuleDifficulty,
    pub category: String,
    pub points_reward: i64,
    pub sections: Vec<ContentSection>,
    pub questions: Vec<QuizQuestion>,
}

#[async_trait]
impl EntityRepository<ModuleEntity, ModuleCreate, Uuid> for ModuleEntity {
    async fn create(mm: &ModelManager, data: ModuleCreate) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let difficulty = data.difficulty.to_string();
        sqlx::query(
            "INSERT INTO modules (id, title, description, difficulty, category, points_reward, sections, questions, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&difficulty)
        .bind(&data.category)
        .bind(data.points_reward)
        .bind(Json(&data.sections))
        .bind(Json(&data.questions))
        .bind(now)
        .execute(mm.executor())
        .await?;

        Ok(ModuleEntity {
            id,
            title: data.title,
            description: data.description,
            difficulty,
            category: data.category,
            points_reward: data.points_reward,
            sections: Json(data.sections),
            questions: Json(data.questions),
            created_at: now,
        })
    }

    async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM modules WHERE id = ?")
            .bind(id)
            .fetch_one(mm.executor())
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }

        Ok(Some(result?))
    }

    async fn list(mm: &ModelManager, limit: i64, offset: i64) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM modules ORDER BY created_at LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modules")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(ModuleEntity, ModuleCreate, Uuid);

impl ModuleEntity {
    /// Catalog listing with optional category/difficulty filters.
    pub async fn filter(
        mm: &ModelManager,
        category: Option<&str>,
        difficulty: Option<ModuleDifficulty>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let difficulty = difficulty.map(|d| d.to_string());
        let result = sqlx::query_as(
            "SELECT * FROM modules \
             WHERE (?1 IS NULL OR category = ?1) AND (?2 IS NULL OR difficulty = ?2) \
             ORDER BY created_at LIMIT ?3 OFFSET ?4",
        )
        .bind(category)
        .bind(difficulty)
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}
