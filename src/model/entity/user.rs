use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::auth::UserRole;
use crate::impl_paginatable_for;
use crate::model::repo::ResourceTyped;
use crate::model::{EntityRepository, ModelManager, error::DatabaseResult};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct UserEntity {
    id: Uuid,
    email: String,
    full_name: String,
    role: String,
    department: Option<String>,
    total_points: i64,
    modules_completed: i64,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for UserEntity {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::User
    }
}

impl UserEntity {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn role(&self) -> UserRole {
        UserRole::from(self.role.as_str())
    }

    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    pub fn total_points(&self) -> i64 {
        self.total_points
    }

    pub fn modules_completed(&self) -> i64 {
        self.modules_completed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug)]
pub struct UserCreate {
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub department: Option<String>,
}

impl UserCreate {
    pub fn new(email: &str, full_name: &str, role: UserRole, department: Option<&str>) -> Self {
        Self {
            email: email.to_string(),
            full_name: full_name.to_string(),
            role,
            department: department.map(str::to_string),
        }
    }
}

#[async_trait]
impl EntityRepository<UserEntity, UserCreate, Uuid> for UserEntity {
    async fn create(mm: &ModelManager, data: UserCreate) -> DatabaseResult<Self> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let role = data.role.to_string();
        sqlx::query(
            "INSERT INTO users (id, email, full_name, role, department, total_points, modules_completed, created_at) \
             VALUES (?, ?, ?, ?, ?, 0, 0, ?)",
        )
        .bind(id)
        .bind(&data.email)
        .bind(&data.full_name)
        .bind(&role)
        .bind(&data.department)
        .bind(now)
        .execute(mm.executor())
        .await?;

        Ok(UserEntity {
            id,
            email: data.email,
            full_name: data.full_name,
            role,
            department: data.department,
            total_points: 0,
            modules_completed: 0,
            created_at: now,
        })
    }

    async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(mm.executor())
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }

        Ok(Some(result?))
    }

    async fn list(mm: &ModelManager, limit: i64, offset: i64) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM users ORDER BY created_at LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(UserEntity, UserCreate, Uuid);

impl UserEntity {
    pub async fn find_by_email(mm: &ModelManager, email: &str) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(mm.executor())
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }
        Ok(Some(result?))
    }
}
