use serde::{Deserialize, Serialize};

use crate::model::{ModelManager, error::DatabaseResult};

#[derive(Debug, Clone, Copy)]
pub enum ResourceType {
    User,
    Module,
    Progress,
    Assessment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            items,
            total,
            limit,
            offset,
        }
    }
}

pub trait ResourceTyped {
    fn get_resource_type() -> ResourceType;
}

#[async_trait::async_trait]
pub trait EntityRepository<T, Create, V>
where
    T: ResourceTyped,
    V: Clone + Copy,
{
    async fn create(mm: &ModelManager, data: Create) -> DatabaseResult<T>;

    async fn find_by_id(mm: &ModelManager, id: V) -> DatabaseResult<Option<T>>;

    async fn list(mm: &ModelManager, limit: i64, offset: i64) -> DatabaseResult<Vec<T>>;

    async fn count(mm: &ModelManager) -> DatabaseResult<i64>;
}

#[async_trait::async_trait]
pub trait PaginatableRepository<T, Create, V>
where
    T: ResourceTyped + EntityRepository<T, Create, V>,
    V: Clone + Copy,
{
    async fn page(mm: &ModelManager, limit: i64, offset: i64) -> DatabaseResult<Page<T>>;
}

#[macro_export]
macro_rules! impl_paginatable_for {
    ($ent:ident, $ent_create:ident, $ent_id:ident) => {
        #[async_trait::async_trait]
        impl $crate::model::PaginatableRepository<$ent, $ent_create, $ent_id> for $ent {
            async fn page(
                mm: &ModelManager,
                limit: i64,
                offset: i64,
            ) -> DatabaseResult<$crate::model::Page<$ent>> {
                let items = $ent::list(mm, limit, offset).await?;
                let count = $ent::count(mm).await?;
                Ok($crate::model::Page::new(items, count, limit, offset))
            }
        }
    };
}
