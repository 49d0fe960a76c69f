use chrono::Utc;
use uuid::Uuid;

use crate::model::entity::{ModuleEntity, ProgressEntity, ProgressStatus};
use crate::model::{EntityRepository, ModelManager, ResourceType};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::round2;

/// Owns the lifecycle of the per-user-per-module progress record.
/// Completion is never produced here; only the grader transitions a record
/// to completed.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    mm: ModelManager,
}

/// One section-study update: the section currently open, the minutes spent
/// since the last update, and the sections finished so far.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub current_section_id: i64,
    pub delta_minutes: i64,
    pub completed_sections: Vec<i64>,
}

impl ProgressTracker {
    pub fn new(mm: ModelManager) -> Self {
        Self { mm }
    }

    /// Starts a module or resumes it. Idempotent: an existing record only
    /// gets its `last_accessed_at` refreshed and is returned unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn start_module(
        &self,
        user_id: Uuid,
        module_id: Uuid,
    ) -> ServiceResult<ProgressEntity> {
        let module = ModuleEntity::find_by_id(&self.mm, module_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceType::Module))?;

        let now = Utc::now();
        let mut tx = self.mm.begin().await?;

        if let Some(existing) =
            ProgressEntity::find_by_user_module_tx(&mut tx, user_id, module_id).await?
        {
            let touched = existing.touch(&mut tx, now).await?;
            tx.commit().await?;
            tracing::debug!(user = %user_id, module = %module.id(), "module resumed");
            return Ok(touched);
        }

        let created = ProgressEntity::create(&mut tx, user_id, module_id, now).await?;
        tx.commit().await?;
        tracing::debug!(user = %user_id, module = %module.id(), "module started");
        Ok(created)
    }

    /// Applies a study update to an existing progress record.
    ///
    /// Completed sections are unioned into the stored set, so the derived
    /// percentage never decreases. Status moves to in-progress unless the
    /// record is already completed; completed percentage stays pinned at 100.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_progress(
        &self,
        user_id: Uuid,
        module_id: Uuid,
        update: ProgressUpdate,
    ) -> ServiceResult<ProgressEntity> {
        if update.delta_minutes < 0 {
            return Err(ServiceError::NegativeTimeDelta {
                delta: update.delta_minutes,
            });
        }

        let module = ModuleEntity::find_by_id(&self.mm, module_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceType::Module))?;

        let now = Utc::now();
        let mut tx = self.mm.begin().await?;

        let progress = ProgressEntity::find_by_user_module_tx(&mut tx, user_id, module_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceType::Progress))?;

        let mut sections = progress.completed_section_set();
        sections.extend(update.completed_sections.iter().copied());
        let sections: Vec<i64> = sections.into_iter().collect();

        let status = progress.status();
        let (percentage, status) = if status.can_advance(ProgressStatus::InProgress) {
            (
                section_percentage(sections.len(), module.total_sections()),
                ProgressStatus::InProgress,
            )
        } else {
            // completed is sticky; the grader owns that state and the
            // percentage stays pinned at 100
            (progress.progress_percentage(), status)
        };

        let updated = progress
            .apply_study_update(
                &mut tx,
                update.current_section_id,
                update.delta_minutes,
                sections,
                percentage,
                status,
                now,
            )
            .await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Current user's progress for one module.
    pub async fn get_progress(
        &self,
        user_id: Uuid,
        module_id: Uuid,
    ) -> ServiceResult<ProgressEntity> {
        ProgressEntity::find_by_user_module(&self.mm, user_id, module_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceType::Progress))
    }

    /// Current user's progress across all modules.
    pub async fn list_user_progress(&self, user_id: Uuid) -> ServiceResult<Vec<ProgressEntity>> {
        Ok(ProgressEntity::list_for_user(&self.mm, user_id).await?)
    }
}

fn section_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(completed as f64 / total as f64 * 100.0)
}
