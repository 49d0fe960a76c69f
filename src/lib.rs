//! Greenpath core: learning-progress tracking, quiz grading, rewards and
//! read-side analytics. Storage is SQLite behind sqlx; callers bring their
//! own transport and authentication and hand the core a resolved [`Actor`].
//!
//! [`Actor`]: crate::auth::Actor

use crate::error::{AppResult, log_error};
use crate::model::{DbConnection, ModelManager};
use crate::service::{AnalyticsAggregator, AssessmentGrader, ProgressTracker};

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod auth;
pub mod error;
pub mod model;
pub mod service;

static APPLICATION_NAME: &str = "greenpath";

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Handle bundling the core services over one shared connection pool.
#[derive(Debug, Clone)]
pub struct LearningCore {
    mm: ModelManager,
    tracker: ProgressTracker,
    grader: AssessmentGrader,
    analytics: AnalyticsAggregator,
}

impl LearningCore {
    pub fn new(mm: ModelManager) -> Self {
        Self {
            tracker: ProgressTracker::new(mm.clone()),
            grader: AssessmentGrader::new(mm.clone()),
            analytics: AnalyticsAggregator::new(mm.clone()),
            mm,
        }
    }

    pub fn mm(&self) -> &ModelManager {
        &self.mm
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn grader(&self) -> &AssessmentGrader {
        &self.grader
    }

    pub fn analytics(&self) -> &AnalyticsAggregator {
        &self.analytics
    }
}

/// Connects to the configured database, applies migrations and builds the
/// service handle.
pub async fn build_core(config: Config) -> AppResult<LearningCore> {
    let db = DbConnection::connect(config.database().uri())?;

    tracing::debug!("applying migrations...");
    if let Err(e) = MIGRATOR.run(db.pool()).await {
        let e = crate::model::DatabaseError::from(e);
        log_error(&e);
        return Err(e.into());
    }

    let mm = ModelManager::new(db);
    Ok(LearningCore::new(mm))
}

/// Builds the service handle over an existing pool (tests, embedders).
pub async fn build_core_with_pool(db: DbConnection) -> AppResult<LearningCore> {
    let mm = ModelManager::new(db);
    Ok(LearningCore::new(mm))
}

pub fn setup_trace() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    tracing::debug!("tracing initialized.");
}
