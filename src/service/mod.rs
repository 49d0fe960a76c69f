mod error;
pub use error::{ServiceError, ServiceResult};

mod tracker;
pub use tracker::{ProgressTracker, ProgressUpdate};

mod grader;
pub use grader::{AssessmentGrader, PASS_THRESHOLD, QuestionFeedback, QuizResult};

mod rewards;
pub use rewards::RewardsLedger;

mod analytics;
pub use analytics::{
    ACTIVE_LEARNER_WINDOW_DAYS, AnalyticsAggregator, DEFAULT_LEADERBOARD_LIMIT, DepartmentStats,
    OverallStats, UserProgressSummary,
};

/// Percentages keep full precision internally and are rounded to two
/// decimals only at the output boundary.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
