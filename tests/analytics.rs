mod common;

use chrono::{Duration, Utc};
use greenpath::auth::{Actor, UserRole};
use greenpath::model::ResourceType;
use greenpath::service::ServiceError;
use uuid::Uuid;

use crate::common::{seed_module, seed_user, setup_core, TestCore};

fn manager() -> Actor {
    Actor::new(Uuid::new_v4(), UserRole::Manager)
}

/// Three "Eng" users over three single-question modules: two pass their
/// quiz, one only starts.
async fn seed_eng_department(t: &TestCore) -> Vec<Uuid> {
    let mut user_ids = Vec::new();
    let mut modules = Vec::new();
    for i in 0..3 {
        let user = seed_user(
            &t.core,
            &format!("eng{i}@example.com"),
            UserRole::Employee,
            Some("Eng"),
        )
        .await;
        user_ids.push(user.id());
        modules.push(seed_module(&t.core, 1, &[(0, 10)], 30).await);
    }

    for (user_id, module) in user_ids.iter().zip(&modules) {
        t.core
            .tracker()
            .start_module(*user_id, module.id())
            .await
            .unwrap();
    }
    for (user_id, module) in user_ids.iter().zip(&modules).take(2) {
        let result = t
            .core
            .grader()
            .submit_quiz(*user_id, module.id(), vec![0])
            .await
            .unwrap();
        assert!(result.passed);
    }
    user_ids
}

#[tokio::test]
async fn overview_aggregates_platform_state() {
    let t = setup_core().await;
    let users = seed_eng_department(&t).await;

    let stats = t.core.analytics().overview(&manager()).await.unwrap();
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.total_modules, 3);
    assert_eq!(stats.total_completions, 2);
    assert_eq!(stats.avg_score, 10.0);
    assert_eq!(stats.active_learners, 3);

    // push one user's activity out of the trailing window
    sqlx::query("UPDATE progress SET started_at = ? WHERE user_id = ?")
        .bind(Utc::now() - Duration::days(10))
        .bind(users[2])
        .execute(t.core.mm().executor())
        .await
        .unwrap();

    let stats = t.core.analytics().overview(&manager()).await.unwrap();
    assert_eq!(stats.active_learners, 2);
}

#[tokio::test]
async fn overview_on_empty_database_is_all_zeroes() {
    let t = setup_core().await;
    let stats = t.core.analytics().overview(&manager()).await.unwrap();
    assert_eq!(stats.total_users, 0);
    assert_eq!(stats.total_completions, 0);
    // no scores at all still yields 0, not NaN or an error
    assert_eq!(stats.avg_score, 0.0);
    assert_eq!(stats.active_learners, 0);
}

#[tokio::test]
async fn overview_requires_elevated_role() {
    let t = setup_core().await;
    let employee = Actor::new(Uuid::new_v4(), UserRole::Employee);
    assert!(matches!(
        t.core.analytics().overview(&employee).await,
        Err(ServiceError::Forbidden)
    ));
}

#[tokio::test]
async fn department_stats_follow_completion_counts() {
    let t = setup_core().await;
    seed_eng_department(&t).await;
    // a user without a department never shows up in the grouping
    seed_user(&t.core, "solo@example.com", UserRole::Employee, None).await;

    let stats = t.core.analytics().department_stats(&manager()).await.unwrap();
    assert_eq!(stats.len(), 1);

    let eng = &stats[0];
    assert_eq!(eng.department, "Eng");
    assert_eq!(eng.total_users, 3);
    // 2 of 3 progress rows completed
    assert_eq!(eng.completion_rate, 66.67);
    // 2 completions across 3 users
    assert_eq!(eng.avg_progress, 66.67);
    assert_eq!(eng.avg_score, 10.0);
}

#[tokio::test]
async fn department_without_progress_rates_zero() {
    let t = setup_core().await;
    seed_user(&t.core, "ops@example.com", UserRole::Employee, Some("Ops")).await;

    let stats = t.core.analytics().department_stats(&manager()).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].completion_rate, 0.0);
    assert_eq!(stats[0].avg_progress, 0.0);
    assert_eq!(stats[0].avg_score, 0.0);
}

/// Completes `count` five-question modules for one user; `correct` answers
/// per quiz controls the stored score (10 points per question, 70% to pass).
async fn complete_modules(t: &TestCore, user_id: Uuid, count: usize, correct: usize) {
    for _ in 0..count {
        let module = seed_module(&t.core, 1, &[(0, 10); 5], 30).await;
        t.core
            .tracker()
            .start_module(user_id, module.id())
            .await
            .unwrap();
        let answers: Vec<i64> = (0..5).map(|q| if q < correct { 0 } else { 1 }).collect();
        let result = t
            .core
            .grader()
            .submit_quiz(user_id, module.id(), answers)
            .await
            .unwrap();
        assert!(result.passed);
    }
}

#[tokio::test]
async fn leaderboard_ranks_by_completions_then_score() {
    let t = setup_core().await;
    let a = seed_user(&t.core, "a@example.com", UserRole::Employee, None).await;
    let b = seed_user(&t.core, "b@example.com", UserRole::Employee, None).await;
    let c = seed_user(&t.core, "c@example.com", UserRole::Employee, None).await;
    // never completes anything, must not appear
    let idle = seed_user(&t.core, "idle@example.com", UserRole::Employee, None).await;

    complete_modules(&t, a.id(), 3, 4).await; // avg score 40
    complete_modules(&t, b.id(), 3, 5).await; // avg score 50
    complete_modules(&t, c.id(), 3, 4).await; // ties with a

    let top = t
        .core
        .analytics()
        .top_performers(&manager(), None)
        .await
        .unwrap();
    assert_eq!(top.len(), 3);
    assert_eq!(top[0].user_id, b.id());
    assert_eq!(top[0].avg_score, 50.0);
    assert_eq!(top[0].modules_completed, 3);
    // a and c tie; a was created first and stays first
    assert_eq!(top[1].user_id, a.id());
    assert_eq!(top[2].user_id, c.id());
    assert!(top.iter().all(|p| p.user_id != idle.id()));
    assert!(top.iter().all(|p| p.last_activity.is_some()));

    let limited = t
        .core
        .analytics()
        .top_performers(&manager(), Some(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn user_summary_scoping_and_lookup() {
    let t = setup_core().await;
    let user = seed_user(&t.core, "me@example.com", UserRole::Employee, Some("Eng")).await;
    let other = seed_user(&t.core, "other@example.com", UserRole::Employee, None).await;
    complete_modules(&t, user.id(), 2, 5).await;

    // self access
    let me = Actor::new(user.id(), UserRole::Employee);
    let summary = t
        .core
        .analytics()
        .user_summary(&me, user.id())
        .await
        .unwrap();
    assert_eq!(summary.modules_completed, 2);
    assert_eq!(summary.avg_score, 50.0);
    assert_eq!(summary.department.as_deref(), Some("Eng"));
    assert!(summary.last_activity.is_some());

    // another employee is not allowed
    let peer = Actor::new(other.id(), UserRole::Employee);
    assert!(matches!(
        t.core.analytics().user_summary(&peer, user.id()).await,
        Err(ServiceError::Forbidden)
    ));

    // managers are
    let summary = t
        .core
        .analytics()
        .user_summary(&manager(), user.id())
        .await
        .unwrap();
    assert_eq!(summary.email, "me@example.com");

    // a user with no progress still has a summary
    let summary = t
        .core
        .analytics()
        .user_summary(&manager(), other.id())
        .await
        .unwrap();
    assert_eq!(summary.modules_completed, 0);
    assert_eq!(summary.avg_score, 0.0);
    assert!(summary.last_activity.is_none());

    // unknown users do not
    assert!(matches!(
        t.core.analytics().user_summary(&Actor::admin(), Uuid::new_v4()).await,
        Err(ServiceError::NotFound {
            resource_type: ResourceType::User
        })
    ));
}
