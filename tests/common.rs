#![allow(dead_code)] // not every test binary uses every helper

use greenpath::auth::UserRole;
use greenpath::model::entity::{
    ContentSection, ModuleCreate, ModuleDifficulty, ModuleEntity, QuizQuestion, UserCreate,
    UserEntity,
};
use greenpath::model::{DbConnection, EntityRepository};
use greenpath::{LearningCore, build_core_with_pool};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;

/// Temporary SQLite database plus the core built over it. The database file
/// lives in a tempdir and disappears when the value drops.
pub struct TestCore {
    _dir: TempDir,
    pub core: LearningCore,
}

pub async fn setup_core() -> TestCore {
    let dir = tempfile::tempdir().unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("greenpath-test.db"))
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();

    let core = build_core_with_pool(DbConnection::from_pool(pool))
        .await
        .unwrap();
    TestCore { _dir: dir, core }
}

pub async fn seed_user(
    core: &LearningCore,
    email: &str,
    role: UserRole,
    department: Option<&str>,
) -> UserEntity {
    UserEntity::create(core.mm(), UserCreate::new(email, email, role, department))
        .await
        .unwrap()
}

pub fn section(id: i64) -> ContentSection {
    ContentSection {
        id,
        title: format!("Section {id}"),
        content: format!("Contents of section {id}"),
        order_index: id,
        estimated_time_minutes: 5,
    }
}

pub fn question(id: i64, correct: i64, points: i64) -> QuizQuestion {
    QuizQuestion {
        id,
        question: format!("Question {id}?"),
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct_answer_index: correct,
        explanation: format!("Explanation for question {id}"),
        points,
    }
}

/// Module with `sections` numbered 1..=n and one question per
/// (correct_index, points) pair.
pub async fn seed_module(
    core: &LearningCore,
    sections: usize,
    questions: &[(i64, i64)],
    points_reward: i64,
) -> ModuleEntity {
    let data = ModuleCreate {
        title: "Water stewardship".to_string(),
        description: "Reducing water waste across teams".to_string(),
        difficulty: ModuleDifficulty::Beginner,
        category: "environment".to_string(),
        points_reward,
        sections: (1..=sections as i64).map(section).collect(),
        questions: questions
            .iter()
            .enumerate()
            .map(|(i, &(correct, points))| question(i as i64 + 1, correct, points))
            .collect(),
    };
    ModuleEntity::create(core.mm(), data).await.unwrap()
}
