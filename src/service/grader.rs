use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::model::entity::{
    AssessmentCreate, AssessmentEntity, ModuleEntity, ProgressEntity, QuizQuestion,
};
use crate::model::{EntityRepository, ModelManager, ResourceType};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::{RewardsLedger, round2};

/// Score percentage required to pass a quiz and complete the module.
pub const PASS_THRESHOLD: f64 = 70.0;

/// Grades quiz submissions and drives the completion transition of the
/// progress record. The rewards ledger is invoked here, on the first
/// completion only.
#[derive(Debug, Clone)]
pub struct AssessmentGrader {
    mm: ModelManager,
}

#[derive(Debug, Serialize)]
pub struct QuizResult {
    pub score: i64,
    pub total_questions: i64,
    pub percentage: f64,
    pub passed: bool,
    pub points_earned: i64,
    pub feedback: Vec<QuestionFeedback>,
}

/// Per-question feedback, in submission order. `ordinal` is 1-based.
#[derive(Debug, Serialize)]
pub struct QuestionFeedback {
    pub question_id: i64,
    pub ordinal: i64,
    pub correct: bool,
    pub chosen_answer: i64,
    pub correct_answer: i64,
    pub explanation: String,
    pub points_earned: i64,
}

struct GradedQuiz {
    earned: i64,
    total: i64,
    percentage: f64,
    passed: bool,
    feedback: Vec<QuestionFeedback>,
}

impl AssessmentGrader {
    pub fn new(mm: ModelManager) -> Self {
        Self { mm }
    }

    /// Grades one submission inside a single transaction: the assessment
    /// row, the attempt counter, the score overwrite and the conditional
    /// completion-plus-award all commit together or not at all.
    #[tracing::instrument(skip(self, answers))]
    pub async fn submit_quiz(
        &self,
        user_id: Uuid,
        module_id: Uuid,
        answers: Vec<i64>,
    ) -> ServiceResult<QuizResult> {
        let module = ModuleEntity::find_by_id(&self.mm, module_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceType::Module))?;

        let now = Utc::now();
        let mut tx = self.mm.begin().await?;

        let progress = ProgressEntity::find_by_user_module_tx(&mut tx, user_id, module_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceType::Progress))?;

        // validation happens before any write
        let graded = grade(module.questions(), &answers)?;

        AssessmentEntity::create(
            &mut tx,
            AssessmentCreate {
                user_id,
                module_id,
                answers,
                score: graded.earned,
                passed: graded.passed,
            },
            now,
        )
        .await?;

        // every submission counts an attempt; the latest score wins
        let progress = progress.bump_quiz(&mut tx, graded.earned, now).await?;

        let mut points_earned = 0;
        if graded.passed {
            // first completion only: the status write carries the prior-status
            // check, so a concurrent or repeated pass can never award twice
            let first_completion =
                ProgressEntity::mark_completed(&mut tx, progress.id(), now).await?;
            if first_completion {
                RewardsLedger::award(&mut tx, user_id, module.points_reward()).await?;
                tracing::info!(
                    user = %user_id,
                    module = %module_id,
                    points = module.points_reward(),
                    "module completed"
                );
            }
            points_earned = module.points_reward();
        }

        tx.commit().await?;

        Ok(QuizResult {
            score: graded.earned,
            total_questions: module.questions().len() as i64,
            percentage: round2(graded.percentage),
            passed: graded.passed,
            points_earned,
            feedback: graded.feedback,
        })
    }
}

/// Pure grading step. Correctness is index equality with the question's
/// answer key; earned and total points accumulate per question.
fn grade(questions: &[QuizQuestion], answers: &[i64]) -> Result<GradedQuiz, ServiceError> {
    if answers.len() != questions.len() {
        return Err(ServiceError::invalid_submission(
            questions.len(),
            answers.len(),
        ));
    }

    let mut earned = 0;
    let mut total = 0;
    let mut feedback = Vec::with_capacity(questions.len());

    for (i, (question, &answer)) in questions.iter().zip(answers).enumerate() {
        total += question.points;
        let correct = answer == question.correct_answer_index;
        if correct {
            earned += question.points;
        }

        feedback.push(QuestionFeedback {
            question_id: question.id,
            ordinal: (i + 1) as i64,
            correct,
            chosen_answer: answer,
            correct_answer: question.correct_answer_index,
            explanation: question.explanation.clone(),
            points_earned: if correct { question.points } else { 0 },
        });
    }

    let percentage = if total > 0 {
        earned as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    Ok(GradedQuiz {
        earned,
        total,
        percentage,
        passed: percentage >= PASS_THRESHOLD,
        feedback,
    })
}
