use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::dto::game_dto::{AnswerReview, ProgressResponse, QuizResultResponse, SubmitAnswerPayload};
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::attempt::QuizAttempt;
use crate::models::badge::Badge;
use crate::models::progress::UserProgress;
use crate::models::question::{Question, TYPE_FILL_BLANK};
use crate::models::quiz::Quiz;
use crate::models::user_answer::UserAnswer;

/// Grading result for a finished attempt, derived purely from the counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptOutcome {
    pub score: i32,
    pub percentage: f64,
    pub passed: bool,
}

/// Percentage of active questions answered correctly; a quiz with no active
/// questions grades to 0/0/failed rather than dividing by zero.
pub fn grade_attempt(correct_answers: i64, total_questions: i64, pass_score: i32) -> AttemptOutcome {
    let percentage = if total_questions > 0 {
        (correct_answers as f64 / total_questions as f64) * 100.0
    } else {
        0.0
    };
    let score = percentage.floor() as i32;
    let passed = percentage >= pass_score as f64;
    AttemptOutcome { score, percentage, passed }
}

/// Level up every 100 points.
pub fn level_for(total_points: i32) -> i32 {
    total_points / 100 + 1
}

/// Folds one finished attempt into the user's running progress.
///
/// A pass on consecutive calendar days extends the streak; a second pass on
/// the same day leaves it untouched; any gap restarts it at 1. A fail always
/// clears the streak. `last_quiz_date` and `level` are refreshed either way.
pub fn apply_finish(progress: &mut UserProgress, passed: bool, points_reward: i32, today: NaiveDate) {
    progress.total_quizzes_taken += 1;
    if passed {
        progress.total_quizzes_passed += 1;
        progress.total_points += points_reward;

        let yesterday = today - Duration::days(1);
        match progress.last_quiz_date {
            Some(last) if last == today => {}
            Some(last) if last == yesterday => progress.current_streak += 1,
            _ => progress.current_streak = 1,
        }
        if progress.current_streak > progress.longest_streak {
            progress.longest_streak = progress.current_streak;
        }
    } else {
        progress.current_streak = 0;
    }
    progress.last_quiz_date = Some(today);
    progress.level = level_for(progress.total_points);
}

#[derive(Debug, FromRow)]
struct ReviewRow {
    question_id: Uuid,
    question_text: String,
    question_type: String,
    explanation: String,
    selected_answer_id: Option<Uuid>,
    selected_answer_text: Option<String>,
    text_answer: String,
    is_correct: bool,
    correct_answer: Option<String>,
    answered_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_review(self) -> AnswerReview {
        let correct_answer = if self.question_type == TYPE_FILL_BLANK {
            Some("Check explanation for correct answer".to_string())
        } else {
            self.correct_answer
        };
        AnswerReview {
            question_id: self.question_id,
            question_text: self.question_text,
            question_type: self.question_type,
            explanation: self.explanation,
            selected_answer_id: self.selected_answer_id,
            selected_answer_text: self.selected_answer_text,
            text_answer: self.text_answer,
            is_correct: self.is_correct,
            correct_answer,
            answered_at: self.answered_at,
        }
    }
}

#[derive(Clone)]
pub struct GameService {
    pool: PgPool,
}

impl GameService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Starts an attempt, or resumes the caller's existing in-progress one.
    pub async fn start_attempt(&self, user_id: Uuid, quiz_id: Uuid) -> Result<QuizAttempt> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"SELECT * FROM quizzes WHERE id = $1 AND is_active = TRUE"#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Quiz not found or inactive".to_string()))?;

        let active = sqlx::query_as::<_, QuizAttempt>(
            r#"SELECT * FROM quiz_attempts
               WHERE user_id = $1 AND quiz_id = $2 AND status = 'in_progress'
               ORDER BY started_at DESC
               LIMIT 1"#,
        )
        .bind(user_id)
        .bind(quiz.id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(attempt) = active {
            return Ok(attempt);
        }

        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"INSERT INTO quiz_attempts (user_id, quiz_id, status)
               VALUES ($1, $2, 'in_progress')
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(quiz.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(attempt)
    }

    /// Records an answer against the caller's active attempt. Resubmitting
    /// the same question overwrites the previous row instead of duplicating.
    pub async fn submit_answer(
        &self,
        user_id: Uuid,
        payload: &SubmitAnswerPayload,
    ) -> Result<UserAnswer> {
        let question = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions WHERE id = $1"#,
        )
        .bind(payload.question_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;

        let selected = if question.is_auto_graded() {
            let answer_id = payload.answer_id.ok_or_else(|| {
                Error::BadRequest("Answer selection required".to_string())
            })?;
            let answer = sqlx::query_as::<_, Answer>(
                r#"SELECT * FROM answers WHERE id = $1 AND question_id = $2"#,
            )
            .bind(answer_id)
            .bind(question.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::BadRequest("Invalid answer for this question".to_string()))?;
            Some(answer)
        } else {
            if payload.text_answer.as_deref().unwrap_or("").is_empty() {
                return Err(Error::BadRequest(
                    "Text answer required for fill-in-the-blank questions".to_string(),
                ));
            }
            None
        };

        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"SELECT * FROM quiz_attempts
               WHERE user_id = $1 AND quiz_id = $2 AND status = 'in_progress'
               ORDER BY started_at DESC
               LIMIT 1"#,
        )
        .bind(user_id)
        .bind(question.quiz_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::BadRequest("No active quiz attempt found".to_string()))?;

        // Fill-blank answers stay unscored; they are reviewed via explanation.
        let is_correct = selected.as_ref().map(|a| a.is_correct).unwrap_or(false);

        let saved = sqlx::query_as::<_, UserAnswer>(
            r#"INSERT INTO user_answers (attempt_id, question_id, selected_answer_id, text_answer, is_correct)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (attempt_id, question_id)
               DO UPDATE SET selected_answer_id = EXCLUDED.selected_answer_id,
                             text_answer = EXCLUDED.text_answer,
                             is_correct = EXCLUDED.is_correct,
                             answered_at = NOW()
               RETURNING *"#,
        )
        .bind(attempt.id)
        .bind(question.id)
        .bind(selected.as_ref().map(|a| a.id))
        .bind(payload.text_answer.clone().unwrap_or_default())
        .bind(is_correct)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    /// Finalizes an attempt: grades it, folds the outcome into progress,
    /// awards any newly crossed score badges and returns the full review.
    ///
    /// Runs in one transaction with the attempt row locked, so a double
    /// finish cannot double-count points.
    pub async fn finish_attempt(&self, user_id: Uuid, attempt_id: Uuid) -> Result<QuizResultResponse> {
        let mut tx = self.pool.begin().await?;

        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"SELECT * FROM quiz_attempts
               WHERE id = $1 AND user_id = $2 AND status = 'in_progress'
               FOR UPDATE"#,
        )
        .bind(attempt_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Quiz attempt not found".to_string()))?;

        let quiz = sqlx::query_as::<_, Quiz>(r#"SELECT * FROM quizzes WHERE id = $1"#)
            .bind(attempt.quiz_id)
            .fetch_one(&mut *tx)
            .await?;

        let total_questions: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM questions WHERE quiz_id = $1 AND is_active = TRUE"#,
        )
        .bind(quiz.id)
        .fetch_one(&mut *tx)
        .await?;

        let correct_answers: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM user_answers WHERE attempt_id = $1 AND is_correct = TRUE"#,
        )
        .bind(attempt.id)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = grade_attempt(correct_answers, total_questions, quiz.pass_score);
        let completed_at = Utc::now();

        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"UPDATE quiz_attempts
               SET status = 'completed',
                   score = $1,
                   percentage = $2,
                   passed = $3,
                   completed_at = $4,
                   time_taken_seconds = FLOOR(EXTRACT(EPOCH FROM ($4 - started_at)))::int
               WHERE id = $5
               RETURNING *"#,
        )
        .bind(outcome.score)
        .bind(outcome.percentage)
        .bind(outcome.passed)
        .bind(completed_at)
        .bind(attempt.id)
        .fetch_one(&mut *tx)
        .await?;

        // Upsert doubles as a row lock for the read-modify-write below.
        let mut progress = sqlx::query_as::<_, UserProgress>(
            r#"INSERT INTO user_progress (user_id)
               VALUES ($1)
               ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()
               RETURNING *"#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        apply_finish(
            &mut progress,
            outcome.passed,
            quiz.points_reward,
            crate::utils::time::today_utc(),
        );

        sqlx::query(
            r#"UPDATE user_progress
               SET total_points = $1,
                   total_quizzes_taken = $2,
                   total_quizzes_passed = $3,
                   current_streak = $4,
                   longest_streak = $5,
                   last_quiz_date = $6,
                   level = $7,
                   updated_at = NOW()
               WHERE id = $8"#,
        )
        .bind(progress.total_points)
        .bind(progress.total_quizzes_taken)
        .bind(progress.total_quizzes_passed)
        .bind(progress.current_streak)
        .bind(progress.longest_streak)
        .bind(progress.last_quiz_date)
        .bind(progress.level)
        .bind(progress.id)
        .execute(&mut *tx)
        .await?;

        let badges_earned = if outcome.passed {
            let qualifying = sqlx::query_as::<_, Badge>(
                r#"SELECT b.* FROM badges b
                   WHERE b.badge_type = 'score'
                     AND b.is_active = TRUE
                     AND b.points_required <= $1
                     AND NOT EXISTS (
                         SELECT 1 FROM user_badges ub
                         WHERE ub.user_id = $2 AND ub.badge_id = b.id
                     )
                   ORDER BY b.points_required ASC"#,
            )
            .bind(progress.total_points)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

            for badge in &qualifying {
                sqlx::query(
                    r#"INSERT INTO user_badges (user_id, badge_id)
                       VALUES ($1, $2)
                       ON CONFLICT (user_id, badge_id) DO NOTHING"#,
                )
                .bind(user_id)
                .bind(badge.id)
                .execute(&mut *tx)
                .await?;
            }
            qualifying
        } else {
            Vec::new()
        };

        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"SELECT ua.question_id,
                      q.question_text,
                      q.question_type,
                      q.explanation,
                      ua.selected_answer_id,
                      sel.answer_text AS selected_answer_text,
                      ua.text_answer,
                      ua.is_correct,
                      (SELECT a.answer_text FROM answers a
                       WHERE a.question_id = q.id AND a.is_correct = TRUE
                       ORDER BY a.position ASC, a.id ASC
                       LIMIT 1) AS correct_answer,
                      ua.answered_at
               FROM user_answers ua
               JOIN questions q ON q.id = ua.question_id
               LEFT JOIN answers sel ON sel.id = ua.selected_answer_id
               WHERE ua.attempt_id = $1
               ORDER BY q.position ASC, ua.answered_at ASC"#,
        )
        .bind(attempt.id)
        .fetch_all(&mut *tx)
        .await?;

        let badge_count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM user_badges WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(QuizResultResponse {
            attempt,
            answers: rows.into_iter().map(ReviewRow::into_review).collect(),
            badges_earned,
            progress: ProgressResponse {
                progress,
                badges_earned: badge_count,
            },
        })
    }

    pub async fn get_progress(&self, user_id: Uuid) -> Result<ProgressResponse> {
        let existing = sqlx::query_as::<_, UserProgress>(
            r#"SELECT * FROM user_progress WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let progress = match existing {
            Some(progress) => progress,
            None => {
                sqlx::query(
                    r#"INSERT INTO user_progress (user_id)
                       VALUES ($1)
                       ON CONFLICT (user_id) DO NOTHING"#,
                )
                .bind(user_id)
                .execute(&self.pool)
                .await?;
                sqlx::query_as::<_, UserProgress>(
                    r#"SELECT * FROM user_progress WHERE user_id = $1"#,
                )
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?
            }
        };

        let badges_earned: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM user_badges WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProgressResponse { progress, badges_earned })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_progress() -> UserProgress {
        UserProgress {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            total_points: 0,
            total_quizzes_taken: 0,
            total_quizzes_passed: 0,
            current_streak: 0,
            longest_streak: 0,
            last_quiz_date: None,
            level: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_quiz_grades_to_zero_and_fails() {
        let outcome = grade_attempt(0, 0, 70);
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.percentage, 0.0);
        assert!(!outcome.passed);
    }

    #[test]
    fn three_of_four_at_pass_seventy_passes() {
        let outcome = grade_attempt(3, 4, 70);
        assert_eq!(outcome.percentage, 75.0);
        assert_eq!(outcome.score, 75);
        assert!(outcome.passed);
    }

    #[test]
    fn two_of_four_at_pass_seventy_fails() {
        let outcome = grade_attempt(2, 4, 70);
        assert_eq!(outcome.percentage, 50.0);
        assert_eq!(outcome.score, 50);
        assert!(!outcome.passed);
    }

    #[test]
    fn exact_pass_score_counts_as_passed() {
        let outcome = grade_attempt(7, 10, 70);
        assert_eq!(outcome.percentage, 70.0);
        assert!(outcome.passed);
    }

    #[test]
    fn score_truncates_fractional_percentage() {
        let outcome = grade_attempt(2, 3, 70);
        assert_eq!(outcome.score, 66);
        assert!(!outcome.passed);
    }

    #[test]
    fn level_steps_every_hundred_points() {
        assert_eq!(level_for(0), 1);
        assert_eq!(level_for(99), 1);
        assert_eq!(level_for(100), 2);
        assert_eq!(level_for(250), 3);
    }

    #[test]
    fn pass_on_consecutive_day_extends_streak() {
        let mut progress = blank_progress();
        progress.current_streak = 3;
        progress.longest_streak = 3;
        progress.last_quiz_date = Some(date(2025, 6, 9));

        apply_finish(&mut progress, true, 10, date(2025, 6, 10));

        assert_eq!(progress.current_streak, 4);
        assert_eq!(progress.longest_streak, 4);
        assert_eq!(progress.last_quiz_date, Some(date(2025, 6, 10)));
    }

    #[test]
    fn pass_after_gap_restarts_streak_at_one() {
        let mut progress = blank_progress();
        progress.current_streak = 5;
        progress.longest_streak = 5;
        progress.last_quiz_date = Some(date(2025, 6, 8));

        apply_finish(&mut progress, true, 10, date(2025, 6, 10));

        assert_eq!(progress.current_streak, 1);
        assert_eq!(progress.longest_streak, 5);
    }

    #[test]
    fn second_pass_same_day_leaves_streak_alone() {
        let mut progress = blank_progress();
        progress.current_streak = 2;
        progress.longest_streak = 2;
        progress.last_quiz_date = Some(date(2025, 6, 10));

        apply_finish(&mut progress, true, 10, date(2025, 6, 10));

        assert_eq!(progress.current_streak, 2);
        assert_eq!(progress.total_quizzes_passed, 1);
    }

    #[test]
    fn first_ever_pass_starts_streak_at_one() {
        let mut progress = blank_progress();

        apply_finish(&mut progress, true, 25, date(2025, 6, 10));

        assert_eq!(progress.current_streak, 1);
        assert_eq!(progress.longest_streak, 1);
        assert_eq!(progress.total_points, 25);
        assert_eq!(progress.level, 1);
    }

    #[test]
    fn fail_clears_streak_but_still_counts_the_attempt() {
        let mut progress = blank_progress();
        progress.current_streak = 4;
        progress.longest_streak = 4;
        progress.total_points = 120;
        progress.level = 2;
        progress.last_quiz_date = Some(date(2025, 6, 9));

        apply_finish(&mut progress, false, 10, date(2025, 6, 10));

        assert_eq!(progress.current_streak, 0);
        assert_eq!(progress.longest_streak, 4);
        assert_eq!(progress.total_quizzes_taken, 1);
        assert_eq!(progress.total_quizzes_passed, 0);
        assert_eq!(progress.total_points, 120);
        assert_eq!(progress.last_quiz_date, Some(date(2025, 6, 10)));
        assert_eq!(progress.level, 2);
    }

    #[test]
    fn points_accumulate_and_level_recomputes_on_pass() {
        let mut progress = blank_progress();
        progress.total_points = 95;

        apply_finish(&mut progress, true, 10, date(2025, 6, 10));

        assert_eq!(progress.total_points, 105);
        assert_eq!(progress.level, 2);
    }
}
