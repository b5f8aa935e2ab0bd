use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::quiz_dto::{
    CategoryResponse, CreateCategoryPayload, CreateQuizPayload, QuestionWithAnswers,
    QuizDetailResponse, QuizListItem, QuizListQuery, QuizListResponse, UpdateCategoryPayload,
    UpdateQuizPayload,
};
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::category::Category;
use crate::models::question::Question;
use crate::models::quiz::Quiz;

const DEFAULT_ICON: &str = "folder";
const DEFAULT_COLOR: &str = "#3B82F6";

const QUIZ_ITEM_COLUMNS: &str = "q.id, q.title, q.description, q.category_id, c.name AS category_name, q.difficulty, q.time_limit_minutes, q.total_questions, q.pass_score, q.points_reward, (SELECT COUNT(*) FROM questions qq WHERE qq.quiz_id = q.id AND qq.is_active = TRUE) AS question_count, q.created_at";

#[derive(Clone)]
pub struct QuizService {
    pool: PgPool,
}

impl QuizService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_categories(&self, search: Option<String>) -> Result<Vec<CategoryResponse>> {
        let pattern = search.map(|s| format!("%{}%", s));
        let categories = sqlx::query_as::<_, CategoryResponse>(
            r#"SELECT c.id, c.name, c.description, c.icon, c.color, c.is_active,
                      (SELECT COUNT(*) FROM quizzes q
                       WHERE q.category_id = c.id AND q.is_active = TRUE) AS quiz_count,
                      c.created_at
               FROM categories c
               WHERE c.is_active = TRUE
                 AND ($1::text IS NULL OR c.name ILIKE $1 OR c.description ILIKE $1)
               ORDER BY c.name ASC"#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn get_category(&self, category_id: Uuid) -> Result<CategoryResponse> {
        let category = sqlx::query_as::<_, CategoryResponse>(
            r#"SELECT c.id, c.name, c.description, c.icon, c.color, c.is_active,
                      (SELECT COUNT(*) FROM quizzes q
                       WHERE q.category_id = c.id AND q.is_active = TRUE) AS quiz_count,
                      c.created_at
               FROM categories c
               WHERE c.id = $1"#,
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Category not found".to_string()))?;
        Ok(category)
    }

    pub async fn create_category(&self, payload: CreateCategoryPayload) -> Result<Category> {
        let existing: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM categories WHERE LOWER(name) = LOWER($1)"#,
        )
        .bind(&payload.name)
        .fetch_one(&self.pool)
        .await?;
        if existing > 0 {
            return Err(Error::BadRequest(
                "Category with this name already exists".to_string(),
            ));
        }

        let category = sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (name, description, icon, color)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(&payload.name)
        .bind(payload.description.unwrap_or_default())
        .bind(payload.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()))
        .bind(payload.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()))
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        category_id: Uuid,
        payload: UpdateCategoryPayload,
    ) -> Result<Category> {
        if let Some(name) = &payload.name {
            let clash: i64 = sqlx::query_scalar(
                r#"SELECT COUNT(*) FROM categories WHERE LOWER(name) = LOWER($1) AND id <> $2"#,
            )
            .bind(name)
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;
            if clash > 0 {
                return Err(Error::BadRequest(
                    "Category with this name already exists".to_string(),
                ));
            }
        }

        let category = sqlx::query_as::<_, Category>(
            r#"UPDATE categories
               SET name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   icon = COALESCE($4, icon),
                   color = COALESCE($5, color),
                   is_active = COALESCE($6, is_active)
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(category_id)
        .bind(payload.name)
        .bind(payload.description)
        .bind(payload.icon)
        .bind(payload.color)
        .bind(payload.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Category not found".to_string()))?;
        Ok(category)
    }

    pub async fn delete_category(&self, category_id: Uuid) -> Result<()> {
        let res = sqlx::query(r#"DELETE FROM categories WHERE id = $1"#)
            .bind(category_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Category not found".to_string()));
        }
        Ok(())
    }

    pub async fn quizzes_in_category(&self, category_id: Uuid) -> Result<Vec<QuizListItem>> {
        let exists: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM categories WHERE id = $1"#)
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Err(Error::NotFound("Category not found".to_string()));
        }

        let query = format!(
            "SELECT {} FROM quizzes q JOIN categories c ON c.id = q.category_id
             WHERE q.is_active = TRUE AND q.category_id = $1
             ORDER BY q.created_at DESC",
            QUIZ_ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, QuizListItem>(&query)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn list_quizzes(&self, query: QuizListQuery) -> Result<QuizListResponse> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(category_id) = query.category_id {
            filters.push(format!("q.category_id = ${}::uuid", args.len() + 1));
            args.push(category_id.to_string());
        }
        if let Some(difficulty) = query.difficulty {
            filters.push(format!("q.difficulty = ${}", args.len() + 1));
            args.push(difficulty);
        }
        if let Some(search) = query.search {
            let first = args.len() + 1;
            let second = first + 1;
            filters.push(format!(
                "(q.title ILIKE ${} OR q.description ILIKE ${})",
                first, second
            ));
            args.push(format!("%{}%", search.clone()));
            args.push(format!("%{}%", search));
        }

        let where_clause = if filters.is_empty() {
            "WHERE q.is_active = TRUE".to_string()
        } else {
            format!("WHERE q.is_active = TRUE AND {}", filters.join(" AND "))
        };

        let items_query = format!(
            "SELECT {} FROM quizzes q JOIN categories c ON c.id = q.category_id
             {}
             ORDER BY q.created_at DESC
             LIMIT ${} OFFSET ${}",
            QUIZ_ITEM_COLUMNS,
            where_clause,
            args.len() + 1,
            args.len() + 2
        );

        let total_query = format!("SELECT COUNT(*) FROM quizzes q {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, QuizListItem>(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        items_statement = items_statement.bind(per_page).bind(offset);
        let items = items_statement.fetch_all(&self.pool).await?;

        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(QuizListResponse {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn quiz_detail(&self, quiz_id: Uuid) -> Result<QuizDetailResponse> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"SELECT * FROM quizzes WHERE id = $1 AND is_active = TRUE"#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Quiz not found".to_string()))?;

        self.detail_for(quiz).await
    }

    async fn detail_for(&self, quiz: Quiz) -> Result<QuizDetailResponse> {
        let category_name: String =
            sqlx::query_scalar(r#"SELECT name FROM categories WHERE id = $1"#)
                .bind(quiz.category_id)
                .fetch_one(&self.pool)
                .await?;

        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions
               WHERE quiz_id = $1 AND is_active = TRUE
               ORDER BY position ASC, created_at ASC"#,
        )
        .bind(quiz.id)
        .fetch_all(&self.pool)
        .await?;

        let question_ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        let answers = sqlx::query_as::<_, Answer>(
            r#"SELECT * FROM answers
               WHERE question_id = ANY($1)
               ORDER BY position ASC, id ASC"#,
        )
        .bind(&question_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: HashMap<Uuid, Vec<Answer>> = HashMap::new();
        for answer in answers {
            by_question.entry(answer.question_id).or_default().push(answer);
        }

        let questions = questions
            .into_iter()
            .map(|question| {
                let answers = by_question.remove(&question.id).unwrap_or_default();
                QuestionWithAnswers { question, answers }
            })
            .collect();

        Ok(QuizDetailResponse {
            quiz,
            category_name,
            questions,
        })
    }

    /// Creates the quiz and any nested questions/answers in one transaction.
    pub async fn create_quiz(&self, payload: CreateQuizPayload, created_by: Uuid) -> Result<Quiz> {
        let category: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM categories WHERE id = $1"#)
            .bind(payload.category_id)
            .fetch_one(&self.pool)
            .await?;
        if category == 0 {
            return Err(Error::BadRequest("Category not found".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"INSERT INTO quizzes
                   (title, description, category_id, difficulty, time_limit_minutes,
                    total_questions, pass_score, points_reward, created_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(&payload.title)
        .bind(payload.description.unwrap_or_default())
        .bind(payload.category_id)
        .bind(payload.difficulty.unwrap_or_else(|| "easy".to_string()))
        .bind(payload.time_limit_minutes.unwrap_or(30))
        .bind(payload.total_questions.unwrap_or(10))
        .bind(payload.pass_score.unwrap_or(70))
        .bind(payload.points_reward.unwrap_or(10))
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        for (index, question) in payload.questions.unwrap_or_default().into_iter().enumerate() {
            let question_id: Uuid = sqlx::query_scalar(
                r#"INSERT INTO questions
                       (quiz_id, question_text, question_type, explanation, points, position)
                   VALUES ($1, $2, $3, $4, $5, $6)
                   RETURNING id"#,
            )
            .bind(quiz.id)
            .bind(&question.question_text)
            .bind(question.question_type.as_str())
            .bind(question.explanation.unwrap_or_default())
            .bind(question.points.unwrap_or(1))
            .bind(question.position.unwrap_or(index as i32 + 1))
            .fetch_one(&mut *tx)
            .await?;

            for (answer_index, answer) in question.answers.into_iter().enumerate() {
                sqlx::query(
                    r#"INSERT INTO answers (question_id, answer_text, is_correct, position)
                       VALUES ($1, $2, $3, $4)"#,
                )
                .bind(question_id)
                .bind(&answer.answer_text)
                .bind(answer.is_correct)
                .bind(answer.position.unwrap_or(answer_index as i32 + 1))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(quiz)
    }

    pub async fn update_quiz(&self, quiz_id: Uuid, payload: UpdateQuizPayload) -> Result<Quiz> {
        if let Some(category_id) = payload.category_id {
            let exists: i64 =
                sqlx::query_scalar(r#"SELECT COUNT(*) FROM categories WHERE id = $1"#)
                    .bind(category_id)
                    .fetch_one(&self.pool)
                    .await?;
            if exists == 0 {
                return Err(Error::BadRequest("Category not found".to_string()));
            }
        }

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"UPDATE quizzes
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   category_id = COALESCE($4, category_id),
                   difficulty = COALESCE($5, difficulty),
                   time_limit_minutes = COALESCE($6, time_limit_minutes),
                   total_questions = COALESCE($7, total_questions),
                   pass_score = COALESCE($8, pass_score),
                   points_reward = COALESCE($9, points_reward),
                   is_active = COALESCE($10, is_active),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(quiz_id)
        .bind(payload.title)
        .bind(payload.description)
        .bind(payload.category_id)
        .bind(payload.difficulty)
        .bind(payload.time_limit_minutes)
        .bind(payload.total_questions)
        .bind(payload.pass_score)
        .bind(payload.points_reward)
        .bind(payload.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Quiz not found".to_string()))?;
        Ok(quiz)
    }

    pub async fn delete_quiz(&self, quiz_id: Uuid) -> Result<()> {
        let res = sqlx::query(r#"DELETE FROM quizzes WHERE id = $1"#)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Quiz not found".to_string()));
        }
        Ok(())
    }

    /// Most-attempted active quizzes, ties broken by recency.
    pub async fn popular(&self) -> Result<Vec<QuizListItem>> {
        let query = format!(
            "SELECT {} FROM quizzes q JOIN categories c ON c.id = q.category_id
             WHERE q.is_active = TRUE
             ORDER BY (SELECT COUNT(*) FROM quiz_attempts qa WHERE qa.quiz_id = q.id) DESC,
                      q.created_at DESC
             LIMIT 10",
            QUIZ_ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, QuizListItem>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Unattempted quizzes from the user's three most-played categories,
    /// falling back to the popular list for users with no history.
    pub async fn recommended(&self, user_id: Uuid) -> Result<Vec<QuizListItem>> {
        let top_categories: Vec<Uuid> = sqlx::query_scalar(
            r#"SELECT qz.category_id
               FROM quiz_attempts qa
               JOIN quizzes qz ON qz.id = qa.quiz_id
               WHERE qa.user_id = $1
               GROUP BY qz.category_id
               ORDER BY COUNT(*) DESC
               LIMIT 3"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if top_categories.is_empty() {
            return self.popular().await;
        }

        let query = format!(
            "SELECT {} FROM quizzes q JOIN categories c ON c.id = q.category_id
             WHERE q.is_active = TRUE
               AND q.category_id = ANY($1)
               AND NOT EXISTS (
                   SELECT 1 FROM quiz_attempts qa
                   WHERE qa.quiz_id = q.id AND qa.user_id = $2
               )
             ORDER BY q.created_at DESC
             LIMIT 10",
            QUIZ_ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, QuizListItem>(&query)
            .bind(&top_categories)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }
}
