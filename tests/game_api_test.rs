use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use quiz_platform_backend::models::user::User;

fn seed_env() {
    dotenvy::dotenv().ok();
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var("ACCESS_TOKEN_MINUTES", "15");
    env::set_var("REFRESH_TOKEN_DAYS", "7");
    env::set_var("PASSWORD_EXPIRY_DAYS", "120");
    env::set_var("GOOGLE_CLIENT_ID", "client-id");
    env::set_var("GOOGLE_CLIENT_SECRET", "client-secret");
    env::set_var("BASE_BACKEND_URL", "http://localhost:8000");
    env::set_var("FRONTEND_URL", "http://localhost:3000");
    env::set_var("ADMIN_CONSOLE_URL", "http://localhost:3001");
    env::set_var("MAIL_WEBHOOK_URL", "http://localhost/mail");
    env::set_var("MAIL_WEBHOOK_SECRET", "mail-secret");
    env::set_var("PUBLIC_RPS", "100");
    env::set_var("API_RPS", "100");
}

async fn setup_app() -> (Router, sqlx::PgPool) {
    seed_env();
    quiz_platform_backend::config::init_config().expect("init config");
    let pool = quiz_platform_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    let state = quiz_platform_backend::AppState::new(pool.clone());

    let public = Router::new()
        .route(
            "/api/quiz/quizzes/:quiz_id",
            get(quiz_platform_backend::routes::quiz::get_quiz),
        )
        .route(
            "/api/quiz/leaderboard",
            get(quiz_platform_backend::routes::leaderboard::leaderboard),
        );

    let protected = Router::new()
        .route(
            "/api/quiz/game/start",
            post(quiz_platform_backend::routes::game::start_quiz),
        )
        .route(
            "/api/quiz/game/submit-answer",
            post(quiz_platform_backend::routes::game::submit_answer),
        )
        .route(
            "/api/quiz/game/finish",
            post(quiz_platform_backend::routes::game::finish_quiz),
        )
        .route(
            "/api/quiz/progress",
            get(quiz_platform_backend::routes::game::my_progress),
        )
        .route(
            "/api/quiz/badges/mine",
            get(quiz_platform_backend::routes::quiz::my_badges),
        )
        .layer(axum::middleware::from_fn(
            quiz_platform_backend::middleware::auth::require_bearer_auth,
        ));

    let app = public.merge(protected).with_state(state);
    (app, pool)
}

async fn seed_player(pool: &sqlx::PgPool) -> (User, String) {
    let email = format!("player_{}@example.com", Uuid::new_v4().simple());
    let user = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (email, password_hash, first_name, last_name, role, verified)
           VALUES ($1, 'x', 'Quiz', 'Player', 'user', TRUE)
           RETURNING *"#,
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .expect("seed user");

    let pair = quiz_platform_backend::utils::token::issue_token_pair(&user).expect("token pair");
    (user, pair.access)
}

struct SeededQuiz {
    quiz_id: Uuid,
    q1: Uuid,
    q1_correct: Uuid,
    q2: Uuid,
    q2_correct: Uuid,
    q2_wrong: Uuid,
    badge_id: Uuid,
}

async fn seed_quiz(pool: &sqlx::PgPool, creator: Uuid) -> SeededQuiz {
    let category_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO categories (name, description) VALUES ($1, 'Memory basics') RETURNING id"#,
    )
    .bind(format!("Rust Basics {}", Uuid::new_v4().simple()))
    .fetch_one(pool)
    .await
    .expect("seed category");

    // points_reward 120 crosses the 100-point badge threshold in one pass.
    let quiz_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO quizzes (title, description, category_id, pass_score, points_reward, total_questions, created_by)
           VALUES ('Ownership 101', 'Two quick questions', $1, 50, 120, 2, $2)
           RETURNING id"#,
    )
    .bind(category_id)
    .bind(creator)
    .fetch_one(pool)
    .await
    .expect("seed quiz");

    let badge_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO badges (name, badge_type, points_required)
           VALUES ($1, 'score', 100)
           RETURNING id"#,
    )
    .bind(format!("Centurion {}", Uuid::new_v4().simple()))
    .fetch_one(pool)
    .await
    .expect("seed badge");

    let q1: Uuid = sqlx::query_scalar(
        r#"INSERT INTO questions (quiz_id, question_text, question_type, explanation, position)
           VALUES ($1, 'What moves ownership?', 'multiple_choice', 'Assignment moves.', 1)
           RETURNING id"#,
    )
    .bind(quiz_id)
    .fetch_one(pool)
    .await
    .expect("seed q1");

    let mut q1_correct = Uuid::nil();
    for (pos, (text, correct)) in [
        ("Borrowing", false),
        ("Assignment", true),
        ("Shadowing", false),
        ("Printing", false),
    ]
    .into_iter()
    .enumerate()
    {
        let id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO answers (question_id, answer_text, is_correct, position)
               VALUES ($1, $2, $3, $4)
               RETURNING id"#,
        )
        .bind(q1)
        .bind(text)
        .bind(correct)
        .bind((pos + 1) as i32)
        .fetch_one(pool)
        .await
        .expect("seed q1 answer");
        if correct {
            q1_correct = id;
        }
    }

    let q2: Uuid = sqlx::query_scalar(
        r#"INSERT INTO questions (quiz_id, question_text, question_type, explanation, position)
           VALUES ($1, 'Slices borrow their data.', 'true_false', 'They do.', 2)
           RETURNING id"#,
    )
    .bind(quiz_id)
    .fetch_one(pool)
    .await
    .expect("seed q2");

    let q2_correct: Uuid = sqlx::query_scalar(
        r#"INSERT INTO answers (question_id, answer_text, is_correct, position)
           VALUES ($1, 'True', TRUE, 1)
           RETURNING id"#,
    )
    .bind(q2)
    .fetch_one(pool)
    .await
    .expect("seed q2 true");

    let q2_wrong: Uuid = sqlx::query_scalar(
        r#"INSERT INTO answers (question_id, answer_text, is_correct, position)
           VALUES ($1, 'False', FALSE, 2)
           RETURNING id"#,
    )
    .bind(q2)
    .fetch_one(pool)
    .await
    .expect("seed q2 false");

    SeededQuiz {
        quiz_id,
        q1,
        q1_correct,
        q2,
        q2_correct,
        q2_wrong,
        badge_id,
    }
}

async fn authed_post(app: &Router, uri: &str, token: &str, body: JsonValue) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

async fn authed_get(app: &Router, uri: &str, token: &str) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

#[tokio::test]
async fn quiz_game_flow_end_to_end() {
    seed_env();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("skipping quiz_game_flow_end_to_end: DATABASE_URL is not set");
        return;
    }
    let (app, pool) = setup_app().await;
    let (user, access) = seed_player(&pool).await;
    let seeded = seed_quiz(&pool, user.id).await;

    // Game routes demand a bearer token.
    let req = Request::builder()
        .method("POST")
        .uri("/api/quiz/game/start")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "quiz_id": seeded.quiz_id }).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Quiz detail is public and ships the questions with their answers.
    let req = Request::builder()
        .method("GET")
        .uri(format!("/api/quiz/quizzes/{}", seeded.quiz_id))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let detail: JsonValue = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(detail["questions"].as_array().unwrap().len(), 2);

    let (status, started) = authed_post(
        &app,
        "/api/quiz/game/start",
        &access,
        json!({ "quiz_id": seeded.quiz_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(started["attempt"]["status"], "in_progress");
    assert_eq!(started["quiz"]["questions"].as_array().unwrap().len(), 2);
    let attempt_id = started["attempt"]["id"].as_str().unwrap().to_string();

    // Starting again resumes the same attempt instead of opening a second one.
    let (status, resumed) = authed_post(
        &app,
        "/api/quiz/game/start",
        &access,
        json!({ "quiz_id": seeded.quiz_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resumed["attempt"]["id"].as_str().unwrap(), attempt_id);

    // An answer belonging to a different question is rejected.
    let (status, body) = authed_post(
        &app,
        "/api/quiz/game/submit-answer",
        &access,
        json!({ "question_id": seeded.q1, "answer_id": seeded.q2_correct }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid answer for this question");

    let (status, body) = authed_post(
        &app,
        "/api/quiz/game/submit-answer",
        &access,
        json!({ "question_id": seeded.q1, "answer_id": seeded.q1_correct }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["saved"], true);

    // A resubmission overwrites the earlier answer for the question.
    let (status, _) = authed_post(
        &app,
        "/api/quiz/game/submit-answer",
        &access,
        json!({ "question_id": seeded.q2, "answer_id": seeded.q2_wrong }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = authed_post(
        &app,
        "/api/quiz/game/submit-answer",
        &access,
        json!({ "question_id": seeded.q2, "answer_id": seeded.q2_correct }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, result) = authed_post(
        &app,
        "/api/quiz/game/finish",
        &access,
        json!({ "attempt_id": attempt_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["attempt"]["status"], "completed");
    assert_eq!(result["attempt"]["score"], 100);
    assert_eq!(result["attempt"]["passed"], true);

    let review = result["answers"].as_array().unwrap();
    assert_eq!(review.len(), 2);
    assert!(review.iter().all(|a| a["is_correct"] == true));
    assert_eq!(review[0]["correct_answer"], "Assignment");

    let earned = result["badges_earned"].as_array().unwrap();
    assert!(earned
        .iter()
        .any(|b| b["id"].as_str() == Some(seeded.badge_id.to_string().as_str())));
    assert_eq!(result["progress"]["total_points"], 120);
    assert_eq!(result["progress"]["level"], 2);
    assert_eq!(result["progress"]["current_streak"], 1);
    assert_eq!(result["progress"]["total_quizzes_passed"], 1);
    assert!(result["progress"]["badges_earned"].as_i64().unwrap() >= 1);

    // Finishing twice is rejected; the first grade stands.
    let (status, body) = authed_post(
        &app,
        "/api/quiz/game/finish",
        &access,
        json!({ "attempt_id": attempt_id }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Quiz attempt not found");

    let (status, progress) = authed_get(&app, "/api/quiz/progress", &access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["total_points"], 120);
    assert_eq!(progress["total_quizzes_taken"], 1);

    let (status, badges) = authed_get(&app, "/api/quiz/badges/mine", &access).await;
    assert_eq!(status, StatusCode::OK);
    assert!(badges
        .as_array()
        .unwrap()
        .iter()
        .any(|b| b["badge"]["id"].as_str() == Some(seeded.badge_id.to_string().as_str())));

    let req = Request::builder()
        .method("GET")
        .uri("/api/quiz/leaderboard")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let board: JsonValue = serde_json::from_slice(&bytes).unwrap();
    let entry = board
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["user_id"].as_str() == Some(user.id.to_string().as_str()))
        .expect("player on leaderboard");
    assert_eq!(entry["total_points"], 120);
    assert!(entry["rank"].as_i64().unwrap() >= 1);
}
