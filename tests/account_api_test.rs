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

    let protected = Router::new()
        .route(
            "/api/account/me",
            get(quiz_platform_backend::routes::account::me),
        )
        .layer(axum::middleware::from_fn(
            quiz_platform_backend::middleware::auth::require_bearer_auth,
        ));

    let app = Router::new()
        .route(
            "/api/auth/register",
            post(quiz_platform_backend::routes::account::register),
        )
        .route(
            "/api/auth/login",
            post(quiz_platform_backend::routes::account::login),
        )
        .route(
            "/api/auth/refresh",
            post(quiz_platform_backend::routes::account::refresh),
        )
        .merge(protected)
        .with_state(state);

    (app, pool)
}

async fn post_json(app: &Router, uri: &str, body: JsonValue) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

#[tokio::test]
async fn auth_flow_end_to_end() {
    seed_env();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("skipping auth_flow_end_to_end: DATABASE_URL is not set");
        return;
    }
    let (app, pool) = setup_app().await;

    let email = format!("ada_{}@example.com", Uuid::new_v4().simple());
    let password = "s3cure-pass-1";

    let (status, registered) = post_json(
        &app,
        "/api/auth/register",
        json!({
            "email": email,
            "password": password,
            "confirm_password": password,
            "first_name": "Ada",
            "last_name": "Quizzer"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registered["user"]["email"], email);
    assert_eq!(registered["user"]["role"], "user");
    assert!(registered["token"]["access"].as_str().unwrap().len() > 20);
    let first_refresh = registered["token"]["refresh"].as_str().unwrap().to_string();

    // The welcome email lands in the outbox for the background worker.
    let queued: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM outbound_emails
           WHERE recipient = $1 AND template = 'account_creation.html' AND status = 'pending'"#,
    )
    .bind(&email)
    .fetch_one(&pool)
    .await
    .expect("count outbox");
    assert_eq!(queued, 1);

    let (status, body) = post_json(
        &app,
        "/api/auth/register",
        json!({
            "email": email,
            "password": password,
            "confirm_password": password
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "The user with the email provided exist");

    // Claims carry second-resolution expiry; wait so the login pair cannot
    // be byte-identical to the register pair.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let (status, body) = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": email, "password": "wrong-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid username or password.");

    let (status, logged_in) = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let login_refresh = logged_in["token"]["refresh"].as_str().unwrap().to_string();
    let login_access = logged_in["token"]["access"].as_str().unwrap().to_string();

    // Login rotated the stored session; the register-time refresh is dead.
    let (status, _) = post_json(&app, "/api/auth/refresh", json!({ "refresh": first_refresh })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // An access token is not accepted on the refresh endpoint.
    let (status, body) = post_json(&app, "/api/auth/refresh", json!({ "refresh": login_access })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid/expired token");

    let (status, refreshed) = post_json(&app, "/api/auth/refresh", json!({ "refresh": login_refresh })).await;
    assert_eq!(status, StatusCode::OK);
    let fresh_access = refreshed["token"]["access"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("GET")
        .uri("/api/account/me")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method("GET")
        .uri("/api/account/me")
        .header("authorization", format!("Bearer {}", fresh_access))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let me: JsonValue = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(me["email"], email);
    assert_eq!(me["first_name"], "Ada");
}
