use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use quiz_platform_backend::services::mail_service::MailService;
use quiz_platform_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::{auth, cors, rate_limit},
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    {
        let state = app_state.clone();
        tokio::spawn(async move {
            let mailer =
                MailService::new(state.pool.clone(), get_config().mail_webhook_url.clone());
            loop {
                match mailer.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Mail worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    let public_api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/auth/register", post(routes::account::register))
        .route("/api/auth/login", post(routes::account::login))
        .route("/api/auth/refresh", post(routes::account::refresh))
        .route(
            "/api/auth/password-reset",
            post(routes::account::request_password_reset),
        )
        .route(
            "/api/auth/password-reset/confirm",
            post(routes::account::confirm_password_reset),
        )
        .route(
            "/api/auth/email-verification",
            post(routes::account::request_email_verification),
        )
        .route(
            "/api/auth/email-verification/confirm",
            post(routes::account::confirm_email_verification),
        )
        .route(
            "/api/auth/google/redirect",
            get(routes::social::google_redirect),
        )
        .route(
            "/api/auth/google/callback",
            get(routes::social::google_callback),
        )
        .route("/api/quiz/categories", get(routes::quiz::list_categories))
        .route(
            "/api/quiz/categories/:category_id",
            get(routes::quiz::get_category),
        )
        .route(
            "/api/quiz/categories/:category_id/quizzes",
            get(routes::quiz::category_quizzes),
        )
        .route("/api/quiz/quizzes", get(routes::quiz::list_quizzes))
        .route(
            "/api/quiz/quizzes/popular",
            get(routes::quiz::popular_quizzes),
        )
        .route("/api/quiz/quizzes/:quiz_id", get(routes::quiz::get_quiz))
        .route("/api/quiz/badges", get(routes::quiz::list_badges))
        .route(
            "/api/quiz/leaderboard",
            get(routes::leaderboard::leaderboard),
        )
        .route(
            "/api/quiz/leaderboard/category",
            get(routes::leaderboard::leaderboard_by_category),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.public_rps),
            rate_limit::rps_middleware,
        ));

    let user_api = Router::new()
        .route("/api/account/me", get(routes::account::me))
        .route(
            "/api/account/users/:user_id",
            get(routes::account::get_user).patch(routes::account::update_user),
        )
        .route(
            "/api/quiz/quizzes/recommended",
            get(routes::quiz::recommended_quizzes),
        )
        .route("/api/quiz/game/start", post(routes::game::start_quiz))
        .route(
            "/api/quiz/game/submit-answer",
            post(routes::game::submit_answer),
        )
        .route("/api/quiz/game/finish", post(routes::game::finish_quiz))
        .route("/api/quiz/progress", get(routes::game::my_progress))
        .route("/api/quiz/badges/mine", get(routes::quiz::my_badges))
        .route(
            "/api/quiz/resources",
            get(routes::resource::list_resources).post(routes::resource::upload_resource),
        )
        .route(
            "/api/quiz/resources/:resource_id",
            axum::routing::delete(routes::resource::delete_resource),
        )
        .layer(axum::middleware::from_fn(auth::require_bearer_auth))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.api_rps),
            rate_limit::rps_middleware,
        ));

    let admin_api = Router::new()
        .route("/api/account/users", get(routes::account::list_users))
        .route("/api/admin/categories", post(routes::quiz::create_category))
        .route(
            "/api/admin/categories/:category_id",
            axum::routing::patch(routes::quiz::update_category)
                .delete(routes::quiz::delete_category),
        )
        .route("/api/admin/quizzes", post(routes::quiz::create_quiz))
        .route(
            "/api/admin/quizzes/:quiz_id",
            axum::routing::patch(routes::quiz::update_quiz).delete(routes::quiz::delete_quiz),
        )
        .layer(axum::middleware::from_fn(auth::require_admin))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.api_rps),
            rate_limit::rps_middleware,
        ));

    info!("Serving uploads from: {}", config.uploads_dir);

    let app = public_api
        .merge(user_api)
        .merge(admin_api)
        .nest_service(
            "/uploads",
            tower_http::services::ServeDir::new(config.uploads_dir.clone()),
        )
        .with_state(app_state)
        .layer(cors::permissive_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
