use tower_http::cors::{Any, CorsLayer};

/// Wide-open CORS; the API is consumed by browser frontends on other
/// origins and auth is bearer-token based, not cookie based.
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any)
}
