use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines the endpoints reachable without a bearer token. This is the entire
/// unauthenticated surface: a liveness probe and the two credential
/// endpoints. Everything else in the application sits behind the auth layer.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load
        // balancer checks. Returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/signup
        // Creates an account and returns the first access token. A taken
        // email is a 403, never a different status that would reveal state.
        .route("/auth/signup", post(handlers::signup))
        // POST /auth/signin
        // Exchanges credentials for an access token.
        .route("/auth/signin", post(handlers::signin))
}
