use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Authenticated Router Module
///
/// Every route here requires a validated bearer token: the `AuthUser`
/// extractor middleware layered above this module guarantees each handler
/// receives a resolved identity, which is then the scope for every
/// owner-checked repository call.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /users/me
        // Returns the authenticated user's own record, hash stripped.
        .route("/users/me", get(handlers::get_me))
        // PATCH /users
        // Sparse self-profile edit (first/last name). Email and id are not
        // alterable through this path.
        .route("/users", patch(handlers::edit_user))
        // GET/POST /bookmarks
        // Lists the caller's bookmarks; creates a new one owned by the caller.
        .route(
            "/bookmarks",
            get(handlers::get_bookmarks).post(handlers::create_bookmark),
        )
        // GET/PATCH/DELETE /bookmarks/{id}
        // Single-bookmark operations. All three are owner-scoped in the
        // repository query itself, so another user's bookmark behaves exactly
        // like a missing one.
        .route(
            "/bookmarks/{id}",
            get(handlers::get_bookmark_by_id)
                .patch(handlers::edit_bookmark)
                .delete(handlers::delete_bookmark),
        )
}
