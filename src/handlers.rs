use crate::{
    AppState,
    auth::AuthUser,
    errors::ApiError,
    models::{
        AuthRequest, Bookmark, CreateBookmarkRequest, EditBookmarkRequest, EditUserRequest,
        TokenResponse, User,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

// --- Auth Handlers ---

/// signup
///
/// [Public Route] Registers a new account and returns its first access token.
///
/// *Validation*: email shape and non-empty password are checked before the
/// service runs. An already-registered email fails with 403 and creates no row.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = AuthRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Malformed email or password"),
        (status = 403, description = "Credentials taken")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    payload.validate()?;
    let token = state.auth.signup(payload).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// signin
///
/// [Public Route] Exchanges credentials for an access token.
///
/// *Enumeration resistance*: unknown email and wrong password return the
/// identical 403 response.
#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 403, description = "Credentials invalid")
    )
)]
pub async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate()?;
    let token = state.auth.signin(payload).await?;
    Ok(Json(token))
}

// --- User Handlers ---

/// get_me
///
/// [Authenticated Route] Returns the authenticated user's own record, as
/// already resolved (hash stripped) by the `AuthUser` extractor.
#[utoipa::path(
    get,
    path = "/users/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(AuthUser { user }: AuthUser) -> Json<User> {
    Json(user)
}

/// edit_user
///
/// [Authenticated Route] Applies a sparse patch to the caller's own profile.
/// Only supplied fields change; id and email are not reachable through this
/// path. The target id always comes from the extractor, never the client.
#[utoipa::path(
    patch,
    path = "/users",
    request_body = EditUserRequest,
    responses((status = 200, description = "Updated profile", body = User))
)]
pub async fn edit_user(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<EditUserRequest>,
) -> Result<Json<User>, ApiError> {
    let updated = state
        .repo
        .update_user(user.id, payload)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(User::from(updated)))
}

// --- Bookmark Handlers ---

/// create_bookmark
///
/// [Authenticated Route] Persists a new bookmark owned by the caller. The
/// owner id is taken from the authenticated session, ensuring a client can
/// never create rows under another account.
#[utoipa::path(
    post,
    path = "/bookmarks",
    request_body = CreateBookmarkRequest,
    responses(
        (status = 201, description = "Created", body = Bookmark),
        (status = 400, description = "Empty title or link")
    )
)]
pub async fn create_bookmark(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBookmarkRequest>,
) -> Result<(StatusCode, Json<Bookmark>), ApiError> {
    payload.validate()?;
    let bookmark = state.repo.create_bookmark(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

/// get_bookmarks
///
/// [Authenticated Route] Lists the caller's own bookmarks; other users' rows
/// are invisible by construction of the repository query.
#[utoipa::path(
    get,
    path = "/bookmarks",
    responses((status = 200, description = "My bookmarks", body = [Bookmark]))
)]
pub async fn get_bookmarks(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Bookmark>>, ApiError> {
    let bookmarks = state.repo.get_bookmarks(user.id).await?;
    Ok(Json(bookmarks))
}

/// get_bookmark_by_id
///
/// [Authenticated Route] Fetches one bookmark by id, owner-scoped. A row that
/// is absent or belongs to someone else yields a `null` body, so the response
/// never reveals whether another user's bookmark exists.
#[utoipa::path(
    get,
    path = "/bookmarks/{id}",
    params(("id" = i64, Path, description = "Bookmark ID")),
    responses((status = 200, description = "Bookmark, or null when absent or not owned", body = Bookmark))
)]
pub async fn get_bookmark_by_id(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Option<Bookmark>>, ApiError> {
    let bookmark = state.repo.get_bookmark(user.id, id).await?;
    Ok(Json(bookmark))
}

/// edit_bookmark
///
/// [Authenticated Route] Applies a sparse patch to one of the caller's
/// bookmarks.
///
/// *Authorization*: the repository performs a single conditional update; zero
/// affected rows means absent-or-not-owned and surfaces as 403 either way.
#[utoipa::path(
    patch,
    path = "/bookmarks/{id}",
    params(("id" = i64, Path, description = "Bookmark ID")),
    request_body = EditBookmarkRequest,
    responses(
        (status = 200, description = "Updated", body = Bookmark),
        (status = 403, description = "Not owner")
    )
)]
pub async fn edit_bookmark(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<EditBookmarkRequest>,
) -> Result<Json<Bookmark>, ApiError> {
    payload.validate()?;
    let bookmark = state
        .repo
        .update_bookmark(user.id, id, payload)
        .await?
        .ok_or(ApiError::AccessDenied)?;
    Ok(Json(bookmark))
}

/// delete_bookmark
///
/// [Authenticated Route] Removes one of the caller's bookmarks. Same atomic
/// ownership condition as edit; success returns no content.
#[utoipa::path(
    delete,
    path = "/bookmarks/{id}",
    params(("id" = i64, Path, description = "Bookmark ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not owner")
    )
)]
pub async fn delete_bookmark(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_bookmark(user.id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::AccessDenied)
    }
}
