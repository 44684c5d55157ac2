use crate::errors::RepoError;
use crate::models::{
    Bookmark, CreateBookmarkRequest, EditBookmarkRequest, EditUserRequest, UserRecord,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// Repository Trait
///
/// Abstract contract for all persistence operations, allowing services and
/// handlers to interact with the data layer without knowing the backend
/// (Postgres in production, in-memory fakes in tests).
///
/// Every method returns `Result`: the store is the sole holder of durable
/// state, and an unexpected failure there must reach the boundary as a server
/// error rather than degrade into an empty response.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    // Insert a new user row. An email collision surfaces as
    // `RepoError::UniqueViolation` for the auth service to translate.
    async fn create_user(&self, email: &str, hash: &str) -> Result<UserRecord, RepoError>;
    async fn get_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;
    // Sparse profile patch. Only supplied fields change; id and email never do.
    async fn update_user(
        &self,
        id: i64,
        req: EditUserRequest,
    ) -> Result<Option<UserRecord>, RepoError>;

    // --- Bookmarks (all owner-scoped) ---
    async fn create_bookmark(
        &self,
        user_id: i64,
        req: CreateBookmarkRequest,
    ) -> Result<Bookmark, RepoError>;
    async fn get_bookmarks(&self, user_id: i64) -> Result<Vec<Bookmark>, RepoError>;
    // Returns the row only if it exists AND belongs to `user_id`.
    async fn get_bookmark(&self, user_id: i64, id: i64) -> Result<Option<Bookmark>, RepoError>;
    // Owner-Only: single conditional update, `None` when the row is absent or
    // owned by someone else.
    async fn update_bookmark(
        &self,
        user_id: i64,
        id: i64,
        req: EditBookmarkRequest,
    ) -> Result<Option<Bookmark>, RepoError>;
    // Owner-Only: returns true only if a row was actually deleted.
    async fn delete_bookmark(&self, user_id: i64, id: i64) -> Result<bool, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, created_at, updated_at, email, hash, first_name, last_name";
const BOOKMARK_COLUMNS: &str = "id, user_id, title, link, description, created_at, updated_at";

/// Maps a unique-constraint violation to its own variant; every other error
/// passes through unchanged.
fn classify(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::UniqueViolation,
        _ => RepoError::Database(err),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// create_user
    ///
    /// Inserts the identity row. The `users.email` unique index is the single
    /// enforcement point for email uniqueness; a violating insert comes back
    /// as `RepoError::UniqueViolation`.
    async fn create_user(&self, email: &str, hash: &str) -> Result<UserRecord, RepoError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (email, hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(hash)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::from)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from)
    }

    /// update_user
    ///
    /// Uses `COALESCE` to apply only the fields present in the patch, in one
    /// statement. Email and id are deliberately absent from the SET list.
    async fn update_user(
        &self,
        id: i64,
        req: EditUserRequest,
    ) -> Result<Option<UserRecord>, RepoError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(req.first_name)
        .bind(req.last_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from)
    }

    /// create_bookmark
    ///
    /// Persists a new bookmark with `user_id` taken from the authenticated
    /// session, never from the payload.
    async fn create_bookmark(
        &self,
        user_id: i64,
        req: CreateBookmarkRequest,
    ) -> Result<Bookmark, RepoError> {
        sqlx::query_as::<_, Bookmark>(&format!(
            "INSERT INTO bookmarks (user_id, title, link, description) \
             VALUES ($1, $2, $3, $4) RETURNING {BOOKMARK_COLUMNS}"
        ))
        .bind(user_id)
        .bind(req.title)
        .bind(req.link)
        .bind(req.description)
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from)
    }

    /// get_bookmarks
    ///
    /// Retrieves all bookmarks owned by `user_id`, in insertion order.
    async fn get_bookmarks(&self, user_id: i64) -> Result<Vec<Bookmark>, RepoError> {
        sqlx::query_as::<_, Bookmark>(&format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from)
    }

    /// get_bookmark
    ///
    /// The ownership check is part of the WHERE clause, so a bookmark owned
    /// by another user is indistinguishable from one that does not exist.
    async fn get_bookmark(&self, user_id: i64, id: i64) -> Result<Option<Bookmark>, RepoError> {
        sqlx::query_as::<_, Bookmark>(&format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from)
    }

    /// update_bookmark
    ///
    /// Single conditional statement: the ownership check and the write are
    /// one atomic `UPDATE ... WHERE id AND user_id`, so no other request can
    /// slip between a read and a write. `COALESCE` applies only the supplied
    /// patch fields.
    async fn update_bookmark(
        &self,
        user_id: i64,
        id: i64,
        req: EditBookmarkRequest,
    ) -> Result<Option<Bookmark>, RepoError> {
        sqlx::query_as::<_, Bookmark>(&format!(
            r#"
            UPDATE bookmarks
            SET title = COALESCE($3, title),
                link = COALESCE($4, link),
                description = COALESCE($5, description),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {BOOKMARK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(req.title)
        .bind(req.link)
        .bind(req.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from)
    }

    /// delete_bookmark
    ///
    /// Same atomic ownership condition as update; the affected-row count is
    /// the authorization result.
    async fn delete_bookmark(&self, user_id: i64, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(RepoError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
