use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::errors::ApiError;

// --- Core Application Schemas (Mapped to Database) ---

/// UserRecord
///
/// The raw `users` row, including the Argon2 password hash. This type never
/// implements `Serialize` and never crosses the service boundary: anything
/// leaving the application is first projected into [`User`].
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    // Opaque PHC-format password hash. Compared via the hasher only.
    pub hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// User
///
/// The outward user projection. Constructed from a [`UserRecord`]; the hash
/// field does not exist here, so it cannot leak through serialization.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
        }
    }
}

/// Bookmark
///
/// A bookmark record from the `bookmarks` table. Every bookmark belongs to
/// exactly one user (`user_id`), and all repository queries are scoped to the
/// owner.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Bookmark {
    pub id: i64,
    // FK to users.id (Owner).
    pub user_id: i64,
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// --- Request Payloads (Input Schemas) ---

/// AuthRequest
///
/// Input payload shared by signup (POST /auth/signup) and signin
/// (POST /auth/signin). The password only ever passes through the hasher;
/// it is never persisted or logged in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

impl AuthRequest {
    /// Rejects malformed credentials before any service logic runs.
    pub fn validate(&self) -> Result<(), ApiError> {
        if !is_well_formed_email(&self.email) {
            return Err(ApiError::Validation(
                "email must be a well-formed address".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(ApiError::Validation(
                "password must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// EditUserRequest
///
/// Sparse profile patch for the authenticated user (PATCH /users). Only the
/// supplied fields are updated; id and email are not alterable via this path.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct EditUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// CreateBookmarkRequest
///
/// Input payload for submitting a new bookmark (POST /bookmarks).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateBookmarkRequest {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
}

impl CreateBookmarkRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.is_empty() {
            return Err(ApiError::Validation("title must not be empty".to_string()));
        }
        if self.link.is_empty() {
            return Err(ApiError::Validation("link must not be empty".to_string()));
        }
        Ok(())
    }
}

/// EditBookmarkRequest
///
/// Partial update payload for an existing bookmark (PATCH /bookmarks/{id}).
/// Uses `Option<T>` per field so only provided fields reach the update
/// statement.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct EditBookmarkRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EditBookmarkRequest {
    /// A patch may omit title or link, but never blank them: both columns are
    /// non-empty for every persisted row.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.as_deref() == Some("") {
            return Err(ApiError::Validation("title must not be empty".to_string()));
        }
        if self.link.as_deref() == Some("") {
            return Err(ApiError::Validation("link must not be empty".to_string()));
        }
        Ok(())
    }
}

/// --- Response Schemas (Output) ---

/// TokenResponse
///
/// Output of signup and signin: the signed access token the client presents
/// on every subsequent request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Minimal shape check for email addresses: a non-empty local part, a single
/// `@`, and a dotted domain. Anything stricter belongs to the mail provider.
fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let mut parts = domain.split('.');
    parts.clone().count() >= 2 && parts.all(|part| !part.is_empty())
}
