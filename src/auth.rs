use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as Argon2PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    errors::{ApiError, RepoError},
    models::{AuthRequest, TokenResponse, User},
    repository::RepositoryState,
};

/// Access tokens are valid for a fixed fifteen minutes from issuance. There
/// is no server-side session and no revocation list: signature and expiry
/// fully determine validity.
pub const TOKEN_TTL_MINUTES: i64 = 15;

/// Claims
///
/// The payload structure carried inside every access token. Signed with the
/// server secret and validated on each authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the numeric id of the user, used to resolve the account
    /// row on every protected request.
    pub sub: i64,
    /// The email the token was issued for. Must still match the account row
    /// at verification time.
    pub email: String,
    /// Issued At (iat): timestamp when the token was created.
    pub iat: usize,
    /// Expiration Time (exp): timestamp after which the token must not be
    /// accepted.
    pub exp: usize,
}

/// PasswordHasher
///
/// Wraps Argon2 with default parameters and a fresh random salt per hash, so
/// equal plaintexts never produce equal hashes. Plaintext passwords exist
/// only as arguments here; they are never stored or logged.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    /// Produces an opaque PHC-format hash string for storage.
    pub fn hash(&self, password: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(ApiError::internal)
    }

    /// Verifies a plaintext candidate against a stored hash. A malformed
    /// stored hash fails closed: the answer is `false`, never a panic or an
    /// ambiguous success.
    pub fn verify(&self, hash: &str, password: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// TokenIssuer
///
/// Creates and validates the signed bearer tokens. HS256 with a single
/// process-wide secret taken from configuration; the keys are derived once at
/// construction.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a claim set binding the user id and email, expiring
    /// [`TOKEN_TTL_MINUTES`] from now.
    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::minutes(TOKEN_TTL_MINUTES)).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(ApiError::internal)
    }

    /// Validates signature and expiry. Every failure mode (bad signature,
    /// malformed token, expired) collapses into `Unauthenticated`; the caller
    /// never learns which check failed.
    pub fn decode(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();

        // Ensure expiration time validation is always active.
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthenticated)
    }
}

/// AuthService
///
/// Orchestrates signup and signin, and resolves bearer tokens for the guard.
/// Collaborators (store handle, hasher, token issuer) arrive through the
/// constructor; the service holds no mutable state of its own.
pub struct AuthService {
    repo: RepositoryState,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

/// AuthState
///
/// The shareable handle placed in the application state.
pub type AuthState = Arc<AuthService>;

impl AuthService {
    pub fn new(repo: RepositoryState, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            repo,
            hasher,
            tokens,
        }
    }

    /// signup
    ///
    /// Hash the password, insert the identity row, issue a token. An email
    /// collision becomes `CredentialsTaken` and issues nothing; any other
    /// store failure propagates as a server error.
    pub async fn signup(&self, req: AuthRequest) -> Result<TokenResponse, ApiError> {
        let hash = self.hasher.hash(&req.password)?;
        let user = match self.repo.create_user(&req.email, &hash).await {
            Ok(user) => user,
            Err(RepoError::UniqueViolation) => return Err(ApiError::CredentialsTaken),
            Err(err) => return Err(err.into()),
        };
        self.sign_token(user.id, &user.email)
    }

    /// signin
    ///
    /// Unknown email and wrong password produce the same `CredentialsInvalid`
    /// condition, so the response cannot reveal which accounts exist.
    pub async fn signin(&self, req: AuthRequest) -> Result<TokenResponse, ApiError> {
        let user = self
            .repo
            .get_user_by_email(&req.email)
            .await?
            .ok_or(ApiError::CredentialsInvalid)?;
        if !self.hasher.verify(&user.hash, &req.password) {
            return Err(ApiError::CredentialsInvalid);
        }
        self.sign_token(user.id, &user.email)
    }

    fn sign_token(&self, user_id: i64, email: &str) -> Result<TokenResponse, ApiError> {
        Ok(TokenResponse {
            access_token: self.tokens.issue(user_id, email)?,
        })
    }

    /// resolve_bearer
    ///
    /// The guard core: validate the token, then resolve the subject to a live
    /// account row. A token whose subject was deleted, or whose email no
    /// longer matches the row, is rejected exactly like an invalid token.
    /// Returns the hash-free projection for the request context.
    pub async fn resolve_bearer(&self, token: &str) -> Result<User, ApiError> {
        let claims = self.tokens.decode(token)?;
        let user = self
            .repo
            .get_user_by_id(claims.sub)
            .await?
            .ok_or(ApiError::Unauthenticated)?;
        if user.email != claims.email {
            return Err(ApiError::Unauthenticated);
        }
        Ok(User::from(user))
    }
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request: the account row with
/// the hash stripped. Handlers take this as an argument and use `user.id` as
/// the scope for every owner-checked operation.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any protected handler. The flow:
/// 1. Dependency Resolution: pull the auth service from the application state.
/// 2. Token Extraction: `Authorization` header, `Bearer <token>` form.
/// 3. Verification & Lookup: signature, expiry, and subject resolution.
///
/// Rejection: 401 Unauthorized on any failure, before the handler runs.
impl<S> FromRequestParts<S> for AuthUser
where
    // S must allow sending across threads and sharing.
    S: Send + Sync,
    // Allows the extractor to pull the auth service from the app state.
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated)?;

        let user = auth.resolve_bearer(token).await?;

        Ok(AuthUser { user })
    }
}
