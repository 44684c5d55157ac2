use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use linkstash::{
    AppState,
    auth::{AuthService, Claims, PasswordHasher, TokenIssuer},
    config::AppConfig,
    create_router,
    errors::RepoError,
    models::{
        Bookmark, CreateBookmarkRequest, EditBookmarkRequest, EditUserRequest, UserRecord,
    },
    repository::{Repository, RepositoryState},
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

// --- In-Memory Repository ---

// A complete Repository implementation over process memory. The trait seam
// exists exactly so the HTTP surface can be exercised end-to-end without a
// database; the semantics (email uniqueness, owner-scoped conditional
// updates) mirror the SQL implementation.
#[derive(Default)]
struct InMemoryRepository {
    store: Mutex<Store>,
}

#[derive(Default)]
struct Store {
    users: Vec<UserRecord>,
    bookmarks: Vec<Bookmark>,
    next_user_id: i64,
    next_bookmark_id: i64,
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, email: &str, hash: &str) -> Result<UserRecord, RepoError> {
        let mut store = self.store.lock().unwrap();
        if store.users.iter().any(|u| u.email == email) {
            return Err(RepoError::UniqueViolation);
        }
        store.next_user_id += 1;
        let now = Utc::now();
        let user = UserRecord {
            id: store.next_user_id,
            created_at: now,
            updated_at: now,
            email: email.to_string(),
            hash: hash.to_string(),
            first_name: None,
            last_name: None,
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_user(
        &self,
        id: i64,
        req: EditUserRequest,
    ) -> Result<Option<UserRecord>, RepoError> {
        let mut store = self.store.lock().unwrap();
        let Some(user) = store.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(first_name) = req.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = req.last_name {
            user.last_name = Some(last_name);
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn create_bookmark(
        &self,
        user_id: i64,
        req: CreateBookmarkRequest,
    ) -> Result<Bookmark, RepoError> {
        let mut store = self.store.lock().unwrap();
        store.next_bookmark_id += 1;
        let now = Utc::now();
        let bookmark = Bookmark {
            id: store.next_bookmark_id,
            user_id,
            title: req.title,
            link: req.link,
            description: req.description,
            created_at: now,
            updated_at: now,
        };
        store.bookmarks.push(bookmark.clone());
        Ok(bookmark)
    }

    async fn get_bookmarks(&self, user_id: i64) -> Result<Vec<Bookmark>, RepoError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .bookmarks
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_bookmark(&self, user_id: i64, id: i64) -> Result<Option<Bookmark>, RepoError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .bookmarks
            .iter()
            .find(|b| b.id == id && b.user_id == user_id)
            .cloned())
    }

    async fn update_bookmark(
        &self,
        user_id: i64,
        id: i64,
        req: EditBookmarkRequest,
    ) -> Result<Option<Bookmark>, RepoError> {
        let mut store = self.store.lock().unwrap();
        let Some(bookmark) = store
            .bookmarks
            .iter_mut()
            .find(|b| b.id == id && b.user_id == user_id)
        else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            bookmark.title = title;
        }
        if let Some(link) = req.link {
            bookmark.link = link;
        }
        if let Some(description) = req.description {
            bookmark.description = Some(description);
        }
        bookmark.updated_at = Utc::now();
        Ok(Some(bookmark.clone()))
    }

    async fn delete_bookmark(&self, user_id: i64, id: i64) -> Result<bool, RepoError> {
        let mut store = self.store.lock().unwrap();
        let before = store.bookmarks.len();
        store
            .bookmarks
            .retain(|b| !(b.id == id && b.user_id == user_id));
        Ok(store.bookmarks.len() < before)
    }
}

// --- Test App Setup ---

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

async fn spawn_app() -> TestApp {
    let config = AppConfig::default();

    let repo = Arc::new(InMemoryRepository::default()) as RepositoryState;
    let auth = Arc::new(AuthService::new(
        repo.clone(),
        PasswordHasher::new(),
        TokenIssuer::new(&config.jwt_secret),
    ));

    let state = AppState { repo, auth, config };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

async fn signup(app: &TestApp, client: &reqwest::Client, email: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/signup", app.address))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("signup request failed");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    body["access_token"].as_str().unwrap().to_string()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_signup_signin_bookmark_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Signup
    let _ = signup(&app, &client, "a@x.com", "pw1").await;

    // Signin
    let response = client
        .post(format!("{}/auth/signin", app.address))
        .json(&json!({ "email": "a@x.com", "password": "pw1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let token = body["access_token"].as_str().unwrap().to_string();

    // Create
    let response = client
        .post(format!("{}/bookmarks", app.address))
        .bearer_auth(&token)
        .json(&json!({ "title": "T", "link": "https://x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["title"], "T");
    assert_eq!(created["link"], "https://x.com");
    let id = created["id"].as_i64().unwrap();

    // List
    let response = client
        .get(format!("{}/bookmarks", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let listed: Value = response.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Get by id round-trips the created fields
    let response = client
        .get(format!("{}/bookmarks/{}", app.address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let fetched: Value = response.json().await.unwrap();
    assert_eq!(fetched["title"], "T");
    assert_eq!(fetched["link"], "https://x.com");
    assert!(fetched["description"].is_null());

    // Patch changes only the patched field
    let response = client
        .patch(format!("{}/bookmarks/{}", app.address, id))
        .bearer_auth(&token)
        .json(&json!({ "description": "notes" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let patched: Value = response.json().await.unwrap();
    assert_eq!(patched["description"], "notes");
    assert_eq!(patched["title"], "T");

    let response = client
        .get(format!("{}/bookmarks/{}", app.address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let refetched: Value = response.json().await.unwrap();
    assert_eq!(refetched["description"], "notes");
    assert_eq!(refetched["title"], "T");

    // Delete, then the same id resolves to null
    let response = client
        .delete(format!("{}/bookmarks/{}", app.address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/bookmarks/{}", app.address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let gone: Value = response.json().await.unwrap();
    assert!(gone.is_null());
}

#[tokio::test]
async fn test_duplicate_signup_is_rejected_without_side_effects() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let _ = signup(&app, &client, "a@x.com", "pw1").await;

    // Second signup with the same email, different password.
    let response = client
        .post(format!("{}/auth/signup", app.address))
        .json(&json!({ "email": "a@x.com", "password": "other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Credentials taken");

    // The original account is untouched: its password still works, the
    // attempted one does not.
    let response = client
        .post(format!("{}/auth/signin", app.address))
        .json(&json!({ "email": "a@x.com", "password": "pw1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .post(format!("{}/auth/signin", app.address))
        .json(&json!({ "email": "a@x.com", "password": "other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_signup_validation_failures() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Email without an '@'.
    let response = client
        .post(format!("{}/auth/signup", app.address))
        .json(&json!({ "email": "smstahir1gmail.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Empty password.
    let response = client
        .post(format!("{}/auth/signup", app.address))
        .json(&json!({ "email": "a@x.com", "password": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_signin_failures_are_indistinguishable() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let _ = signup(&app, &client, "a@x.com", "pw1").await;

    // Existing email, wrong password.
    let wrong_password = client
        .post(format!("{}/auth/signin", app.address))
        .json(&json!({ "email": "a@x.com", "password": "nope" }))
        .send()
        .await
        .unwrap();
    // Unknown email.
    let unknown_email = client
        .post(format!("{}/auth/signin", app.address))
        .json(&json!({ "email": "b@x.com", "password": "pw1" }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), 403);
    assert_eq!(unknown_email.status(), 403);
    // Same status and same body shape for both failure modes.
    let body_a = wrong_password.text().await.unwrap();
    let body_b = unknown_email.text().await.unwrap();
    assert_eq!(body_a, body_b);
}

#[tokio::test]
async fn test_profile_edit_and_projection() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let token = signup(&app, &client, "a@x.com", "pw1").await;

    let response = client
        .patch(format!("{}/users", app.address))
        .bearer_auth(&token)
        .json(&json!({ "first_name": "Shah", "last_name": "Tahir" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["first_name"], "Shah");
    assert_eq!(body["last_name"], "Tahir");
    assert_eq!(body["email"], "a@x.com");
    assert!(body.get("hash").is_none());

    // A sparse patch leaves the other field alone.
    let response = client
        .patch(format!("{}/users", app.address))
        .bearer_auth(&token)
        .json(&json!({ "first_name": "Sam" }))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["first_name"], "Sam");
    assert_eq!(body["last_name"], "Tahir");

    let response = client
        .get(format!("{}/users/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let me: Value = response.json().await.unwrap();
    assert_eq!(me["first_name"], "Sam");
    assert!(me.get("hash").is_none());
}

#[tokio::test]
async fn test_bookmarks_are_invisible_across_users() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let token_a = signup(&app, &client, "a@x.com", "pw1").await;
    let token_b = signup(&app, &client, "b@x.com", "pw2").await;

    let response = client
        .post(format!("{}/bookmarks", app.address))
        .bearer_auth(&token_a)
        .json(&json!({ "title": "A's bookmark", "link": "https://a.example" }))
        .send()
        .await
        .unwrap();
    let created: Value = response.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    // B's list is empty.
    let response = client
        .get(format!("{}/bookmarks", app.address))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    let listed: Value = response.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 0);

    // B's get resolves to null, exactly like a missing row.
    let response = client
        .get(format!("{}/bookmarks/{}", app.address, id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let fetched: Value = response.json().await.unwrap();
    assert!(fetched.is_null());

    // B's edit and delete are denied.
    let response = client
        .patch(format!("{}/bookmarks/{}", app.address, id))
        .bearer_auth(&token_b)
        .json(&json!({ "title": "stolen" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = client
        .delete(format!("{}/bookmarks/{}", app.address, id))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // A still owns an intact bookmark.
    let response = client
        .get(format!("{}/bookmarks/{}", app.address, id))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    let mine: Value = response.json().await.unwrap();
    assert_eq!(mine["title"], "A's bookmark");
}

#[tokio::test]
async fn test_protected_routes_reject_unauthenticated_requests() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let token = signup(&app, &client, "a@x.com", "pw1").await;

    // No Authorization header.
    let response = client
        .get(format!("{}/users/me", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Malformed token. The attempted write must not mutate anything.
    let response = client
        .post(format!("{}/bookmarks", app.address))
        .bearer_auth("invalid_token")
        .json(&json!({ "title": "T", "link": "https://x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Expired token, signed with the correct secret.
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: 1,
        email: "a@x.com".to_string(),
        iat: (now - 7200) as usize,
        exp: (now - 3600) as usize,
    };
    let key = EncodingKey::from_secret(AppConfig::default().jwt_secret.as_bytes());
    let expired = encode(&Header::default(), &claims, &key).unwrap();

    let response = client
        .get(format!("{}/bookmarks", app.address))
        .bearer_auth(&expired)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // The rejected create above left no row behind.
    let response = client
        .get(format!("{}/bookmarks", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let listed: Value = response.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_bookmark_validation_failures() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let token = signup(&app, &client, "a@x.com", "pw1").await;

    let response = client
        .post(format!("{}/bookmarks", app.address))
        .bearer_auth(&token)
        .json(&json!({ "title": "", "link": "https://x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .post(format!("{}/bookmarks", app.address))
        .bearer_auth(&token)
        .json(&json!({ "title": "T", "link": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // An empty description is still a valid create.
    let response = client
        .post(format!("{}/bookmarks", app.address))
        .bearer_auth(&token)
        .json(&json!({ "title": "T", "link": "https://x.com", "description": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
}
