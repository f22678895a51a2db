//! Integration tests for Backroom.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p backroom-integration-tests
//! ```
//!
//! The tests drive the admin router in-process against an in-memory account
//! store, so no database or running server is needed.
//!
//! # Test Categories
//!
//! - `admins_api` - HTTP behavior of `/api/admins`
//! - `link_properties` - Property tests of the admin/user link invariant

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use backroom_admin::db::{AccountStore, InMemoryAccountStore};
use backroom_admin::routes;
use backroom_admin::state::AppState;
use backroom_core::{Admin, AdminId, AdminName, LinkState, User, UserId};

/// Admin id used throughout the tests.
pub const REN_ADMIN: &str = "93EP150D35";
/// User id used throughout the tests.
pub const REN_USER: &str = "535H0W35";

/// In-process admin service over an in-memory store.
pub struct TestApp {
    /// Backing store, for seeding, fault injection and call checks.
    pub store: Arc<InMemoryAccountStore>,
    router: Router,
}

/// Status and parsed body of a response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    /// JSON body, or a JSON string holding the raw text if it was not JSON.
    pub body: Value,
}

impl TestApp {
    /// Build an app with an empty store.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryAccountStore::journaled());
        let shared: Arc<dyn AccountStore> = store.clone();
        let router = routes::router(AppState::new(shared));
        Self { store, router }
    }

    /// Send a request, with an optional JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None).await
    }

    /// Store an unlinked admin named Ren Höek.
    pub async fn seed_admin(&self, id: &str) -> Admin {
        let admin = ren_admin(id);
        self.store.insert_admin(admin.clone()).await;
        admin
    }

    /// Store a user with no roles.
    pub async fn seed_user(&self, id: &str, username: &str) -> User {
        let user = User::new(UserId::new(id), username, Utc::now());
        self.store.insert_user(user.clone()).await;
        user
    }

    /// Store an admin and a user that reference each other.
    pub async fn seed_linked_pair(&self) -> (Admin, User) {
        let mut admin = ren_admin(REN_ADMIN);
        let mut user = User::new(UserId::new(REN_USER), "ren", Utc::now());
        admin.user = LinkState::linked(user.id.clone(), "ren");
        user.roles.admin = LinkState::linked(admin.id.clone(), admin.name.full());

        self.store.insert_admin(admin.clone()).await;
        self.store.insert_user(user.clone()).await;
        (admin, user)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// An unlinked admin named Ren Höek.
#[must_use]
pub fn ren_admin(id: &str) -> Admin {
    Admin::new(AdminId::new(id), AdminName::new("Ren", "", "Höek"), Utc::now())
}
