//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness check
//! GET    /health/ready                - Readiness check (pings the store)
//!
//! # Admins
//! GET    /api/admins                  - Paged admin listing (?limit=&page=)
//! POST   /api/admins                  - Create admin
//! GET    /api/admins/{id}             - Admin detail
//! PUT    /api/admins/{id}             - Rename admin
//! DELETE /api/admins/{id}             - Delete admin (refused while linked)
//! PUT    /api/admins/{id}/permissions - Replace permissions
//! PUT    /api/admins/{id}/groups      - Replace groups
//! PUT    /api/admins/{id}/user        - Link a user by username
//! DELETE /api/admins/{id}/user        - Unlink the user
//! ```

pub mod admins;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router with state attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api", admins::router())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::db::{InMemoryAccountStore, StoreOp};

    fn app(store: Arc<InMemoryAccountStore>) -> Router {
        router(AppState::new(store))
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(Arc::new(InMemoryAccountStore::new()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_follows_store_ping() {
        let store = Arc::new(InMemoryAccountStore::new());

        let response = app(Arc::clone(&store))
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        store.fail_next(StoreOp::Ping);
        let response = app(store)
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
