//! Route table for the relationship API

use crate::relations::handlers::{
    attach_category, create_post, create_user, delete_post, delete_user, detach_category,
    get_post, get_user, list_posts, replace_categories, update_post, update_profile, AppState,
};
use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

/// Name reported by the health endpoints
pub const SERVICE_NAME: &str = "relate-rs";

/// Build the user, post and category routes
///
/// - POST   /users                                   - Create a user with its profile
/// - GET    /users/{id}                              - Get a user with its profile
/// - DELETE /users/{id}                              - Delete a user and its profile
/// - PUT    /users/{id}/profile                      - Update the profile of a user
/// - POST   /users/{id}/posts                        - Create a post for a user
/// - GET    /users/{id}/posts                        - List the posts of a user
/// - GET    /posts/{id}                              - Get a post with its categories
/// - PUT    /posts/{id}                              - Update a post
/// - DELETE /posts/{id}                              - Delete a post
/// - POST   /posts/{id}/categories                   - Attach a category by name
/// - PUT    /posts/{id}/categories                   - Attach and detach category ids
/// - DELETE /posts/{id}/categories/{category_id}     - Detach one category
pub fn build_relation_routes(state: AppState) -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/users/{id}/profile", put(update_profile))
        .route("/users/{id}/posts", post(create_post).get(list_posts))
        .route("/posts/{id}", get(get_post).put(update_post).delete(delete_post))
        .route(
            "/posts/{id}/categories",
            post(attach_category).put(replace_categories),
        )
        .route(
            "/posts/{id}/categories/{category_id}",
            delete(detach_category),
        )
        .with_state(state)
}

/// Build health check routes
pub fn build_health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}
