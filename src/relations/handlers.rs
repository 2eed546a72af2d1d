//! HTTP handlers for users, profiles, posts and categories
//!
//! Handlers only translate between HTTP and the [`RelationshipManager`];
//! every cross-entity rule lives in the manager.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::error::RelateResult;
use crate::core::extractors::{Ids, JsonBody};
use crate::core::model::{NewPost, NewUser, PostChanges, nullable};
use crate::relations::changes::CategoryChanges;
use crate::relations::manager::RelationshipManager;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: RelationshipManager,
}

/// Body of `POST /users`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub bio: Option<String>,
}

/// Body of `PUT /users/{id}/profile`
///
/// An explicit `"bio": null` clears the bio; an absent member keeps it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub bio: Option<Option<String>>,
}

/// Body of `POST /posts/{id}/categories`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachCategoryRequest {
    pub name: Option<String>,
}

/// Confirmation returned by delete routes
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    fn json(message: &'static str) -> Json<Self> {
        Json(Self { message })
    }
}

/// Create a user together with its profile
///
/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> RelateResult<Response> {
    let user = NewUser {
        email: payload.email,
        name: payload.name,
    };
    let created = state
        .manager
        .create_with_profile(user, payload.bio)
        .await
        .map_err(|e| e.into_validation())?;

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// Get a user with its profile
///
/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Ids(user_id): Ids<i64>,
) -> RelateResult<Response> {
    let user = state.manager.find_user_with_profile(user_id).await?;
    Ok(Json(user).into_response())
}

/// Update the profile of a user
///
/// PUT /users/{id}/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Ids(user_id): Ids<i64>,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> RelateResult<Response> {
    let profile = state
        .manager
        .update_profile_by_user(user_id, payload.bio)
        .await?;
    Ok(Json(profile).into_response())
}

/// Delete a user and its profile
///
/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Ids(user_id): Ids<i64>,
) -> RelateResult<Response> {
    state.manager.delete_user_cascade(user_id).await?;
    Ok(MessageResponse::json("User and profile deleted").into_response())
}

/// Create a post for a user
///
/// POST /users/{id}/posts
pub async fn create_post(
    State(state): State<AppState>,
    Ids(user_id): Ids<i64>,
    JsonBody(payload): JsonBody<NewPost>,
) -> RelateResult<Response> {
    let post = state
        .manager
        .create_post_for_user(user_id, payload)
        .await
        .map_err(|e| e.into_validation())?;

    Ok((StatusCode::CREATED, Json(post)).into_response())
}

/// List the posts of a user
///
/// GET /users/{id}/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Ids(user_id): Ids<i64>,
) -> RelateResult<Response> {
    let user = state.manager.list_posts_of_user(user_id).await?;
    Ok(Json(user).into_response())
}

/// Update a post
///
/// PUT /posts/{post_id}
pub async fn update_post(
    State(state): State<AppState>,
    Ids(post_id): Ids<i64>,
    JsonBody(payload): JsonBody<PostChanges>,
) -> RelateResult<Response> {
    let post = state.manager.update_post(post_id, payload).await?;
    Ok(Json(post).into_response())
}

/// Delete a post
///
/// DELETE /posts/{post_id}
pub async fn delete_post(
    State(state): State<AppState>,
    Ids(post_id): Ids<i64>,
) -> RelateResult<Response> {
    state.manager.delete_post(post_id).await?;
    Ok(MessageResponse::json("Post deleted").into_response())
}

/// Get a post with its categories
///
/// GET /posts/{post_id}
pub async fn get_post(
    State(state): State<AppState>,
    Ids(post_id): Ids<i64>,
) -> RelateResult<Response> {
    let post = state.manager.find_post_with_categories(post_id).await?;
    Ok(Json(post).into_response())
}

/// Attach a category to a post, creating the category when needed
///
/// POST /posts/{post_id}/categories
pub async fn attach_category(
    State(state): State<AppState>,
    Ids(post_id): Ids<i64>,
    JsonBody(payload): JsonBody<AttachCategoryRequest>,
) -> RelateResult<Response> {
    let post = state
        .manager
        .attach_category_to_post(post_id, payload.name)
        .await
        .map_err(|e| e.into_validation())?;

    Ok((StatusCode::CREATED, Json(post)).into_response())
}

/// Attach and detach several categories at once
///
/// PUT /posts/{post_id}/categories
pub async fn replace_categories(
    State(state): State<AppState>,
    Ids(post_id): Ids<i64>,
    JsonBody(changes): JsonBody<CategoryChanges>,
) -> RelateResult<Response> {
    let post = state
        .manager
        .replace_post_categories(post_id, changes)
        .await?;
    Ok(Json(post).into_response())
}

/// Detach one category from a post
///
/// DELETE /posts/{post_id}/categories/{category_id}
pub async fn detach_category(
    State(state): State<AppState>,
    Ids((post_id, category_id)): Ids<(i64, i64)>,
) -> RelateResult<Response> {
    let post = state
        .manager
        .detach_category_from_post(post_id, category_id)
        .await?;
    Ok(Json(post).into_response())
}
