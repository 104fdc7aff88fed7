//! Clinician account endpoints.
//!
//! - `POST /api/login`: check a user id / password pair
//! - `GET /api/users/:user_id`: public view of one account

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::UserView;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

/// `POST /api/login`: unknown user and wrong password are indistinguishable.
pub async fn login(
    State(ctx): State<ApiContext>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<UserView>, ApiError> {
    let Json(request) = payload?;
    let user_id = request.user_id.trim();

    let user = ctx.users.get_user(user_id)?;
    match user {
        Some(user) if user.credential.verify(&request.password) => {
            tracing::info!(user_id, role = %user.role, "Login succeeded");
            Ok(Json(UserView::from(&user)))
        }
        _ => {
            tracing::warn!(user_id, "Login failed");
            Err(ApiError::Unauthorized)
        }
    }
}

/// `GET /api/users/:user_id`
pub async fn get_user(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    let user = ctx
        .users
        .get_user(&user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(UserView::from(&user)))
}
