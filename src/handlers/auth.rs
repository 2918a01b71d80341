use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::api::{json_rejection_to_response, service_error_to_response, ApiError};
use crate::models::{
    AuthCheckResponse, CredentialsRequest, LoginResponse, ServiceError, SignupResponse,
    UserResponse,
};
use crate::services::AuthService;

/// Auth state containing the account service
#[derive(Clone)]
pub struct AuthState {
    pub auth_service: Arc<AuthService>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthCheckQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Create a new account
#[instrument(name = "signup", skip(state, payload))]
pub async fn signup(
    State(state): State<AuthState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;

    match state.auth_service.signup(request).await {
        Ok(user) => {
            info!(user_id = user.id, "User signed up");
            Ok((
                StatusCode::CREATED,
                Json(SignupResponse {
                    message: "User created successfully".to_string(),
                    user_id: user.id,
                }),
            ))
        }
        Err(err) => {
            warn!("Signup rejected: {}", err);
            Err(service_error_to_response(err, "Error creating user"))
        }
    }
}

/// Verify credentials and return the user descriptor
#[instrument(name = "login", skip(state, payload))]
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;

    match state.auth_service.login(request).await {
        Ok(user) => {
            info!(user_id = user.id, "User logged in");
            Ok(Json(LoginResponse {
                message: "Login successful".to_string(),
                user: UserResponse::from(&user),
            }))
        }
        Err(err) => {
            warn!("Login rejected: {}", err);
            Err(service_error_to_response(err, "Error during login"))
        }
    }
}

/// Report whether `userId` names an existing account. Unknown or missing
/// ids answer 401 with `{ "authenticated": false }`.
#[instrument(name = "check_auth", skip(state))]
pub async fn check_auth(
    State(state): State<AuthState>,
    Query(query): Query<AuthCheckQuery>,
) -> Response {
    match state.auth_service.check(query.user_id.as_deref()).await {
        Ok(user) => {
            Json(AuthCheckResponse::authenticated(UserResponse::from(&user))).into_response()
        }
        Err(ServiceError::Unauthenticated) => {
            (StatusCode::UNAUTHORIZED, Json(AuthCheckResponse::anonymous())).into_response()
        }
        Err(err) => {
            service_error_to_response(err, "Error checking authentication").into_response()
        }
    }
}
