use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, GoogleLoginRequest, LoginRequest, PublicUser, RegisterRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        repo_types::User,
        services::{authenticate_local, register_local, resolve_external_user},
    },
    error::AppError,
    state::AppState,
    validation::Validated,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/google", post(google_login))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

fn issue(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let token = JwtKeys::from_ref(state).sign(&user.id)?;
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

#[instrument(skip(state, req))]
pub async fn google_login(
    State(state): State<AppState>,
    Validated(req): Validated<GoogleLoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let Some(verifier) = state.verifier.clone() else {
        warn!("google sign-in requested but no client id is configured");
        return Err(AppError::ServiceUnavailable(
            "Google sign-in temporarily unavailable".into(),
        ));
    };

    let identity = verifier.verify(&req.body.id_token).await.map_err(|e| {
        warn!(error = %e, "google token verification failed");
        AppError::Unauthorized("Google sign-in failed".into())
    })?;

    let user = resolve_external_user(state.users.as_ref(), identity).await?;
    info!(user_id = %user.id, "user signed in with google");
    Ok(Json(issue(&state, user)?))
}

#[instrument(skip(state, req))]
pub async fn register(
    State(state): State<AppState>,
    Validated(req): Validated<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let body = req.body;
    let user = register_local(state.users.as_ref(), &body.name, &body.email, &body.password)
        .await
        .map_err(|e| {
            if matches!(e, AppError::Conflict(_)) {
                warn!("registration for an existing email");
            }
            e
        })?;
    Ok((StatusCode::CREATED, Json(issue(&state, user)?)))
}

#[instrument(skip(state, req))]
pub async fn login(
    State(state): State<AppState>,
    Validated(req): Validated<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = authenticate_local(state.users.as_ref(), &req.body.email, &req.body.password)
        .await
        .map_err(|e| {
            if matches!(e, AppError::Unauthorized(_)) {
                warn!("login with invalid credentials");
            }
            e
        })?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue(&state, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.users.find_by_id(&user_id).await?.ok_or_else(|| {
        warn!(%user_id, "token for unknown user");
        AppError::Unauthorized("User not found".into())
    })?;
    Ok(Json(user.into()))
}
