use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::AuthUser,
        repo_types::User,
        services::{hash_password, is_valid_email, is_valid_username, verify_password, JwtKeys},
    },
    state::AppState,
};

type ApiError = (StatusCode, String);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn internal(context: &str, e: anyhow::Error) -> ApiError {
    error!(error = %e, "{context} failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
}

fn issue_tokens(state: &AppState, user: &User) -> Result<AuthResponse, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys
        .sign_access(user.id)
        .map_err(|e| internal("jwt sign access", e))?;
    let refresh_token = keys
        .sign_refresh(user.id)
        .map_err(|e| internal("jwt sign refresh", e))?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }
    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err((StatusCode::BAD_REQUEST, "Invalid username".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    if let Ok(Some(_)) = User::find_by_email(&state.db, &payload.email).await {
        warn!(email = %payload.email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }
    if let Ok(true) = User::username_taken(&state.db, &payload.username).await {
        warn!(username = %payload.username, "username taken");
        return Err((StatusCode::CONFLICT, "Username already taken".into()));
    }

    let hash = hash_password(&payload.password).map_err(|e| internal("hash_password", e))?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash)
        .await
        .map_err(|e| internal("create user", e))?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(Json(issue_tokens(&state, &user)?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => return Err(internal("find_by_email", e)),
    };

    let ok = verify_password(&payload.password, &user.password_hash)
        .map_err(|e| internal("verify_password", e))?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_tokens(&state, &user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = match User::find_by_id(&state.db, claims.sub).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err((StatusCode::UNAUTHORIZED, "User not found".into())),
        Err(e) => return Err(internal("find_by_id", e)),
    };
    Ok(Json(issue_tokens(&state, &user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    match User::find_by_id(&state.db, user_id).await {
        Ok(Some(user)) => Ok(Json(PublicUser::from(&user))),
        Ok(None) => {
            warn!(%user_id, "user not found");
            Err((StatusCode::UNAUTHORIZED, "User not found".into()))
        }
        Err(e) => Err(internal("find_by_id", e)),
    }
}

#[cfg(test)]
mod me_tests {
    use super::*;

    #[test]
    fn public_user_hides_password_hash() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            username: "jane".into(),
            email: "jane@example.com".into(),
            password_hash: "secret-hash".into(),
            can_manage_ingredients: true,
            notification_language: "en".into(),
            created_at: time::OffsetDateTime::now_utc(),
        };

        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(json.contains("jane@example.com"));
        assert!(json.contains("\"can_manage_ingredients\":true"));
        assert!(!json.contains("secret-hash"));
    }
}
