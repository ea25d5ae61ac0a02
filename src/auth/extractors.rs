use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{
    principal::Principal,
    services::{JwtKeys, TokenKind},
};
use crate::{error::AppError, state::AppState};

/// Extracts and validates the bearer access token, returning the user ID.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(AppError::Unauthorized)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Unauthorized
        })?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::Unauthorized);
        }

        Ok(AuthUser(claims.sub))
    }
}

/// The signed-in user with their role, loaded from the user store.
pub struct CurrentUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        let user = state
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(CurrentUser(Principal::from(&user)))
    }
}

/// Like `CurrentUser`, but anonymous requests get `None`. A present but
/// invalid token is still rejected.
pub struct MaybeUser(pub Option<Principal>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts
            .headers
            .contains_key(axum::http::header::AUTHORIZATION)
        {
            return Ok(MaybeUser(None));
        }
        let CurrentUser(principal) = CurrentUser::from_request_parts(parts, state).await?;
        Ok(MaybeUser(Some(principal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{user, MemoryUsers};
    use axum::http::Request;
    use std::sync::Arc;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = auth {
            builder = builder.header("authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn anonymous_request_has_no_user() {
        let state = AppState::fake();
        let MaybeUser(user) = MaybeUser::from_request_parts(&mut parts(None), &state)
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn access_token_yields_user_id() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();
        let token = JwtKeys::from_ref(&state).sign_access(user_id).unwrap();

        let AuthUser(id) =
            AuthUser::from_request_parts(&mut parts(Some(&format!("Bearer {token}"))), &state)
                .await
                .unwrap();
        assert_eq!(id, user_id);
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_refresh(Uuid::new_v4()).unwrap();
        let result =
            AuthUser::from_request_parts(&mut parts(Some(&format!("Bearer {token}"))), &state)
                .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn current_user_carries_role_from_store() {
        let users = MemoryUsers::default();
        let manager = user("root", true);
        users.add(manager.clone());
        let mut state = AppState::fake();
        state.users = Arc::new(users);
        let token = JwtKeys::from_ref(&state).sign_access(manager.id).unwrap();

        let CurrentUser(principal) =
            CurrentUser::from_request_parts(&mut parts(Some(&format!("Bearer {token}"))), &state)
                .await
                .unwrap();
        assert_eq!(principal.username, "root");
        assert!(principal.is_manager());
    }

    #[tokio::test]
    async fn token_of_deleted_user_is_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        let result =
            CurrentUser::from_request_parts(&mut parts(Some(&format!("Bearer {token}"))), &state)
                .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let state = AppState::fake();
        let result = MaybeUser::from_request_parts(&mut parts(Some("Bearer nope")), &state).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
