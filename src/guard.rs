//! Write-request gate. Every mutating route takes an [`AuthUser`] argument,
//! so verification runs before any handler body and the caller identity is
//! threaded into domain calls as an explicit value.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{error::AppError, state::AppState, tokens};

/// Verified caller identity.
///
/// A missing, non-Bearer or unparseable `Authorization` header is treated
/// exactly like an invalid token: the request fails closed with 401, never
/// an anonymous fallback.
pub struct AuthUser {
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::InvalidToken)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AppError::InvalidToken)?;

        let user_id = tokens::verify(token, &state.config.jwt_secret)?;

        Ok(AuthUser { user_id })
    }
}
