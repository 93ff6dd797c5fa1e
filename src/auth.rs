//! Signup and login. Passwords are bcrypt-hashed off the async runtime;
//! login answers with the user id and a fresh bearer token.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use bcrypt::DEFAULT_COST;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::task;
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, state::AppState, tokens};

/// Stored identity record. The password hash never leaves the server.
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if credentials.email.is_empty() || credentials.password.is_empty() {
        return Err(AppError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        email: credentials.email,
        password_hash: hash_password(credentials.password).await?,
    };

    state.store.insert_user(&user).await?;
    info!("registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(json!({ "message": "user created" }))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Session>, AppError> {
    let user = state
        .store
        .find_user(&credentials.email)
        .await?
        .ok_or(AppError::UnknownEmail)?;

    if !verify_password(credentials.password, user.password_hash.clone()).await? {
        return Err(AppError::BadCredential);
    }

    let token = tokens::issue(&user.id, &state.config.jwt_secret)?;

    Ok(Json(Session {
        user_id: user.id,
        token,
    }))
}

async fn hash_password(password: String) -> Result<String, AppError> {
    task::spawn_blocking(move || bcrypt::hash(password, DEFAULT_COST))
        .await
        .map_err(|_| AppError::Hashing)?
        .map_err(|_| AppError::Hashing)
}

async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|_| AppError::Hashing)?
        .map_err(|_| AppError::Hashing)
}
