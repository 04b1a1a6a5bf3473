use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use common::config::AuthConfig;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    entities::user,
    error::ApiError,
    executable_utils::AppState,
    model::ModelId,
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("token encoding failed: {0}")]
    TokenEncoding(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("blocking task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// Password hashing and HS256 access tokens.
#[derive(Clone)]
pub struct Authenticator {
    secret: String,
    ttl_minutes: i64,
    bcrypt_cost: u32,
}

impl Authenticator {
    pub fn new(secret: impl Into<String>, ttl_minutes: i64, bcrypt_cost: u32) -> Self {
        Self {
            secret: secret.into(),
            ttl_minutes,
            bcrypt_cost,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.token_ttl_minutes,
            config.bcrypt_cost,
        )
    }

    // bcrypt is CPU bound, keep it off the runtime threads.
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hash)
    }

    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hash = hash.to_string();
        let matches =
            tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        Ok(matches)
    }

    pub fn issue_token(&self, user_id: ModelId) -> Result<String, AuthError> {
        let expires_at = Utc::now() + Duration::minutes(self.ttl_minutes);
        let claims = Claims {
            sub: user_id.to_string(),
            exp: expires_at.timestamp().max(0) as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenEncoding(e.to_string()))
    }

    /// Returns the user id carried in `sub` of a valid, unexpired token.
    pub fn verify_token(&self, token: &str) -> Result<ModelId, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        data.claims
            .sub
            .parse::<ModelId>()
            .map_err(|e| AuthError::InvalidToken(format!("bad subject: {}", e)))
    }
}

/// The user owning the bearer token of the request.
pub struct CurrentUser(pub user::Model);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

        let user_id = state.auth.verify_token(token)?;
        let user = state
            .storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

        Ok(CurrentUser(user))
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}
