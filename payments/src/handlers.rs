use axum::{
    Json,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
};
use scoring::model::{Assessment, ScoringRequest};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::{
    auth::CurrentUser,
    error::ApiError,
    executable_utils::AppState,
    model::{
        MetricsOut, ModelId, OrderCreate, OrderOut, PaymentCreate, PaymentOut, TokenOut,
        UserCreate, UserLogin, UserOut, Validate,
    },
};

/// `Json` whose rejections are reported as `ApiError`.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserCreate>,
) -> Result<Json<UserOut>, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    if state.storage.find_user_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }

    let password_hash = state.auth.hash_password(&payload.password).await?;
    let user = state
        .storage
        .insert_user(&payload.email, &password_hash)
        .await?;

    info!(user_id = user.id, "Registered user");
    Ok(Json(user.into()))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(creds): ApiJson<UserLogin>,
) -> Result<Json<TokenOut>, ApiError> {
    creds.validate().map_err(ApiError::Validation)?;

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());
    let user = state
        .storage
        .find_user_by_email(&creds.email)
        .await?
        .ok_or_else(invalid)?;

    if !state
        .auth
        .verify_password(&creds.password, &user.password_hash)
        .await?
    {
        warn!(user_id = user.id, "Rejected login with wrong password");
        return Err(invalid());
    }

    let token = state.auth.issue_token(user.id)?;
    Ok(Json(TokenOut::bearer(token)))
}

pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<OrderCreate>,
) -> Result<Json<OrderOut>, ApiError> {
    let details = state.storage.insert_order(user.id, &payload).await?;
    info!(
        order_id = details.order.id,
        user_id = user.id,
        total_amount = details.order.total_amount,
        "Created order"
    );
    Ok(Json(details.order))
}

pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<ModelId>,
) -> Result<Json<OrderOut>, ApiError> {
    let details = owned_order(&state, order_id, user.id).await?;
    Ok(Json(details))
}

pub async fn create_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<PaymentCreate>,
) -> Result<Json<PaymentOut>, ApiError> {
    owned_order(&state, payload.order_id, user.id).await?;

    let payment = state.storage.insert_payment(&payload).await?;
    info!(
        payment_id = payment.id,
        order_id = payment.order_id,
        amount = payment.amount,
        "Recorded payment"
    );
    Ok(Json(payment))
}

pub async fn score_fraud(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    ApiJson(request): ApiJson<ScoringRequest>,
) -> Result<Json<Assessment>, ApiError> {
    let assessment = state.processor.score(&request).await?;
    Ok(Json(assessment))
}

pub async fn metrics_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MetricsOut>, ApiError> {
    Ok(Json(state.storage.metrics_summary(user.id).await?))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}

/// Orders of other users are reported as missing.
async fn owned_order(
    state: &AppState,
    order_id: ModelId,
    user_id: ModelId,
) -> Result<OrderOut, ApiError> {
    match state.storage.get_order_details(order_id).await? {
        Some(details) if details.owner_id == user_id => Ok(details.order),
        _ => Err(ApiError::NotFound("Order not found".to_string())),
    }
}
