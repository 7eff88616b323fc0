use axum::{
    Extension, Json, Router,
    extract::{
        FromRequestParts, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::request::Parts,
    middleware,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::accounts::Accounts;
use crate::error::{ApiError, ApiErrorWithMeta, E_BAD_AMOUNT, E_BAD_REQUEST, E_UNAUTHENTICATED};
use crate::responses::{ApiOk, Pagination, RequestMeta, meta_middleware, new_meta};
use crate::types::{Balance, Dashboard, Page, Quest, RouletteOutcome, Transaction};

/// Header carrying the user ID established by the authenticating gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The application state.
#[derive(Clone)]
pub struct AppState {
    /// The ledger operations.
    pub accounts: Accounts,
}

/// The request to deposit or withdraw funds.
#[derive(Deserialize)]
pub struct AmountRequest {
    /// The amount to move.
    pub amount: Decimal,
}

/// Paging of the ledger history.
#[derive(Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// The authenticated caller.
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiErrorWithMeta;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match user_id {
            Some(user_id) => Ok(AuthUser(user_id.to_string())),
            None => {
                let meta = parts
                    .extensions
                    .get::<RequestMeta>()
                    .cloned()
                    .unwrap_or_else(new_meta);
                Err(ApiError::Unauthorized("authentication required".into())
                    .with_meta(meta)
                    .with_code(E_UNAUTHENTICATED))
            }
        }
    }
}

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/quests", get(list_quests_handler))
        .route("/api/quests/{id}/complete", post(complete_quest_handler))
        .route("/api/roulette/play", post(play_roulette_handler))
        .route("/api/wallet/deposit", post(deposit_handler))
        .route("/api/wallet/withdraw", post(withdraw_handler))
        .route("/api/wallet/history", get(history_handler))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(meta_middleware))
}

fn amount_from(
    payload: Result<Json<AmountRequest>, JsonRejection>,
    meta: &RequestMeta,
) -> Result<Decimal, ApiErrorWithMeta> {
    payload.map(|Json(req)| req.amount).map_err(|e| {
        ApiError::BadRequest(format!("invalid amount: {}", e.body_text()))
            .with_meta(meta.clone())
            .with_code(E_BAD_AMOUNT)
    })
}

async fn dashboard_handler(
    State(st): State<AppState>,
    AuthUser(user_id): AuthUser,
    Extension(meta): Extension<RequestMeta>,
) -> Result<ApiOk<Dashboard>, ApiErrorWithMeta> {
    let dashboard = st
        .accounts
        .dashboard(&user_id)
        .await
        .map_err(|e| e.with_meta(meta.clone()))?;

    Ok(ApiOk::ok("dashboard fetched", dashboard, meta))
}

async fn list_quests_handler(
    State(st): State<AppState>,
    AuthUser(user_id): AuthUser,
    Extension(meta): Extension<RequestMeta>,
) -> Result<ApiOk<Vec<Quest>>, ApiErrorWithMeta> {
    let quests = st
        .accounts
        .quests(&user_id)
        .await
        .map_err(|e| e.with_meta(meta.clone()))?;

    Ok(ApiOk::ok("quests fetched", quests, meta))
}

async fn complete_quest_handler(
    State(st): State<AppState>,
    AuthUser(user_id): AuthUser,
    Extension(meta): Extension<RequestMeta>,
    id: Result<Path<i64>, axum::extract::rejection::PathRejection>,
) -> Result<ApiOk<Quest>, ApiErrorWithMeta> {
    let Path(quest_id) = id.map_err(|e| {
        ApiError::BadRequest(format!("invalid quest id: {}", e.body_text()))
            .with_meta(meta.clone())
            .with_code(E_BAD_REQUEST)
    })?;

    let quest = st
        .accounts
        .complete_quest(&user_id, quest_id)
        .await
        .map_err(|e| e.with_meta(meta.clone()))?;

    Ok(ApiOk::ok("quest completed", quest, meta))
}

async fn play_roulette_handler(
    State(st): State<AppState>,
    AuthUser(user_id): AuthUser,
    Extension(meta): Extension<RequestMeta>,
) -> Result<ApiOk<RouletteOutcome>, ApiErrorWithMeta> {
    let outcome = st
        .accounts
        .play_roulette(&user_id)
        .await
        .map_err(|e| e.with_meta(meta.clone()))?;

    let message = if outcome.won {
        "bonus unlocked"
    } else {
        "bonus forfeited"
    };
    Ok(ApiOk::ok(message, outcome, meta))
}

async fn deposit_handler(
    State(st): State<AppState>,
    AuthUser(user_id): AuthUser,
    Extension(meta): Extension<RequestMeta>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<ApiOk<Balance>, ApiErrorWithMeta> {
    let amount = amount_from(payload, &meta)?;

    let balance = st
        .accounts
        .deposit(&user_id, amount)
        .await
        .map_err(|e| e.with_meta(meta.clone()))?;

    Ok(ApiOk::ok("deposit applied", balance, meta))
}

async fn withdraw_handler(
    State(st): State<AppState>,
    AuthUser(user_id): AuthUser,
    Extension(meta): Extension<RequestMeta>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<ApiOk<Balance>, ApiErrorWithMeta> {
    let amount = amount_from(payload, &meta)?;

    let balance = st
        .accounts
        .withdraw(&user_id, amount)
        .await
        .map_err(|e| e.with_meta(meta.clone()))?;

    Ok(ApiOk::ok("withdrawal applied", balance, meta))
}

async fn history_handler(
    State(st): State<AppState>,
    AuthUser(user_id): AuthUser,
    Extension(meta): Extension<RequestMeta>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<ApiOk<Vec<Transaction>>, ApiErrorWithMeta> {
    let Query(query) = query.map_err(|e| {
        ApiError::BadRequest(format!("invalid query: {}", e.body_text()))
            .with_meta(meta.clone())
            .with_code(E_BAD_REQUEST)
    })?;
    let page = Page::new(query.page, query.per_page);

    let (entries, total) = st
        .accounts
        .history(&user_id, page)
        .await
        .map_err(|e| e.with_meta(meta.clone()))?;

    Ok(ApiOk::ok("history fetched", entries, meta)
        .with_pagination(Pagination::new(page.page, page.per_page, total)))
}
