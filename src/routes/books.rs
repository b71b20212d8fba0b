//! Book Rental Endpoints
//!
//! Thin HTTP layer over `RentalOrchestrator`. Numeric fields are taken as raw
//! JSON numbers so that negative or fractional values reach the orchestrator's
//! own validation instead of failing inside the extractor. Bodies that do not
//! deserialize at all are converted to `ApiError` so every failure keeps the
//! `{ error, code, details }` shape.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::{
    error::ApiError,
    types::{integer_arg, RentalOffer},
    AppState,
};

// ============ Request/Response Types ============

/// 렌탈 오퍼 생성 요청
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    /// 일일 대여료 (lamports)
    pub rent_price_per_day: Number,
}

/// 대여 요청
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentRequest {
    /// 렌터 주소 (base58)
    pub renter: String,
    /// 대여 일수
    pub days: Number,
    /// 렌탈 계정 (없으면 기본 계정)
    pub book_rental: Option<String>,
}

/// 반납 요청
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub renter: String,
    pub book_rental: Option<String>,
}

/// 트랜잭션 응답
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResponse {
    pub tx: String,
    /// initialize에서만 반환 (이후 요청에 전달)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_rental: Option<String>,
}

// ============ Handlers ============

/// POST /books/initialize
///
/// ```json
/// { "rentPricePerDay": 5 }  →  { "tx": "5Nc...", "bookRental": "9xQ..." }
/// ```
pub async fn initialize(
    State(state): State<AppState>,
    payload: Result<Json<InitializeRequest>, JsonRejection>,
) -> Result<Json<TxResponse>, ApiError> {
    let Json(req) = payload?;
    let price = integer_arg(&req.rent_price_per_day, "rentPricePerDay")?;
    let created = state.orchestrator.initialize(price).await?;

    Ok(Json(TxResponse {
        tx: created.receipt.into_inner(),
        book_rental: Some(created.book_rental.to_string()),
    }))
}

/// POST /books/rent
pub async fn rent(
    State(state): State<AppState>,
    payload: Result<Json<RentRequest>, JsonRejection>,
) -> Result<Json<TxResponse>, ApiError> {
    let Json(req) = payload?;
    let days = integer_arg(&req.days, "days")?;
    let receipt = state
        .orchestrator
        .rent_book(req.book_rental.as_deref(), &req.renter, days)
        .await?;

    Ok(Json(TxResponse {
        tx: receipt.into_inner(),
        book_rental: None,
    }))
}

/// POST /books/return
pub async fn return_book(
    State(state): State<AppState>,
    payload: Result<Json<ReturnRequest>, JsonRejection>,
) -> Result<Json<TxResponse>, ApiError> {
    let Json(req) = payload?;
    let receipt = state
        .orchestrator
        .return_book(req.book_rental.as_deref(), &req.renter)
        .await?;

    Ok(Json(TxResponse {
        tx: receipt.into_inner(),
        book_rental: None,
    }))
}

/// GET /books/:address
///
/// 온체인 렌탈 계정 조회
pub async fn get_offer(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<RentalOffer>, ApiError> {
    let offer = state.orchestrator.offer(&address).await?;
    Ok(Json(offer))
}
