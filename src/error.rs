//! Error Handling Module
//!
//! Provides type-safe error handling with proper HTTP status code mapping.
//! `RentalError` is the domain taxonomy shared by the orchestrator and the
//! ledger adapters; `ApiError` is what the HTTP layer renders.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 렌탈 도메인 에러
///
/// # Design Decision
///
/// 재시도 가능 여부로 구분
/// - `InvalidArgument`, `MalformedAddress`, `MissingSigner`: 호출자가 입력 수정
/// - `NetworkUnavailable`: 일시적 장애, 재시도 가능
/// - `LedgerRejected`: 프로그램이 거부 (상태/권한), 사유를 그대로 전달
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RentalError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed ledger address: {0}")]
    MalformedAddress(String),

    #[error("no signing identity available for required role `{0}`")]
    MissingSigner(&'static str),

    #[error("ledger unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("ledger rejected transaction: {0}")]
    LedgerRejected(String),

    #[error("rental offer not found: {0}")]
    NotFound(String),
}

/// API 에러 타입
///
/// # Design Decision
///
/// 각 에러 variant는 적절한 HTTP 상태 코드에 매핑됨
/// - 클라이언트 에러: 4xx (잘못된 요청, 서명자 누락, 원장 거부)
/// - 서버 에러: 503 (원장 연결 불가)
#[derive(Debug, Error)]
pub enum ApiError {
    // ============ 400 Bad Request ============
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    // ============ 404 Not Found ============
    #[error("Resource not found: {0}")]
    NotFound(String),

    // ============ 409 Conflict ============
    #[error("Ledger rejected: {0}")]
    LedgerRejected(String),

    // ============ 422 Unprocessable Entity ============
    #[error("Missing signer: {0}")]
    MissingSigner(String),

    // ============ 503 Service Unavailable ============
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// API 에러 응답 구조
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// 응답 상태 코드와 안정적인 에러 코드
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            ApiError::MalformedAddress(_) => (StatusCode::BAD_REQUEST, "MALFORMED_ADDRESS"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::LedgerRejected(_) => (StatusCode::CONFLICT, "LEDGER_REJECTED"),
            ApiError::MissingSigner(_) => (StatusCode::UNPROCESSABLE_ENTITY, "MISSING_SIGNER"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "NETWORK_UNAVAILABLE")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, details) = match &self {
            // 4xx 클라이언트 에러
            ApiError::BadRequest(msg) => ("Invalid request body".to_string(), Some(msg.clone())),
            ApiError::InvalidArgument(msg) => {
                ("Invalid argument".to_string(), Some(msg.clone()))
            }
            ApiError::MalformedAddress(addr) => {
                ("Malformed ledger address".to_string(), Some(addr.clone()))
            }
            ApiError::NotFound(resource) => (format!("{} not found", resource), None),
            ApiError::LedgerRejected(reason) => (
                "Ledger program rejected the transaction".to_string(),
                Some(reason.clone()),
            ),
            ApiError::MissingSigner(role) => (
                "Required signer is not available".to_string(),
                Some(role.clone()),
            ),

            // 5xx 서버 에러
            ApiError::ServiceUnavailable(reason) => {
                tracing::error!("Ledger unavailable: {}", reason);
                ("Ledger is currently unavailable".to_string(), None)
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// 도메인 에러를 ApiError로 변환
impl From<RentalError> for ApiError {
    fn from(err: RentalError) -> Self {
        match err {
            RentalError::InvalidArgument(msg) => ApiError::InvalidArgument(msg),
            RentalError::MalformedAddress(addr) => ApiError::MalformedAddress(addr),
            RentalError::MissingSigner(role) => ApiError::MissingSigner(role.to_string()),
            RentalError::NetworkUnavailable(msg) => ApiError::ServiceUnavailable(msg),
            RentalError::LedgerRejected(reason) => ApiError::LedgerRejected(reason),
            RentalError::NotFound(what) => ApiError::NotFound(what),
        }
    }
}

/// JSON 바디 추출 실패를 ApiError로 변환
///
/// 필드 누락/타입 불일치는 인자 오류, 그 외 (문법 오류, Content-Type 누락 등)는
/// 요청 형식 오류로 취급
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => ApiError::InvalidArgument(err.body_text()),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}
