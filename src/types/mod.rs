//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 타입 정의

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Number;
use solana_sdk::pubkey::Pubkey;

use crate::error::RentalError;

/// 원장이 승인한 트랜잭션 식별자 (base58 서명)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionReceipt(String);

impl TransactionReceipt {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TransactionReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 원장 주소 파싱
pub fn parse_address(raw: &str) -> Result<Pubkey, RentalError> {
    Pubkey::from_str(raw.trim()).map_err(|_| RentalError::MalformedAddress(raw.to_string()))
}

/// JSON 숫자를 정수로 변환 (소수/범위 초과는 거부)
///
/// 음수는 그대로 반환하고, 범위 검증은 각 연산이 담당
pub fn integer_arg(value: &Number, field: &str) -> Result<i128, RentalError> {
    if let Some(v) = value.as_u64() {
        return Ok(i128::from(v));
    }
    if let Some(v) = value.as_i64() {
        return Ok(i128::from(v));
    }
    Err(RentalError::InvalidArgument(format!(
        "{field} must be an integer, got {value}"
    )))
}

/// 렌탈 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Available,
    Rented,
}

/// 온체인 렌탈 계정의 읽기 전용 뷰
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalOffer {
    pub address: String,
    pub owner: String,
    pub renter: Option<String>,
    pub rent_price_per_day: u64,
    /// 대여 기간 (일)
    pub rental_duration: Option<u64>,
    /// 대여 시작 (unix timestamp)
    pub rental_start_time: Option<i64>,
    pub status: OfferStatus,
}
