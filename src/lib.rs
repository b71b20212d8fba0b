//! Book Rental API Library
//!
//! # Overview
//!
//! 이 라이브러리는 Solana 렌탈 프로그램 앞단의 HTTP API를 제공합니다.
//! 실제 상태 전이는 온체인 프로그램이 담당하고, 이 크레이트는
//! 올바른 계정/서명자 구성으로 트랜잭션을 만들어 제출합니다.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                          API                              │
//! │                                                           │
//! │  ┌─────────┐   ┌────────────────────┐   ┌──────────────┐ │
//! │  │ Routes  │──▶│ RentalOrchestrator │──▶│ LedgerClient │ │
//! │  └─────────┘   └─────────┬──────────┘   └──────┬───────┘ │
//! │                          │                     │         │
//! │                 ┌────────▼─────────┐           │         │
//! │                 │ IdentityProvider │           │         │
//! │                 └──────────────────┘           │         │
//! └────────────────────────────────────────────────┼─────────┘
//!                                                  ▼
//!                                      ┌──────────────────────┐
//!                                      │ Rental Program (SVM) │
//!                                      └──────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 렌탈 오케스트레이터, 원장 어댑터, 키 공급
//! - `types`: 공통 타입 정의
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use book_rental_api::{config::Config, services::*};
//!
//! let config = Config::from_env()?;
//! let ledger = SolanaLedgerClient::new(&config.rpc_url, &config.program_id, config.commitment)?;
//! let identities = KeyringIdentityProvider::from_config(&config)?;
//! let orchestrator = RentalOrchestrator::new(Arc::new(ledger), Arc::new(identities));
//!
//! let created = orchestrator.initialize(5).await?;
//! orchestrator.rent_book(Some(&created.book_rental.to_string()), renter, 3).await?;
//! ```

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{ApiError, RentalError};
pub use services::RentalOrchestrator;

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RentalOrchestrator>,
    pub config: Arc<Config>,
}
