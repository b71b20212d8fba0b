//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `RentalOrchestrator`: 렌탈 요청 → 원장 제출 (계정/서명자 결정)
//! - `LedgerClient`: 원장 제출 어댑터 (`SolanaLedgerClient`, `SimulatedLedger`)
//! - `IdentityProvider`: 서명 키 공급
//! - `program`: 렌탈 프로그램 명령/계정 스키마

pub mod program;
mod identity;
mod ledger;
mod simulated;
mod rental;

pub use identity::{parse_keypair_string, IdentityProvider, KeyringIdentityProvider};
pub use ledger::{classify_client_error, LedgerClient, SolanaLedgerClient};
pub use program::{AccountRole, AccountSet, BookRentalAccount, ProgramCall, RentalInstruction};
pub use rental::{InitializedOffer, RentalOrchestrator};
pub use simulated::SimulatedLedger;
