//! Simulated Ledger
//!
//! In-process stand-in for the rental program. Applies the same state
//! machine the on-chain program enforces (account creation, `has_one`
//! constraints, rental period) so the orchestrator and routes can be
//! exercised without a cluster. Selected with `LEDGER_BACKEND=simulated`.
//!
//! Every submission runs under one mutex, so each one is atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use tracing::{debug, info};

use crate::error::RentalError;
use crate::services::ledger::LedgerClient;
use crate::services::program::{
    AccountRole, BookRentalAccount, ProgramCall, RentalInstruction, SYSTEM_PROGRAM_ID,
};
use crate::types::{RentalOffer, TransactionReceipt};

const SECONDS_PER_DAY: i64 = 86_400;

/// 프로그램 에러 코드
const ERR_OVERFLOW: &str = "Overflow: Overflow occurred.";
const ERR_NOT_RENTED: &str = "NotRented: Book is not currently rented.";
const ERR_PERIOD_NOT_OVER: &str = "RentalPeriodNotOver: Rental period is not over yet.";

pub struct SimulatedLedger {
    program_id: Pubkey,
    accounts: Mutex<HashMap<Pubkey, BookRentalAccount>>,
    /// unix timestamp (초)
    clock: Mutex<i64>,
    offline: AtomicBool,
    submissions: AtomicU64,
    blockhash_seq: AtomicU64,
}

impl SimulatedLedger {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            accounts: Mutex::new(HashMap::new()),
            clock: Mutex::new(chrono::Utc::now().timestamp()),
            offline: AtomicBool::new(false),
            submissions: AtomicU64::new(0),
            blockhash_seq: AtomicU64::new(0),
        }
    }

    /// 시계 전진 (대여 기간 경과 시뮬레이션)
    pub fn advance_clock(&self, seconds: i64) {
        if let Ok(mut clock) = self.clock.lock() {
            *clock += seconds;
        }
    }

    pub fn advance_days(&self, days: i64) {
        self.advance_clock(days * SECONDS_PER_DAY);
    }

    /// 네트워크 단절 시뮬레이션
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// 원장에 도달한 제출 수 (성공/거부 포함)
    pub fn submission_count(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn account(&self, address: &Pubkey) -> Option<BookRentalAccount> {
        self.accounts.lock().ok()?.get(address).cloned()
    }

    /// 호출마다 다른 blockhash (같은 명령도 서명이 달라짐)
    fn next_blockhash(&self) -> Hash {
        let seq = self.blockhash_seq.fetch_add(1, Ordering::SeqCst);
        let digest = Sha256::digest(seq.to_le_bytes());
        Hash::new_from_array(digest.into())
    }

    fn now(&self) -> Result<i64, RentalError> {
        self.clock
            .lock()
            .map(|clock| *clock)
            .map_err(|_| RentalError::NetworkUnavailable("simulated clock poisoned".to_string()))
    }

    fn ensure_online(&self) -> Result<(), RentalError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RentalError::NetworkUnavailable(
                "simulated ledger is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn apply(
        &self,
        call: &ProgramCall,
        accounts: &mut HashMap<Pubkey, BookRentalAccount>,
    ) -> Result<(), RentalError> {
        let role = |role: AccountRole| {
            call.accounts.get(role).copied().ok_or_else(|| {
                RentalError::LedgerRejected(format!("AccountNotEnoughKeys: {}", role.as_str()))
            })
        };

        if role(AccountRole::SystemProgram)? != SYSTEM_PROGRAM_ID {
            return Err(RentalError::LedgerRejected(
                "InvalidProgramId: system_program".to_string(),
            ));
        }
        let book_rental = role(AccountRole::BookRental)?;

        match call.instruction {
            RentalInstruction::Initialize { rent_price_per_day } => {
                if accounts.contains_key(&book_rental) {
                    return Err(RentalError::LedgerRejected(format!(
                        "Allocate: account Address {{ address: {book_rental}, base: None }} already in use"
                    )));
                }
                let owner = role(AccountRole::Owner)?;
                accounts.insert(book_rental, BookRentalAccount::new(owner, rent_price_per_day));
            }
            RentalInstruction::RentBook { days } => {
                let renter = role(AccountRole::Renter)?;
                let now = self.now()?;
                let state = existing(accounts, &book_rental)?;
                if state.renter.is_some() {
                    return Err(RentalError::LedgerRejected(
                        "BookAlreadyRented: Book is already rented.".to_string(),
                    ));
                }
                state
                    .rent_price_per_day
                    .checked_mul(days)
                    .ok_or_else(|| RentalError::LedgerRejected(ERR_OVERFLOW.to_string()))?;
                let duration_secs = i64::try_from(days)
                    .ok()
                    .and_then(|d| d.checked_mul(SECONDS_PER_DAY))
                    .ok_or_else(|| RentalError::LedgerRejected(ERR_OVERFLOW.to_string()))?;
                now.checked_add(duration_secs)
                    .ok_or_else(|| RentalError::LedgerRejected(ERR_OVERFLOW.to_string()))?;

                state.renter = Some(renter.to_bytes());
                state.rental_duration = Some(days);
                state.rental_start_time = Some(now);
            }
            RentalInstruction::ReturnBook => {
                let owner = role(AccountRole::Owner)?;
                let renter = role(AccountRole::Renter)?;
                let now = self.now()?;
                let state = existing(accounts, &book_rental)?;

                if state.owner() != owner {
                    return Err(RentalError::LedgerRejected(
                        "ConstraintHasOne: owner".to_string(),
                    ));
                }
                let (Some(current), Some(start), Some(duration)) =
                    (state.renter(), state.rental_start_time, state.rental_duration)
                else {
                    return Err(RentalError::LedgerRejected(ERR_NOT_RENTED.to_string()));
                };
                if current != renter {
                    return Err(RentalError::LedgerRejected(
                        "ConstraintHasOne: renter".to_string(),
                    ));
                }
                // rent_book에서 범위를 확인했으므로 넘치지 않음
                let due = start.saturating_add((duration as i64).saturating_mul(SECONDS_PER_DAY));
                if now < due {
                    return Err(RentalError::LedgerRejected(ERR_PERIOD_NOT_OVER.to_string()));
                }

                state.renter = None;
                state.rental_duration = None;
                state.rental_start_time = None;
            }
        }

        Ok(())
    }
}

fn existing<'a>(
    accounts: &'a mut HashMap<Pubkey, BookRentalAccount>,
    address: &Pubkey,
) -> Result<&'a mut BookRentalAccount, RentalError> {
    accounts.get_mut(address).ok_or_else(|| {
        RentalError::LedgerRejected(format!(
            "AccountNotInitialized: book_rental {address}"
        ))
    })
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    async fn submit(
        &self,
        call: ProgramCall,
        signers: &[&Keypair],
    ) -> Result<TransactionReceipt, RentalError> {
        self.ensure_online()?;

        // 실제 클라이언트와 같은 경로로 검증 + 서명
        let tx = call.build_transaction(&self.program_id, signers, self.next_blockhash())?;
        self.submissions.fetch_add(1, Ordering::SeqCst);

        {
            let mut accounts = self.accounts.lock().map_err(|_| {
                RentalError::NetworkUnavailable("simulated ledger poisoned".to_string())
            })?;
            if let Err(err) = self.apply(&call, &mut accounts) {
                debug!(
                    target: "ledger::simulated",
                    instruction = call.instruction.name(),
                    error = %err,
                    "transaction rejected"
                );
                return Err(err);
            }
        }

        let signature = tx
            .signatures
            .first()
            .ok_or_else(|| RentalError::InvalidArgument("transaction has no signature".into()))?;
        info!(
            target: "ledger::simulated",
            instruction = call.instruction.name(),
            %signature,
            "transaction applied"
        );
        Ok(TransactionReceipt::new(signature.to_string()))
    }

    async fn fetch_offer(&self, address: &Pubkey) -> Result<Option<RentalOffer>, RentalError> {
        self.ensure_online()?;
        Ok(self.account(address).map(|state| state.to_offer(address)))
    }

    async fn health(&self) -> Result<(), RentalError> {
        self.ensure_online()
    }

    fn program_id(&self) -> &Pubkey {
        &self.program_id
    }
}

#[cfg(test)]
mod tests {
    use solana_sdk::signature::Signer;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::services::program::AccountSet;

    fn initialize_call(offer: Pubkey, owner: Pubkey, price: u64) -> ProgramCall {
        ProgramCall::new(
            RentalInstruction::Initialize {
                rent_price_per_day: price,
            },
            AccountSet::new()
                .with(AccountRole::BookRental, offer)
                .with(AccountRole::Owner, owner)
                .with(AccountRole::SystemProgram, SYSTEM_PROGRAM_ID),
        )
    }

    fn rent_call(offer: Pubkey, renter: Pubkey, days: u64) -> ProgramCall {
        ProgramCall::new(
            RentalInstruction::RentBook { days },
            AccountSet::new()
                .with(AccountRole::BookRental, offer)
                .with(AccountRole::Renter, renter)
                .with(AccountRole::SystemProgram, SYSTEM_PROGRAM_ID),
        )
    }

    #[tokio::test]
    async fn test_initialize_creates_account_once() {
        let ledger = SimulatedLedger::new(Pubkey::new_unique());
        let offer = Keypair::new();
        let owner = Keypair::new();

        let call = initialize_call(offer.pubkey(), owner.pubkey(), 5);
        let receipt = assert_ok!(ledger.submit(call.clone(), &[&offer, &owner]).await);
        assert!(!receipt.as_str().is_empty());

        let state = ledger.account(&offer.pubkey()).unwrap();
        assert_eq!(state.owner(), owner.pubkey());
        assert_eq!(state.rent_price_per_day, 5);

        let err = assert_err!(ledger.submit(call, &[&offer, &owner]).await);
        assert!(matches!(err, RentalError::LedgerRejected(_)));
    }

    #[tokio::test]
    async fn test_rent_overflow_rejected() {
        let ledger = SimulatedLedger::new(Pubkey::new_unique());
        let offer = Keypair::new();
        let owner = Keypair::new();
        let renter = Keypair::new();

        assert_ok!(
            ledger
                .submit(initialize_call(offer.pubkey(), owner.pubkey(), u64::MAX), &[&offer, &owner])
                .await
        );

        let err = assert_err!(
            ledger
                .submit(rent_call(offer.pubkey(), renter.pubkey(), 2), &[&renter])
                .await
        );
        assert_eq!(err, RentalError::LedgerRejected(ERR_OVERFLOW.to_string()));
        assert!(ledger.account(&offer.pubkey()).unwrap().renter.is_none());
    }

    #[tokio::test]
    async fn test_rent_unknown_account_rejected() {
        let ledger = SimulatedLedger::new(Pubkey::new_unique());
        let renter = Keypair::new();

        let err = assert_err!(
            ledger
                .submit(rent_call(Pubkey::new_unique(), renter.pubkey(), 1), &[&renter])
                .await
        );
        assert!(matches!(err, RentalError::LedgerRejected(_)));
    }

    #[tokio::test]
    async fn test_signer_check_precedes_submission() {
        let ledger = SimulatedLedger::new(Pubkey::new_unique());
        let offer = Keypair::new();
        let owner = Keypair::new();

        let err = assert_err!(
            ledger
                .submit(initialize_call(offer.pubkey(), owner.pubkey(), 1), &[&owner])
                .await
        );
        assert_eq!(err, RentalError::MissingSigner("bookRental"));
        assert_eq!(ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_offline() {
        let ledger = SimulatedLedger::new(Pubkey::new_unique());
        ledger.set_offline(true);

        assert!(matches!(
            ledger.health().await,
            Err(RentalError::NetworkUnavailable(_))
        ));
        assert!(matches!(
            ledger.fetch_offer(&Pubkey::new_unique()).await,
            Err(RentalError::NetworkUnavailable(_))
        ));

        ledger.set_offline(false);
        assert_ok!(ledger.health().await);
    }
}
