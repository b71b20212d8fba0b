//! Rental Orchestrator
//!
//! Turns the three logical rental requests into exactly one ledger
//! submission each: picks the accounts, resolves the signing identities and
//! validates numeric arguments before anything reaches the network.
//!
//! # State machine (enforced by the program, not checked here)
//!
//! ```text
//! Uninitialized ──initialize──▶ Available ──rent_book──▶ Rented
//!                                   ▲                       │
//!                                   └──────return_book──────┘
//! ```
//!
//! The orchestrator is stateless between calls; program rejections surface
//! unchanged as `RentalError::LedgerRejected`.

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tracing::{info, instrument, warn};

use crate::error::RentalError;
use crate::services::identity::IdentityProvider;
use crate::services::ledger::LedgerClient;
use crate::services::program::{
    AccountRole, AccountSet, ProgramCall, RentalInstruction, SYSTEM_PROGRAM_ID,
};
use crate::types::{parse_address, RentalOffer, TransactionReceipt};

/// initialize 결과: 영수증 + 새 렌탈 계정 주소
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializedOffer {
    pub receipt: TransactionReceipt,
    pub book_rental: Pubkey,
}

pub struct RentalOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    identities: Arc<dyn IdentityProvider>,
    /// 요청에 주소가 없을 때 사용할 렌탈 계정
    default_offer: Option<Pubkey>,
}

impl RentalOrchestrator {
    pub fn new(ledger: Arc<dyn LedgerClient>, identities: Arc<dyn IdentityProvider>) -> Self {
        Self {
            ledger,
            identities,
            default_offer: None,
        }
    }

    pub fn with_default_offer(mut self, offer: Option<Pubkey>) -> Self {
        self.default_offer = offer;
        self
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    /// 새 렌탈 오퍼 생성
    ///
    /// 서명자: 오너 + 새 렌탈 계정 (계정 생성에 둘 다 필요)
    #[instrument(skip(self), fields(op = "initialize"))]
    pub async fn initialize(
        &self,
        rent_price_per_day: i128,
    ) -> Result<InitializedOffer, RentalError> {
        let rent_price_per_day = u64::try_from(rent_price_per_day).map_err(|_| {
            RentalError::InvalidArgument(format!(
                "rentPricePerDay must be a non-negative integer, got {rent_price_per_day}"
            ))
        })?;

        let owner = self.identities.owner();
        let offer_account = self.identities.ephemeral();
        let book_rental = offer_account.pubkey();

        let call = ProgramCall::new(
            RentalInstruction::Initialize { rent_price_per_day },
            AccountSet::new()
                .with(AccountRole::BookRental, book_rental)
                .with(AccountRole::Owner, owner.pubkey())
                .with(AccountRole::SystemProgram, SYSTEM_PROGRAM_ID),
        );

        let receipt = self
            .submit(call, &[&offer_account, owner.as_ref()])
            .await?;
        info!(%book_rental, %receipt, rent_price_per_day, "rental offer initialized");

        Ok(InitializedOffer {
            receipt,
            book_rental,
        })
    }

    /// 책 대여
    ///
    /// 서명자: 렌터 (대여료 지불 승인)
    #[instrument(skip(self), fields(op = "rent_book"))]
    pub async fn rent_book(
        &self,
        book_rental: Option<&str>,
        renter: &str,
        days: i128,
    ) -> Result<TransactionReceipt, RentalError> {
        let days = u64::try_from(days)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| {
                RentalError::InvalidArgument(format!("days must be a positive integer, got {days}"))
            })?;
        let book_rental = self.resolve_offer(book_rental)?;
        let renter_key = parse_address(renter)?;
        let renter = self.renter_identity(&renter_key)?;

        let call = ProgramCall::new(
            RentalInstruction::RentBook { days },
            AccountSet::new()
                .with(AccountRole::BookRental, book_rental)
                .with(AccountRole::Renter, renter_key)
                .with(AccountRole::SystemProgram, SYSTEM_PROGRAM_ID),
        );

        let receipt = self.submit(call, &[renter.as_ref()]).await?;
        info!(%book_rental, renter = %renter_key, days, %receipt, "book rented");
        Ok(receipt)
    }

    /// 책 반납
    ///
    /// 서명자: 오너 + 렌터. 현재 렌터와 다른 렌터면 프로그램이 거부.
    #[instrument(skip(self), fields(op = "return_book"))]
    pub async fn return_book(
        &self,
        book_rental: Option<&str>,
        renter: &str,
    ) -> Result<TransactionReceipt, RentalError> {
        let book_rental = self.resolve_offer(book_rental)?;
        let renter_key = parse_address(renter)?;
        let renter = self.renter_identity(&renter_key)?;
        let owner = self.identities.owner();

        let call = ProgramCall::new(
            RentalInstruction::ReturnBook,
            AccountSet::new()
                .with(AccountRole::BookRental, book_rental)
                .with(AccountRole::Owner, owner.pubkey())
                .with(AccountRole::Renter, renter_key)
                .with(AccountRole::SystemProgram, SYSTEM_PROGRAM_ID),
        );

        let receipt = self
            .submit(call, &[owner.as_ref(), renter.as_ref()])
            .await?;
        info!(%book_rental, renter = %renter_key, %receipt, "book returned");
        Ok(receipt)
    }

    /// 렌탈 계정 조회
    pub async fn offer(&self, book_rental: &str) -> Result<RentalOffer, RentalError> {
        let address = parse_address(book_rental)?;
        self.ledger
            .fetch_offer(&address)
            .await?
            .ok_or_else(|| RentalError::NotFound(address.to_string()))
    }

    fn resolve_offer(&self, requested: Option<&str>) -> Result<Pubkey, RentalError> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_address(raw),
            None => self.default_offer.ok_or_else(|| {
                RentalError::InvalidArgument(
                    "bookRental is required (no default rental account configured)".to_string(),
                )
            }),
        }
    }

    fn renter_identity(&self, renter: &Pubkey) -> Result<Arc<Keypair>, RentalError> {
        self.identities.renter(renter).ok_or_else(|| {
            warn!(%renter, "no signing key held for renter");
            RentalError::MissingSigner(AccountRole::Renter.as_str())
        })
    }

    async fn submit(
        &self,
        call: ProgramCall,
        signers: &[&Keypair],
    ) -> Result<TransactionReceipt, RentalError> {
        let name = call.instruction.name();
        self.ledger.submit(call, signers).await.map_err(|err| {
            warn!(instruction = name, error = %err, "ledger submission failed");
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::services::identity::KeyringIdentityProvider;
    use crate::services::simulated::SimulatedLedger;
    use crate::types::OfferStatus;

    struct Fixture {
        ledger: Arc<SimulatedLedger>,
        orchestrator: RentalOrchestrator,
        renter_one: Pubkey,
        renter_two: Pubkey,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(SimulatedLedger::new(Pubkey::new_unique()));
        let renter_one = Keypair::new();
        let renter_two = Keypair::new();
        let (r1, r2) = (renter_one.pubkey(), renter_two.pubkey());

        let identities = KeyringIdentityProvider::new(Keypair::new())
            .with_renter(renter_one)
            .with_renter(renter_two);
        let orchestrator = RentalOrchestrator::new(ledger.clone(), Arc::new(identities));

        Fixture {
            ledger,
            orchestrator,
            renter_one: r1,
            renter_two: r2,
        }
    }

    #[tokio::test]
    async fn test_initialize_accepts_non_negative_prices() {
        let fx = fixture();
        for price in [0i128, 1, 5, i128::from(u64::MAX)] {
            let created = assert_ok!(fx.orchestrator.initialize(price).await);
            assert!(!created.receipt.as_str().is_empty());

            let offer = fx.ledger.account(&created.book_rental).unwrap();
            assert_eq!(i128::from(offer.rent_price_per_day), price);
        }
        assert_eq!(fx.ledger.submission_count(), 4);
    }

    #[tokio::test]
    async fn test_initialize_rejects_negative_price_without_submitting() {
        let fx = fixture();
        let err = assert_err!(fx.orchestrator.initialize(-1).await);
        assert!(matches!(err, RentalError::InvalidArgument(_)));
        assert_eq!(fx.ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_rent_rejects_non_positive_days_before_network() {
        let fx = fixture();
        let created = fx.orchestrator.initialize(5).await.unwrap();
        let offer = created.book_rental.to_string();
        let renter = fx.renter_one.to_string();

        // 네트워크가 끊겨 있어도 인자 검증이 먼저
        fx.ledger.set_offline(true);
        for days in [0i128, -1, -30] {
            let err = assert_err!(fx.orchestrator.rent_book(Some(&offer), &renter, days).await);
            assert!(matches!(err, RentalError::InvalidArgument(_)));
        }
        assert_eq!(fx.ledger.submission_count(), 1);
    }

    #[tokio::test]
    async fn test_full_rental_cycle() {
        let fx = fixture();
        let r1 = fx.renter_one.to_string();
        let r2 = fx.renter_two.to_string();

        let created = fx.orchestrator.initialize(5).await.unwrap();
        let offer = created.book_rental.to_string();

        let tx2 = assert_ok!(fx.orchestrator.rent_book(Some(&offer), &r1, 3).await);
        let state = fx.orchestrator.offer(&offer).await.unwrap();
        assert_eq!(state.status, OfferStatus::Rented);
        assert_eq!(state.renter.as_deref(), Some(r1.as_str()));
        assert_eq!(state.rental_duration, Some(3));

        fx.ledger.advance_days(3);
        let tx3 = assert_ok!(fx.orchestrator.return_book(Some(&offer), &r1).await);
        let state = fx.orchestrator.offer(&offer).await.unwrap();
        assert_eq!(state.status, OfferStatus::Available);
        assert!(state.renter.is_none());

        let receipts = [created.receipt, tx2, tx3];
        assert!(receipts.iter().all(|r| !r.as_str().is_empty()));
        assert_ne!(receipts[0], receipts[1]);
        assert_ne!(receipts[1], receipts[2]);

        let err = assert_err!(fx.orchestrator.rent_book(Some(&offer), &r2, -1).await);
        assert!(matches!(err, RentalError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_return_on_available_offer_is_rejected() {
        let fx = fixture();
        let created = fx.orchestrator.initialize(5).await.unwrap();
        let offer = created.book_rental.to_string();

        let err = assert_err!(
            fx.orchestrator
                .return_book(Some(&offer), &fx.renter_one.to_string())
                .await
        );
        assert!(matches!(err, RentalError::LedgerRejected(_)));
    }

    #[tokio::test]
    async fn test_return_by_other_renter_is_rejected() {
        let fx = fixture();
        let created = fx.orchestrator.initialize(5).await.unwrap();
        let offer = created.book_rental.to_string();

        fx.orchestrator
            .rent_book(Some(&offer), &fx.renter_one.to_string(), 1)
            .await
            .unwrap();
        fx.ledger.advance_days(2);

        let err = assert_err!(
            fx.orchestrator
                .return_book(Some(&offer), &fx.renter_two.to_string())
                .await
        );
        assert!(matches!(err, RentalError::LedgerRejected(_)));

        // 원래 렌터 상태 유지
        let state = fx.orchestrator.offer(&offer).await.unwrap();
        assert_eq!(state.renter, Some(fx.renter_one.to_string()));
    }

    #[tokio::test]
    async fn test_return_before_period_is_rejected() {
        let fx = fixture();
        let created = fx.orchestrator.initialize(5).await.unwrap();
        let offer = created.book_rental.to_string();
        let r1 = fx.renter_one.to_string();

        fx.orchestrator.rent_book(Some(&offer), &r1, 3).await.unwrap();
        fx.ledger.advance_days(1);

        match fx.orchestrator.return_book(Some(&offer), &r1).await {
            Err(RentalError::LedgerRejected(reason)) => {
                assert!(reason.contains("RentalPeriodNotOver"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_rent_has_one_winner() {
        let fx = fixture();
        let created = fx.orchestrator.initialize(5).await.unwrap();
        let offer = created.book_rental.to_string();
        let (r1, r2) = (fx.renter_one.to_string(), fx.renter_two.to_string());

        let (a, b) = tokio::join!(
            fx.orchestrator.rent_book(Some(&offer), &r1, 2),
            fx.orchestrator.rent_book(Some(&offer), &r2, 2),
        );

        assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(RentalError::LedgerRejected(_))));
    }

    #[tokio::test]
    async fn test_unknown_renter_fails_before_submission() {
        let fx = fixture();
        let created = fx.orchestrator.initialize(5).await.unwrap();
        let offer = created.book_rental.to_string();
        let stranger = Pubkey::new_unique().to_string();

        let err = assert_err!(fx.orchestrator.rent_book(Some(&offer), &stranger, 2).await);
        assert_eq!(err, RentalError::MissingSigner("renter"));
        assert_eq!(fx.ledger.submission_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_addresses() {
        let fx = fixture();
        let r1 = fx.renter_one.to_string();

        let err = assert_err!(fx.orchestrator.rent_book(Some("R1"), &r1, 2).await);
        assert!(matches!(err, RentalError::MalformedAddress(_)));

        let created = fx.orchestrator.initialize(5).await.unwrap();
        let offer = created.book_rental.to_string();
        let err = assert_err!(fx.orchestrator.return_book(Some(&offer), "not-a-key").await);
        assert!(matches!(err, RentalError::MalformedAddress(_)));
    }

    #[tokio::test]
    async fn test_default_offer_is_threaded() {
        let fx = fixture();
        let created = fx.orchestrator.initialize(5).await.unwrap();
        let r1 = fx.renter_one.to_string();

        let err = assert_err!(fx.orchestrator.rent_book(None, &r1, 1).await);
        assert!(matches!(err, RentalError::InvalidArgument(_)));

        let orchestrator = fx.orchestrator.with_default_offer(Some(created.book_rental));
        assert_ok!(orchestrator.rent_book(None, &r1, 1).await);

        // 공백 주소는 미지정으로 취급, 이미 대여 중이므로 원장이 거부
        let err = assert_err!(orchestrator.rent_book(Some("  "), &r1, 1).await);
        assert!(matches!(err, RentalError::LedgerRejected(_)));
    }

    #[tokio::test]
    async fn test_offer_not_found() {
        let fx = fixture();
        let err = assert_err!(fx.orchestrator.offer(&Pubkey::new_unique().to_string()).await);
        assert!(matches!(err, RentalError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_network_unavailable_propagates() {
        let fx = fixture();
        fx.ledger.set_offline(true);
        let err = assert_err!(fx.orchestrator.initialize(5).await);
        assert!(matches!(err, RentalError::NetworkUnavailable(_)));
    }
}
