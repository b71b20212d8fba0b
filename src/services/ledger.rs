//! Ledger Client Adapter
//!
//! Holds one connection to the Solana cluster and one bound program id, and
//! submits `ProgramCall`s against it.
//!
//! # Error classification
//! - transport (I/O, HTTP, request failure) → `NetworkUnavailable`
//! - RPC response / preflight / transaction error → `LedgerRejected` (message kept verbatim)

use std::sync::Arc;

use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::RpcError;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use tracing::{debug, info, warn};

use crate::error::RentalError;
use crate::services::program::{BookRentalAccount, ProgramCall};
use crate::types::{parse_address, RentalOffer, TransactionReceipt};

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// 한 개의 트랜잭션 제출. 재시도하지 않음.
    async fn submit(
        &self,
        call: ProgramCall,
        signers: &[&Keypair],
    ) -> Result<TransactionReceipt, RentalError>;

    /// 렌탈 계정 조회 (없거나 프로그램 소유가 아니면 None)
    async fn fetch_offer(&self, address: &Pubkey) -> Result<Option<RentalOffer>, RentalError>;

    /// 연결 상태 확인
    async fn health(&self) -> Result<(), RentalError>;

    fn program_id(&self) -> &Pubkey;
}

/// RPC 기반 Solana 클라이언트
pub struct SolanaLedgerClient {
    rpc: Arc<RpcClient>,
    program_id: Pubkey,
    commitment: CommitmentConfig,
}

impl SolanaLedgerClient {
    pub fn new(
        rpc_url: &str,
        program_id: &str,
        commitment: CommitmentConfig,
    ) -> Result<Self, RentalError> {
        let program_id = parse_address(program_id)?;
        let rpc = RpcClient::new_with_commitment(rpc_url.to_string(), commitment);
        Ok(Self {
            rpc: Arc::new(rpc),
            program_id,
            commitment,
        })
    }

    pub fn endpoint(&self) -> String {
        self.rpc.url()
    }
}

#[async_trait]
impl LedgerClient for SolanaLedgerClient {
    async fn submit(
        &self,
        call: ProgramCall,
        signers: &[&Keypair],
    ) -> Result<TransactionReceipt, RentalError> {
        let name = call.instruction.name();

        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(classify_client_error)?;
        let tx = call.build_transaction(&self.program_id, signers, blockhash)?;

        debug!(
            target: "ledger::rpc",
            instruction = name,
            %blockhash,
            signers = signers.len(),
            "submitting transaction"
        );

        let signature = self
            .rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|err| {
                let mapped = classify_client_error(err);
                warn!(target: "ledger::rpc", instruction = name, error = %mapped, "submission failed");
                mapped
            })?;

        info!(
            target: "ledger::rpc",
            instruction = name,
            %signature,
            "transaction confirmed"
        );
        Ok(TransactionReceipt::new(signature.to_string()))
    }

    async fn fetch_offer(&self, address: &Pubkey) -> Result<Option<RentalOffer>, RentalError> {
        let account = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(classify_client_error)?
            .value;

        match account {
            Some(account) if account.owner == self.program_id => {
                let state = BookRentalAccount::decode(&account.data)?;
                Ok(Some(state.to_offer(address)))
            }
            Some(_) => {
                debug!(target: "ledger::rpc", %address, "account not owned by rental program");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn health(&self) -> Result<(), RentalError> {
        self.rpc.get_health().await.map_err(classify_client_error)
    }

    fn program_id(&self) -> &Pubkey {
        &self.program_id
    }
}

/// ClientError → 도메인 에러
pub fn classify_client_error(err: ClientError) -> RentalError {
    match err.kind() {
        ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => {
            RentalError::NetworkUnavailable(err.to_string())
        }
        ClientErrorKind::RpcError(RpcError::RpcRequestError(_)) => {
            RentalError::NetworkUnavailable(err.to_string())
        }
        _ => RentalError::LedgerRejected(err.to_string()),
    }
}
