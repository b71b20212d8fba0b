//! Book Rental API Server
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Client (Frontend)                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum Web Server                         │
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                      Routes Layer                        ││
//! │  │  /health  /books/initialize  /books/rent  /books/return ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Services Layer                        ││
//! │  │  RentalOrchestrator   IdentityProvider   LedgerClient   ││
//! │  └─────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Rental Program (Solana)                   │
//! │  initialize    rent_book    return_book                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use book_rental_api::{
    config::LedgerBackend,
    routes,
    services::{
        KeyringIdentityProvider, LedgerClient, RentalOrchestrator, SimulatedLedger,
        SolanaLedgerClient,
    },
    types::parse_address,
    AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 환경변수 로드
    dotenvy::dotenv().ok();

    // 로깅 초기화
    // RUST_LOG=debug,solana_rpc_client=warn 형태로 레벨 제어 가능
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "book_rental_api=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Starting Book Rental API Server");

    // 설정 로드
    let config = Config::from_env()?;
    tracing::info!("📋 Configuration loaded");

    // 원장 연결
    let ledger: Arc<dyn LedgerClient> = match config.ledger_backend {
        LedgerBackend::Rpc => {
            let client =
                SolanaLedgerClient::new(&config.rpc_url, &config.program_id, config.commitment)
                    .context("PROGRAM_ID must be a valid address")?;
            tracing::info!(endpoint = %client.endpoint(), program_id = %config.program_id, "⛓️  Ledger client ready");
            Arc::new(client)
        }
        LedgerBackend::Simulated => {
            let program_id =
                parse_address(&config.program_id).context("PROGRAM_ID must be a valid address")?;
            tracing::warn!("🧪 Using in-process simulated ledger");
            Arc::new(SimulatedLedger::new(program_id))
        }
    };

    // 서명 키 로드
    let identities = KeyringIdentityProvider::from_config(&config)?;
    tracing::info!("🔐 Identities loaded");

    let default_offer = config
        .book_rental_account
        .as_deref()
        .map(parse_address)
        .transpose()
        .context("BOOK_RENTAL_ACCOUNT must be a valid address")?;

    let orchestrator =
        RentalOrchestrator::new(ledger, Arc::new(identities)).with_default_offer(default_offer);

    // 앱 상태 구성
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        config: Arc::new(config.clone()),
    };

    // 라우터 구성
    let app = routes::router(state);

    // 서버 시작
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🌐 Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
