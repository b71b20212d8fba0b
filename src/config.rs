//! Configuration Module
//!
//! 환경변수 기반 설정. `main`에서 한 번 로드해 생성자에 명시적으로 전달하고,
//! 라이브러리 코드는 환경변수를 직접 읽지 않음.
//!
//! 비밀키(`OWNER_SECRET_KEY`, `RENTER_SECRET_KEY`)는 `Secret`으로 감싸서
//! `Debug` 출력이나 로그에 노출되지 않게 함.

use std::env;
use std::fmt;

use anyhow::{bail, Context, Result};
use solana_commitment_config::CommitmentConfig;
use zeroize::Zeroizing;

/// Devnet RPC (기본값)
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// 배포된 렌탈 프로그램 ID
pub const DEFAULT_PROGRAM_ID: &str = "Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkgQQTV5Lcb8a";

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 서버 포트 (기본값: 3001)
    pub port: u16,

    /// Solana RPC URL
    pub rpc_url: String,

    /// 렌탈 프로그램 ID (base58)
    pub program_id: String,

    /// 트랜잭션 확인 수준
    pub commitment: CommitmentConfig,

    /// 원장 백엔드 (rpc | simulated)
    pub ledger_backend: LedgerBackend,

    /// 오너 키페어
    pub owner_secret: Option<Secret>,

    /// 렌터 키페어
    pub renter_secret: Option<Secret>,

    /// rent/return 요청에 주소가 없을 때 사용할 기본 렌탈 계정
    pub book_rental_account: Option<String>,

    /// 프로덕션 CORS 허용 도메인
    pub allowed_origins: Vec<String>,

    /// 환경 (development, staging, production)
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    /// 실제 Solana 클러스터
    Rpc,
    /// 프로세스 내 시뮬레이터 (로컬 개발용)
    Simulated,
}

/// 로그/Debug에 노출되면 안 되는 문자열
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Config {
    /// 환경변수에서 설정 로드
    ///
    /// # Optional Environment Variables
    ///
    /// - `PORT`: 서버 포트 (기본값: 3001)
    /// - `SOLANA_RPC_URL`: RPC 엔드포인트 (기본값: devnet)
    /// - `PROGRAM_ID`: 렌탈 프로그램 ID
    /// - `SOLANA_COMMITMENT`: processed | confirmed | finalized
    /// - `LEDGER_BACKEND`: rpc | simulated
    /// - `OWNER_SECRET_KEY`, `RENTER_SECRET_KEY`: 키페어 (JSON 배열, 콤마 구분, base58)
    /// - `BOOK_RENTAL_ACCOUNT`: 기본 렌탈 계정 주소
    /// - `ALLOWED_ORIGINS`: 콤마 구분 CORS 도메인 (프로덕션)
    /// - `ENVIRONMENT`: development | staging | production
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 임의의 조회 함수로 설정 구성 (테스트에서 환경변수 없이 사용)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        };

        let commitment = match lookup("SOLANA_COMMITMENT")
            .unwrap_or_else(|| "confirmed".to_string())
            .to_lowercase()
            .as_str()
        {
            "processed" => CommitmentConfig::processed(),
            "confirmed" => CommitmentConfig::confirmed(),
            "finalized" => CommitmentConfig::finalized(),
            other => bail!("SOLANA_COMMITMENT must be processed, confirmed or finalized, got `{other}`"),
        };

        let ledger_backend = match lookup("LEDGER_BACKEND")
            .unwrap_or_else(|| "rpc".to_string())
            .to_lowercase()
            .as_str()
        {
            "rpc" => LedgerBackend::Rpc,
            "simulated" => LedgerBackend::Simulated,
            other => bail!("LEDGER_BACKEND must be rpc or simulated, got `{other}`"),
        };

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            port: lookup("PORT")
                .unwrap_or_else(|| "3001".to_string())
                .parse()
                .context("PORT must be a valid number")?,

            rpc_url: lookup("SOLANA_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),

            program_id: lookup("PROGRAM_ID").unwrap_or_else(|| DEFAULT_PROGRAM_ID.to_string()),

            commitment,
            ledger_backend,

            owner_secret: non_empty("OWNER_SECRET_KEY").map(Secret::new),
            renter_secret: non_empty("RENTER_SECRET_KEY").map(Secret::new),
            book_rental_account: non_empty("BOOK_RENTAL_ACCOUNT"),

            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),

            environment,
        })
    }

    /// 프로덕션 환경인지 확인
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
