//! Identity Provisioning
//!
//! 서명 주체(키페어) 공급을 주입 가능한 capability로 분리.
//! - owner: 프로세스 수명 동안 유지되는 오너 키
//! - renter: 주소로 조회하는 외부 공급 키
//! - ephemeral: 호출 1회에만 쓰이는 키 (새 렌탈 계정)

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::config::Config;

pub trait IdentityProvider: Send + Sync {
    /// 렌탈 오퍼의 오너
    fn owner(&self) -> Arc<Keypair>;

    /// 주소에 해당하는 렌터 키 (없으면 None)
    fn renter(&self, address: &Pubkey) -> Option<Arc<Keypair>>;

    /// 호출 범위에서만 사용되는 새 키
    fn ephemeral(&self) -> Keypair {
        Keypair::new()
    }
}

/// 메모리 키링
pub struct KeyringIdentityProvider {
    owner: Arc<Keypair>,
    renters: HashMap<Pubkey, Arc<Keypair>>,
}

impl KeyringIdentityProvider {
    pub fn new(owner: Keypair) -> Self {
        Self {
            owner: Arc::new(owner),
            renters: HashMap::new(),
        }
    }

    pub fn with_renter(mut self, renter: Keypair) -> Self {
        self.renters.insert(renter.pubkey(), Arc::new(renter));
        self
    }

    /// 설정에서 키링 구성
    ///
    /// 오너 키가 없으면 프로덕션에서는 실패, 그 외 환경에서는
    /// 프로세스 수명 동안 쓸 키를 생성
    pub fn from_config(config: &Config) -> Result<Self> {
        let owner = match &config.owner_secret {
            Some(secret) => parse_keypair_string(secret.expose())?,
            None if config.is_production() => {
                bail!("OWNER_SECRET_KEY is required in production")
            }
            None => {
                let generated = Keypair::new();
                warn!(
                    owner = %generated.pubkey(),
                    "OWNER_SECRET_KEY not set, generated a process-lifetime owner"
                );
                generated
            }
        };
        info!(owner = %owner.pubkey(), "owner identity loaded");

        let mut provider = Self::new(owner);
        if let Some(secret) = &config.renter_secret {
            let renter = parse_keypair_string(secret.expose())?;
            info!(renter = %renter.pubkey(), "renter identity loaded");
            provider = provider.with_renter(renter);
        }

        Ok(provider)
    }
}

impl IdentityProvider for KeyringIdentityProvider {
    fn owner(&self) -> Arc<Keypair> {
        Arc::clone(&self.owner)
    }

    fn renter(&self, address: &Pubkey) -> Option<Arc<Keypair>> {
        self.renters.get(address).cloned()
    }
}

/// 키페어 문자열 파싱: JSON 바이트 배열, 콤마 구분 바이트, base58
pub fn parse_keypair_string(raw: &str) -> Result<Keypair> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("keypair string empty");
    }

    let bytes: Zeroizing<Vec<u8>> = if trimmed.starts_with('[') {
        Zeroizing::new(serde_json::from_str(trimmed)?)
    } else if trimmed.contains(',') {
        Zeroizing::new(
            trimmed
                .split(',')
                .map(|part| part.trim())
                .filter(|part| !part.is_empty())
                .map(|part| part.parse::<u8>())
                .collect::<Result<Vec<_>, _>>()?,
        )
    } else {
        Zeroizing::new(bs58::decode(trimmed).into_vec()?)
    };

    // 에러 메시지에 키 바이트가 섞이지 않도록 길이만 보고
    Keypair::try_from(bytes.as_slice())
        .map_err(|_| anyhow::anyhow!("invalid keypair: expected 64 bytes, got {}", bytes.len()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_parse_keypair_formats() {
        let keypair = Keypair::new();
        let bytes = keypair.to_bytes();

        let json = serde_json::to_string(&bytes.to_vec()).unwrap();
        assert_eq!(parse_keypair_string(&json).unwrap().pubkey(), keypair.pubkey());

        let csv = bytes.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(",");
        assert_eq!(parse_keypair_string(&csv).unwrap().pubkey(), keypair.pubkey());

        let b58 = keypair.to_base58_string();
        assert_eq!(parse_keypair_string(&b58).unwrap().pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_parse_keypair_rejects_garbage() {
        assert!(parse_keypair_string("").is_err());
        assert!(parse_keypair_string("[1,2,3]").is_err());
        assert!(parse_keypair_string("not-base58!").is_err());
    }

    #[test]
    fn test_keyring_lookup() {
        let renter = Keypair::new();
        let renter_key = renter.pubkey();
        let provider = KeyringIdentityProvider::new(Keypair::new()).with_renter(renter);

        assert!(provider.renter(&renter_key).is_some());
        assert!(provider.renter(&Pubkey::new_unique()).is_none());
        assert_ne!(provider.ephemeral().pubkey(), provider.ephemeral().pubkey());
    }

    #[test]
    fn test_from_config_loads_secrets() {
        let owner = Keypair::new();
        let renter = Keypair::new();
        let config = config_with(&[
            ("OWNER_SECRET_KEY", &owner.to_base58_string()),
            ("RENTER_SECRET_KEY", &renter.to_base58_string()),
        ]);

        let provider = KeyringIdentityProvider::from_config(&config).unwrap();
        assert_eq!(provider.owner().pubkey(), owner.pubkey());
        assert!(provider.renter(&renter.pubkey()).is_some());
    }

    #[test]
    fn test_owner_required_in_production() {
        let config = config_with(&[("ENVIRONMENT", "production")]);
        assert!(KeyringIdentityProvider::from_config(&config).is_err());

        let config = config_with(&[]);
        assert!(KeyringIdentityProvider::from_config(&config).is_ok());
    }
}
