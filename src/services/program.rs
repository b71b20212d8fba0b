//! Rental Program Schema
//!
//! Declarative description of the on-chain rental program's instructions.
//! Each `RentalInstruction` variant owns its ordered account layout and the
//! subset of roles that must sign, so a submission can be checked before
//! anything is sent to the network.
//!
//! # Wire format
//! - instruction data: `sha256("global:<name>")[..8]` + borsh(args)
//! - account data: `sha256("account:BookRental")[..8]` + borsh(`BookRentalAccount`)

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;

use crate::error::RentalError;
use crate::types::{OfferStatus, RentalOffer};

/// System Program (account 생성에 필요)
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// 계정 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountRole {
    BookRental,
    Owner,
    Renter,
    SystemProgram,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::BookRental => "bookRental",
            AccountRole::Owner => "owner",
            AccountRole::Renter => "renter",
            AccountRole::SystemProgram => "systemProgram",
        }
    }
}

/// 레이아웃 내 한 계정 슬롯
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSpec {
    pub role: AccountRole,
    pub writable: bool,
    pub signer: bool,
}

const fn slot(role: AccountRole, writable: bool, signer: bool) -> AccountSpec {
    AccountSpec {
        role,
        writable,
        signer,
    }
}

const INITIALIZE_LAYOUT: &[AccountSpec] = &[
    slot(AccountRole::BookRental, true, true),
    slot(AccountRole::Owner, true, true),
    slot(AccountRole::SystemProgram, false, false),
];

const RENT_BOOK_LAYOUT: &[AccountSpec] = &[
    slot(AccountRole::BookRental, true, false),
    slot(AccountRole::Renter, true, true),
    slot(AccountRole::SystemProgram, false, false),
];

const RETURN_BOOK_LAYOUT: &[AccountSpec] = &[
    slot(AccountRole::BookRental, true, false),
    slot(AccountRole::Owner, true, true),
    slot(AccountRole::Renter, true, true),
    slot(AccountRole::SystemProgram, false, false),
];

/// 프로그램 명령 (숫자 인자 포함)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentalInstruction {
    Initialize { rent_price_per_day: u64 },
    RentBook { days: u64 },
    ReturnBook,
}

impl RentalInstruction {
    /// 프로그램 내 명령 이름 (discriminator 입력)
    pub fn name(&self) -> &'static str {
        match self {
            RentalInstruction::Initialize { .. } => "initialize",
            RentalInstruction::RentBook { .. } => "rent_book",
            RentalInstruction::ReturnBook => "return_book",
        }
    }

    pub fn layout(&self) -> &'static [AccountSpec] {
        match self {
            RentalInstruction::Initialize { .. } => INITIALIZE_LAYOUT,
            RentalInstruction::RentBook { .. } => RENT_BOOK_LAYOUT,
            RentalInstruction::ReturnBook => RETURN_BOOK_LAYOUT,
        }
    }

    pub fn signer_roles(&self) -> impl Iterator<Item = AccountRole> {
        self.layout().iter().filter(|s| s.signer).map(|s| s.role)
    }

    /// 수수료 지불 역할
    pub fn fee_payer(&self) -> AccountRole {
        match self {
            RentalInstruction::Initialize { .. } | RentalInstruction::ReturnBook => {
                AccountRole::Owner
            }
            RentalInstruction::RentBook { .. } => AccountRole::Renter,
        }
    }

    pub fn discriminator(&self) -> [u8; 8] {
        anchor_discriminator("global", self.name())
    }

    /// discriminator + borsh 인자
    pub fn data(&self) -> Result<Vec<u8>, RentalError> {
        let mut data = self.discriminator().to_vec();
        let arg = match self {
            RentalInstruction::Initialize { rent_price_per_day } => Some(rent_price_per_day),
            RentalInstruction::RentBook { days } => Some(days),
            RentalInstruction::ReturnBook => None,
        };
        if let Some(arg) = arg {
            arg.serialize(&mut data).map_err(|err| {
                RentalError::InvalidArgument(format!(
                    "cannot encode {} arguments: {err}",
                    self.name()
                ))
            })?;
        }
        Ok(data)
    }
}

/// `namespace:name` 의 sha256 앞 8바이트
pub fn anchor_discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// 역할 → 주소
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSet(BTreeMap<AccountRole, Pubkey>);

impl AccountSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: AccountRole, address: Pubkey) -> Self {
        self.0.insert(role, address);
        self
    }

    pub fn get(&self, role: AccountRole) -> Option<&Pubkey> {
        self.0.get(&role)
    }
}

/// 제출 단위: 명령 + 계정 매핑
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramCall {
    pub instruction: RentalInstruction,
    pub accounts: AccountSet,
}

impl ProgramCall {
    pub fn new(instruction: RentalInstruction, accounts: AccountSet) -> Self {
        Self {
            instruction,
            accounts,
        }
    }

    fn require(&self, role: AccountRole) -> Result<Pubkey, RentalError> {
        self.accounts.get(role).copied().ok_or_else(|| {
            RentalError::InvalidArgument(format!(
                "{} requires account `{}`",
                self.instruction.name(),
                role.as_str()
            ))
        })
    }

    /// 레이아웃과 서명자 집합이 정확히 일치하는지 검증
    pub fn validate(&self, signers: &[Pubkey]) -> Result<(), RentalError> {
        for spec in self.instruction.layout() {
            let address = self.require(spec.role)?;
            if spec.signer && !signers.contains(&address) {
                return Err(RentalError::MissingSigner(spec.role.as_str()));
            }
        }

        let required: Vec<Pubkey> = self
            .instruction
            .signer_roles()
            .filter_map(|role| self.accounts.get(role).copied())
            .collect();
        if let Some(extra) = signers.iter().find(|s| !required.contains(*s)) {
            return Err(RentalError::InvalidArgument(format!(
                "{} does not accept signer {extra}",
                self.instruction.name()
            )));
        }

        Ok(())
    }

    pub fn to_instruction(&self, program_id: &Pubkey) -> Result<Instruction, RentalError> {
        let accounts = self
            .instruction
            .layout()
            .iter()
            .map(|spec| {
                let address = self.require(spec.role)?;
                Ok(if spec.writable {
                    AccountMeta::new(address, spec.signer)
                } else {
                    AccountMeta::new_readonly(address, spec.signer)
                })
            })
            .collect::<Result<Vec<_>, RentalError>>()?;

        Ok(Instruction {
            program_id: *program_id,
            accounts,
            data: self.instruction.data()?,
        })
    }

    /// 검증 후 서명된 트랜잭션 생성
    pub fn build_transaction(
        &self,
        program_id: &Pubkey,
        signers: &[&Keypair],
        recent_blockhash: Hash,
    ) -> Result<Transaction, RentalError> {
        let signer_keys: Vec<Pubkey> = signers.iter().map(|k| k.pubkey()).collect();
        self.validate(&signer_keys)?;

        let payer = self.require(self.instruction.fee_payer())?;
        let instruction = self.to_instruction(program_id)?;

        let mut tx = Transaction::new_with_payer(&[instruction], Some(&payer));
        tx.try_sign(signers, recent_blockhash)
            .map_err(|err| RentalError::InvalidArgument(format!("signing failed: {err}")))?;
        Ok(tx)
    }
}

/// 온체인 `BookRental` 계정 레이아웃
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BookRentalAccount {
    pub owner: [u8; 32],
    pub renter: Option<[u8; 32]>,
    pub rent_price_per_day: u64,
    pub rental_duration: Option<u64>,
    pub rental_start_time: Option<i64>,
}

impl BookRentalAccount {
    pub fn new(owner: Pubkey, rent_price_per_day: u64) -> Self {
        Self {
            owner: owner.to_bytes(),
            renter: None,
            rent_price_per_day,
            rental_duration: None,
            rental_start_time: None,
        }
    }

    pub fn owner(&self) -> Pubkey {
        Pubkey::new_from_array(self.owner)
    }

    pub fn renter(&self) -> Option<Pubkey> {
        self.renter.map(Pubkey::new_from_array)
    }

    pub fn discriminator() -> [u8; 8] {
        anchor_discriminator("account", "BookRental")
    }

    /// discriminator 확인 후 디코드 (Anchor가 잡아둔 여분 공간은 무시)
    pub fn decode(data: &[u8]) -> Result<Self, RentalError> {
        if data.len() < 8 || data[..8] != Self::discriminator() {
            return Err(RentalError::InvalidArgument(
                "account is not a BookRental".to_string(),
            ));
        }
        let mut body = &data[8..];
        BookRentalAccount::deserialize(&mut body)
            .map_err(|err| RentalError::InvalidArgument(format!("corrupt BookRental: {err}")))
    }

    pub fn to_offer(&self, address: &Pubkey) -> RentalOffer {
        RentalOffer {
            address: address.to_string(),
            owner: self.owner().to_string(),
            renter: self.renter().map(|r| r.to_string()),
            rent_price_per_day: self.rent_price_per_day,
            rental_duration: self.rental_duration,
            rental_start_time: self.rental_start_time,
            status: if self.renter.is_some() {
                OfferStatus::Rented
            } else {
                OfferStatus::Available
            },
        }
    }
}
