//! Entities (spec.md §3). Plain structs — rows are mapped by hand in
//! `store.rs`, the same way the teacher workspace maps `sqlx::Row` into
//! its `Offer`/`Asset` models rather than deriving `FromRow` everywhere.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type Timestamp = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub display_name: String,
    pub created_at: Timestamp,
    pub bound_policy_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub doc_id: String,
    pub address: String,
    pub weight: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    Invalid,
    Raw,
    PendingApproval,
    Approved,
    Executing,
    Executed,
    Failed,
    Rejected,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::Raw => "RAW",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Executing => "EXECUTING",
            Self::Executed => "EXECUTED",
            Self::Failed => "FAILED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "INVALID" => Self::Invalid,
            "RAW" => Self::Raw,
            "PENDING_APPROVAL" => Self::PendingApproval,
            "APPROVED" => Self::Approved,
            "EXECUTING" => Self::Executing,
            "EXECUTED" => Self::Executed,
            "FAILED" => Self::Failed,
            "REJECTED" => Self::Rejected,
            _ => return None,
        })
    }

    /// Terminal statuses never transition again (spec.md §3, §8).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Failed | Self::Rejected | Self::Invalid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRow {
    pub cmd_id: String,
    pub doc_id: String,
    pub raw_text: String,
    pub parsed_value: Option<serde_json::Value>,
    pub parse_error: Option<String>,
    pub status: CommandStatus,
    pub approval_url: Option<String>,
    pub result_text: Option<String>,
    pub error_text: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub schedule_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

impl ApprovalDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "APPROVE" => Some(Self::Approve),
            "REJECT" => Some(Self::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandApproval {
    pub doc_id: String,
    pub cmd_id: String,
    pub signer_address: String,
    pub decision: ApprovalDecision,
    pub created_at: Timestamp,
}

/// Running weighted tally returned by `record_approval` / read by
/// `promote_if_quorum` (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApprovalTally {
    pub approve_weight: i64,
    pub reject_weight: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromoteOutcome {
    pub promoted: bool,
    pub new_status: CommandStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Active,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: String,
    pub doc_id: String,
    pub inner_command: String,
    pub interval_hours: i32,
    pub next_run_at: Timestamp,
    pub total_runs: i32,
    pub status: ScheduleStatus,
    pub last_run_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChannelSession {
    pub doc_id: String,
    pub session_id: String,
    pub version: i32,
    pub status: String,
    pub last_signers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKey {
    pub doc_id: String,
    pub signer_address: String,
    pub delegated_public_key: String,
    pub encrypted_private: Vec<u8>,
    pub expires_at: Timestamp,
    pub allowances_json: Option<serde_json::Value>,
}

impl SessionKey {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodialWallet {
    pub doc_id: String,
    pub provider_wallet_id: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub doc_id: String,
    pub side: String,
    pub qty: Decimal,
    pub price: Decimal,
    pub notional: Decimal,
    pub fee_usd: Decimal,
    pub realised_pnl_usd: Decimal,
    pub created_at: Timestamp,
}

pub const COUNTER_APPROVALS_TOTAL: &str = "approvals_total";
pub const COUNTER_APPROVAL_TX_AVOIDED: &str = "approval_tx_avoided";
pub const COUNTER_COMMANDS_EXECUTED: &str = "commands_executed";
