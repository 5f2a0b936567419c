//! Row types for the document tables enumerated in spec.md §6.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedDocument {
    pub doc_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRow {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTableRow {
    pub id: String,
    pub command: String,
    pub status: String,
    pub approval_url: Option<String>,
    pub result: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub location: String,
    pub asset: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    pub timestamp: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRow {
    pub timestamp: String,
    pub r#type: String,
    pub details: String,
    pub tx_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrderRow {
    pub order_id: String,
    pub side: String,
    pub price: Decimal,
    pub qty: Decimal,
    pub status: String,
    pub updated_at: String,
    pub tx: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub session_id: String,
    pub peer_name: String,
    pub chains: String,
    pub created_at: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRow {
    pub user: String,
    pub agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRuleRow {
    pub label: String,
    pub recipient: String,
    pub amount: Decimal,
    pub frequency: String,
    pub next_run: Option<String>,
    pub last_tx: Option<String>,
    pub status: String,
}

/// `loadTables` return shape (spec.md §4.4); each field keeps the row's
/// stable index as the adapter's own identity, independent of `Vec` index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentTables {
    pub config: Vec<ConfigRow>,
    pub commands: Vec<CommandTableRow>,
    pub balances: Vec<BalanceRow>,
    pub audit: Vec<AuditRow>,
    pub activity: Vec<ActivityRow>,
    pub orders: Vec<OpenOrderRow>,
    pub sessions: Vec<SessionRow>,
    pub chat: Vec<ChatRow>,
}

/// Partial update applied to a single commands-table row by row index
/// (`updateCommandRow`, spec.md §4.4).
#[derive(Debug, Clone, Default)]
pub struct CommandRowUpdate {
    pub status: Option<String>,
    pub approval_url: Option<String>,
    pub result: Option<String>,
    pub error: Option<String>,
}
