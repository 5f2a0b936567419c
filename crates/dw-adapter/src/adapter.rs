use async_trait::async_trait;

use crate::error::Result;
use crate::tables::{BalanceRow, CommandRowUpdate, DocumentTables, OpenOrderRow, TrackedDocument};

/// The narrow capability the engine consumes from whatever collaborative
/// document host it is bound to (spec.md §4.4). The host itself is out of
/// scope; only this interface and one in-memory implementation live here.
#[async_trait]
pub trait DocumentAdapter: Send + Sync {
    async fn list_tracked_documents(&self) -> Result<Vec<TrackedDocument>>;

    async fn load_tables(&self, doc_id: &str) -> Result<DocumentTables>;

    async fn append_command_row(
        &self,
        doc_id: &str,
        cmd_id: &str,
        raw: &str,
        status: &str,
        url: Option<&str>,
        result: Option<&str>,
        error: Option<&str>,
    ) -> Result<()>;

    async fn update_command_row(
        &self,
        doc_id: &str,
        row_index: usize,
        update: CommandRowUpdate,
    ) -> Result<()>;

    async fn append_audit_row(&self, doc_id: &str, timestamp_iso: &str, message: &str) -> Result<()>;

    async fn append_activity_row(
        &self,
        doc_id: &str,
        timestamp_iso: &str,
        r#type: &str,
        details: &str,
        tx_ref: Option<&str>,
    ) -> Result<()>;

    async fn write_config_batch(&self, doc_id: &str, entries: &[(String, String)]) -> Result<()>;

    async fn write_balances_snapshot(&self, doc_id: &str, rows: Vec<BalanceRow>) -> Result<()>;

    async fn write_open_orders(&self, doc_id: &str, rows: Vec<OpenOrderRow>) -> Result<()>;
}
