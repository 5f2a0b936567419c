//! Fully in-memory `DocumentAdapter`, used for the engine binary's default
//! configuration and for integration tests — the collaborative-document
//! host itself is out of scope (spec.md §1), the same way the teacher's
//! indexer only implements the Horizon poll transport and leaves streaming
//! as a documented, not-yet-wired mode.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::adapter::DocumentAdapter;
use crate::error::{AdapterError, Result};
use crate::tables::{
    BalanceRow, CommandRowUpdate, CommandTableRow, DocumentTables, OpenOrderRow, TrackedDocument,
};

pub struct MemoryAdapter {
    names: RwLock<HashMap<String, String>>,
    tables: RwLock<HashMap<String, DocumentTables>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            names: RwLock::new(HashMap::new()),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Test/bootstrap helper: register a document the engine should see on
    /// its next discovery tick.
    pub fn track_document(&self, doc_id: impl Into<String>, display_name: impl Into<String>) {
        let doc_id = doc_id.into();
        self.names.write().unwrap().insert(doc_id.clone(), display_name.into());
        self.tables.write().unwrap().entry(doc_id).or_default();
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentAdapter for MemoryAdapter {
    async fn list_tracked_documents(&self) -> Result<Vec<TrackedDocument>> {
        Ok(self
            .names
            .read()
            .unwrap()
            .iter()
            .map(|(doc_id, display_name)| TrackedDocument {
                doc_id: doc_id.clone(),
                display_name: display_name.clone(),
            })
            .collect())
    }

    async fn load_tables(&self, doc_id: &str) -> Result<DocumentTables> {
        self.tables
            .read()
            .unwrap()
            .get(doc_id)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownDocument(doc_id.to_string()))
    }

    async fn append_command_row(
        &self,
        doc_id: &str,
        cmd_id: &str,
        raw: &str,
        status: &str,
        url: Option<&str>,
        result: Option<&str>,
        error: Option<&str>,
    ) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let doc = tables
            .get_mut(doc_id)
            .ok_or_else(|| AdapterError::UnknownDocument(doc_id.to_string()))?;
        doc.commands.push(CommandTableRow {
            id: cmd_id.to_string(),
            command: raw.to_string(),
            status: status.to_string(),
            approval_url: url.map(str::to_string),
            result: result.map(str::to_string),
            error: error.map(str::to_string),
        });
        Ok(())
    }

    async fn update_command_row(
        &self,
        doc_id: &str,
        row_index: usize,
        update: CommandRowUpdate,
    ) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let doc = tables
            .get_mut(doc_id)
            .ok_or_else(|| AdapterError::UnknownDocument(doc_id.to_string()))?;
        let row = doc
            .commands
            .get_mut(row_index)
            .ok_or_else(|| AdapterError::RowDrift { table: "commands".to_string(), row_index })?;

        if let Some(status) = update.status {
            row.status = status;
        }
        if let Some(url) = update.approval_url {
            row.approval_url = Some(url);
        }
        if let Some(result) = update.result {
            row.result = Some(result);
        }
        if let Some(error) = update.error {
            row.error = Some(error);
        }
        Ok(())
    }

    async fn append_audit_row(&self, doc_id: &str, timestamp_iso: &str, message: &str) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let doc = tables
            .get_mut(doc_id)
            .ok_or_else(|| AdapterError::UnknownDocument(doc_id.to_string()))?;
        doc.audit.push(crate::tables::AuditRow {
            timestamp: timestamp_iso.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn append_activity_row(
        &self,
        doc_id: &str,
        timestamp_iso: &str,
        r#type: &str,
        details: &str,
        tx_ref: Option<&str>,
    ) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let doc = tables
            .get_mut(doc_id)
            .ok_or_else(|| AdapterError::UnknownDocument(doc_id.to_string()))?;
        doc.activity.push(crate::tables::ActivityRow {
            timestamp: timestamp_iso.to_string(),
            r#type: r#type.to_string(),
            details: details.to_string(),
            tx_ref: tx_ref.map(str::to_string),
        });
        Ok(())
    }

    async fn write_config_batch(&self, doc_id: &str, entries: &[(String, String)]) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let doc = tables
            .get_mut(doc_id)
            .ok_or_else(|| AdapterError::UnknownDocument(doc_id.to_string()))?;
        for (key, value) in entries {
            match doc.config.iter_mut().find(|row| &row.key == key) {
                Some(row) => row.value = value.clone(),
                None => doc.config.push(crate::tables::ConfigRow { key: key.clone(), value: value.clone() }),
            }
        }
        Ok(())
    }

    async fn write_balances_snapshot(&self, doc_id: &str, rows: Vec<BalanceRow>) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let doc = tables
            .get_mut(doc_id)
            .ok_or_else(|| AdapterError::UnknownDocument(doc_id.to_string()))?;
        doc.balances = rows;
        Ok(())
    }

    async fn write_open_orders(&self, doc_id: &str, rows: Vec<OpenOrderRow>) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let doc = tables
            .get_mut(doc_id)
            .ok_or_else(|| AdapterError::UnknownDocument(doc_id.to_string()))?;
        doc.orders = rows;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_document_is_rejected() {
        let adapter = MemoryAdapter::new();
        let err = adapter.load_tables("missing").await.unwrap_err();
        assert!(matches!(err, AdapterError::UnknownDocument(_)));
    }

    #[tokio::test]
    async fn command_rows_round_trip_through_append_and_update() {
        let adapter = MemoryAdapter::new();
        adapter.track_document("doc-1", "Treasury");

        adapter
            .append_command_row("doc-1", "cmd-1", "DW STATUS", "RAW", None, None, None)
            .await
            .unwrap();

        adapter
            .update_command_row(
                "doc-1",
                0,
                CommandRowUpdate { status: Some("EXECUTED".to_string()), ..Default::default() },
            )
            .await
            .unwrap();

        let tables = adapter.load_tables("doc-1").await.unwrap();
        assert_eq!(tables.commands.len(), 1);
        assert_eq!(tables.commands[0].status, "EXECUTED");
    }

    #[tokio::test]
    async fn stale_row_index_is_reported_as_drift() {
        let adapter = MemoryAdapter::new();
        adapter.track_document("doc-1", "Treasury");

        let err = adapter
            .update_command_row("doc-1", 4, CommandRowUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::RowDrift { .. }));
    }
}
