//! Resolves the effective policy bound to a document (spec.md §6's policy
//! record). Policies are authored as JSON and stored as a single `policy`
//! row in the document's Config table; absence means no restrictions.

use dw_adapter::DocumentAdapter;
use dw_policy::Policy;

use crate::error::Result;

pub async fn effective_policy(adapter: &dyn DocumentAdapter, doc_id: &str) -> Result<Policy> {
    let tables = adapter.load_tables(doc_id).await?;
    for row in &tables.config {
        if row.key == "policy" {
            if let Ok(policy) = serde_json::from_str::<Policy>(&row.value) {
                return Ok(policy);
            }
        }
    }
    Ok(Policy::default())
}
