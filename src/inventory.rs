//! Live slice and node listings with derived connection info.

use crate::errors::AppError;
use crate::testbed::{ListQuery, SliceSummary, TestbedClient};

pub struct Reporter<'a> {
    testbed: &'a dyn TestbedClient,
}

impl<'a> Reporter<'a> {
    pub fn new(testbed: &'a dyn TestbedClient) -> Self {
        Self { testbed }
    }

    /// Slices visible under `query`. Always live remote state; nothing is
    /// cached between calls.
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<SliceSummary>, AppError> {
        self.testbed
            .list_slices(query)
            .await
            .map_err(AppError::Internal)
    }
}

/// Render one slice block in the operator listing format: a header line,
/// then one indented line per node.
pub fn render(slice: &SliceSummary) -> String {
    let lease = slice
        .lease_end
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "None".into());
    let mut out = format!(
        "Slice \"{}\" | ID {} | State {} | Lease End {}\n",
        slice.name, slice.id, slice.state, lease
    );
    if slice.nodes.is_empty() {
        out.push_str("  (no nodes)\n");
        return out;
    }
    for node in &slice.nodes {
        let ip = node.management_ip.as_deref().unwrap_or("None");
        out.push_str(&format!(
            "  {:<12} ip={}  ssh=\"{}\"\n",
            node.name, ip, node.ssh_command
        ));
    }
    out
}
