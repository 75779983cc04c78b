//! Capability interface for the remote testbed control plane.
//!
//! Components depend on [`TestbedClient`] rather than a concrete SDK, so
//! tests substitute scripted doubles that walk deterministic state
//! sequences. The shipped implementation is [`http::HttpTestbed`].

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a submitted slice, assigned by the testbed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceId(pub String);

impl std::fmt::Display for SliceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single-node slice creation request. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct SliceRequest {
    pub name: String,
    pub site: String,
    pub image: String,
    pub node_name: String,
    pub cores: u32,
    pub ram_gb: u32,
    pub disk_gb: u32,
}

impl SliceRequest {
    /// Derive a per-run unique slice name from a prefix and an instant.
    pub fn unique_name(prefix: &str, now: DateTime<Utc>) -> String {
        format!("{}-{}", prefix, now.timestamp())
    }
}

/// Whose slices a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    SelfOnly,
    Project,
}

/// Listing criteria. Exclusions are passed to the remote query, not
/// applied as a post-filter.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub name_filter: Option<String>,
    pub include_terminal: bool,
    pub scope: Scope,
}

impl ListQuery {
    /// Terminal lifecycle states excluded unless `include_terminal`.
    pub fn excluded_states(&self) -> &'static [&'static str] {
        if self.include_terminal {
            &[]
        } else {
            &["Dead", "Closing"]
        }
    }
}

/// Read-only projection of a node within a slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSummary {
    pub name: String,
    /// Absent until provisioning assigns one.
    pub management_ip: Option<String>,
    /// Best-effort when the IP is still missing.
    pub ssh_command: String,
}

/// Read-only projection of a slice and its nodes, recomputed per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceSummary {
    pub name: String,
    pub id: SliceId,
    pub state: String,
    pub lease_end: Option<DateTime<Utc>>,
    pub nodes: Vec<NodeSummary>,
}

/// Classification of a remote-reported state string.
///
/// Matching is by substring: "Stable" or "OK" are the only success
/// markers, and `Failed` does not stop the polling loop; a permanently
/// failed slice is indistinguishable from a slow one until the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Stable,
    Failed,
    Transitional,
}

impl StateClass {
    pub fn classify(state: &str) -> Self {
        if state.contains("Stable") || state.contains("OK") {
            StateClass::Stable
        } else if state.contains("Dead") || state.contains("Closing") || state.contains("Fail") {
            StateClass::Failed
        } else {
            StateClass::Transitional
        }
    }
}

/// Operations the remote provisioning service exposes.
#[async_trait]
pub trait TestbedClient: Send + Sync {
    /// Pick a site for placement when the operator did not name one.
    async fn select_site(&self) -> anyhow::Result<String>;

    /// Submit a slice request. Provisioning starts here. One attempt,
    /// never retried.
    async fn submit_slice(&self, request: &SliceRequest) -> anyhow::Result<SliceId>;

    /// Current raw lifecycle state of a slice.
    async fn slice_state(&self, id: &SliceId) -> anyhow::Result<String>;

    /// Slices visible under the query, live at call time.
    async fn list_slices(&self, query: &ListQuery) -> anyhow::Result<Vec<SliceSummary>>;

    /// Verify local configuration and renew bastion keys if needed.
    async fn verify_and_configure(&self) -> anyhow::Result<()>;
}
