//! Provisioning, listing, and maintenance flows against a scripted
//! testbed double.
//!
//! Clock-sensitive cases run on tokio's paused clock, so fixed-interval
//! polling costs no wall time and elapsed figures are deterministic.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use slicectl::errors::AppError;
use slicectl::inventory::Reporter;
use slicectl::maintain::CredentialMaintainer;
use slicectl::provision::{Orchestrator, Provisioned};
use slicectl::testbed::{
    ListQuery, NodeSummary, Scope, SliceId, SliceRequest, SliceSummary, TestbedClient,
};
use slicectl::token::FreshnessChecker;

/// Testbed double that walks a scripted state sequence. The final state
/// repeats once the script is exhausted.
struct ScriptedTestbed {
    states: Mutex<Vec<String>>,
    submit_error: Option<String>,
    slices: Vec<SliceSummary>,
    submits: AtomicU32,
    polls: AtomicU32,
    verifies: AtomicU32,
    last_query: Mutex<Option<ListQuery>>,
}

impl ScriptedTestbed {
    fn new() -> Self {
        Self {
            states: Mutex::new(Vec::new()),
            submit_error: None,
            slices: Vec::new(),
            submits: AtomicU32::new(0),
            polls: AtomicU32::new(0),
            verifies: AtomicU32::new(0),
            last_query: Mutex::new(None),
        }
    }

    fn with_states(states: &[&str]) -> Self {
        let mut double = Self::new();
        double.states = Mutex::new(states.iter().map(|s| (*s).to_owned()).collect());
        double
    }

    fn failing_submission(message: &str) -> Self {
        let mut double = Self::new();
        double.submit_error = Some(message.to_owned());
        double
    }

    fn with_slices(slices: Vec<SliceSummary>) -> Self {
        let mut double = Self::new();
        double.slices = slices;
        double
    }
}

#[async_trait]
impl TestbedClient for ScriptedTestbed {
    async fn select_site(&self) -> anyhow::Result<String> {
        Ok("TACC".into())
    }

    async fn submit_slice(&self, request: &SliceRequest) -> anyhow::Result<SliceId> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.submit_error {
            anyhow::bail!("{message}");
        }
        Ok(SliceId(format!("slice-{}", request.name)))
    }

    async fn slice_state(&self, _id: &SliceId) -> anyhow::Result<String> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut states = self.states.lock().unwrap();
        if states.len() > 1 {
            Ok(states.remove(0))
        } else {
            Ok(states
                .first()
                .cloned()
                .unwrap_or_else(|| "Configuring".into()))
        }
    }

    async fn list_slices(&self, query: &ListQuery) -> anyhow::Result<Vec<SliceSummary>> {
        *self.last_query.lock().unwrap() = Some(query.clone());
        Ok(self.slices.clone())
    }

    async fn verify_and_configure(&self) -> anyhow::Result<()> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn request() -> SliceRequest {
    SliceRequest {
        name: "wsl-demo-1700000000".into(),
        site: "TACC".into(),
        image: "default_ubuntu_20".into(),
        node_name: "node1".into(),
        cores: 2,
        ram_gb: 4,
        disk_gb: 10,
    }
}

const TIMEOUT: Duration = Duration::from_secs(600);
const INTERVAL: Duration = Duration::from_secs(15);

// ── Provisioning ─────────────────────────────────────────────

/// "Configuring" for N polls, then a success marker: stable after exactly
/// N+1 polls, elapsed consistent with N * interval.
#[tokio::test(start_paused = true)]
async fn stable_after_n_transitional_polls() {
    let testbed =
        ScriptedTestbed::with_states(&["Configuring", "Configuring", "Configuring", "Active Stable"]);
    let outcome = Orchestrator::new(&testbed)
        .provision(&request(), TIMEOUT, INTERVAL)
        .await
        .unwrap();

    match outcome {
        Provisioned::Stable { polls, elapsed, .. } => {
            assert_eq!(polls, 4);
            assert_eq!(elapsed, Duration::from_secs(45));
        }
        other => panic!("expected Stable, got {other:?}"),
    }
    assert_eq!(testbed.submits.load(Ordering::SeqCst), 1);
    assert_eq!(testbed.polls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn immediately_stable_needs_one_poll() {
    let testbed = ScriptedTestbed::with_states(&["Stable"]);
    let outcome = Orchestrator::new(&testbed)
        .provision(&request(), TIMEOUT, INTERVAL)
        .await
        .unwrap();

    match outcome {
        Provisioned::Stable { polls, elapsed, slice } => {
            assert_eq!(polls, 1);
            assert_eq!(elapsed, Duration::ZERO);
            assert_eq!(slice, SliceId("slice-wsl-demo-1700000000".into()));
        }
        other => panic!("expected Stable, got {other:?}"),
    }
}

/// A slice that never reaches a success marker times out instead of
/// polling forever.
#[tokio::test(start_paused = true)]
async fn never_stable_times_out() {
    let testbed = ScriptedTestbed::with_states(&["Configuring"]);
    let outcome = Orchestrator::new(&testbed)
        .provision(&request(), TIMEOUT, INTERVAL)
        .await
        .unwrap();

    match outcome {
        Provisioned::TimedOut {
            last_state,
            elapsed,
            ..
        } => {
            assert_eq!(last_state, "Configuring");
            assert!(elapsed > TIMEOUT);
        }
        other => panic!("expected TimedOut, got {other:?}"),
    }
    // Poll at t=0, then every 15s; the first poll past the 600s bound
    // lands at 615s, i.e. poll number 42.
    assert_eq!(testbed.polls.load(Ordering::SeqCst), 42);
}

/// Failed-looking remote states are not a fast path: they poll until the
/// timeout, same as slow ones.
#[tokio::test(start_paused = true)]
async fn failed_state_polls_until_timeout() {
    let testbed = ScriptedTestbed::with_states(&["Dead"]);
    let outcome = Orchestrator::new(&testbed)
        .provision(&request(), TIMEOUT, INTERVAL)
        .await
        .unwrap();

    match outcome {
        Provisioned::TimedOut { last_state, .. } => assert_eq!(last_state, "Dead"),
        other => panic!("expected TimedOut, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn submission_failure_is_an_error_not_an_outcome() {
    let testbed = ScriptedTestbed::failing_submission("quota exceeded at TACC");
    let err = Orchestrator::new(&testbed)
        .provision(&request(), TIMEOUT, INTERVAL)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Submission(_)));
    assert_eq!(err.exit_code(), 1);
    // One attempt, no retry, and nothing was ever polled.
    assert_eq!(testbed.submits.load(Ordering::SeqCst), 1);
    assert_eq!(testbed.polls.load(Ordering::SeqCst), 0);
}

/// The token gate runs before the client is touched: a blocked token
/// means zero remote calls.
#[tokio::test]
async fn blocked_token_stops_before_any_remote_call() {
    let testbed = ScriptedTestbed::with_states(&["Stable"]);
    let gate = FreshnessChecker::new(Some("/nonexistent/tokens.json".into())).gate();

    let err = gate.unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(testbed.submits.load(Ordering::SeqCst), 0);
    assert_eq!(testbed.polls.load(Ordering::SeqCst), 0);
}

// ── Listing ──────────────────────────────────────────────────

fn fixture_slice(nodes: Vec<NodeSummary>) -> SliceSummary {
    SliceSummary {
        name: "wsl-demo-1700000000".into(),
        id: SliceId("c0ffee".into()),
        state: "StableOK".into(),
        lease_end: None,
        nodes,
    }
}

#[tokio::test]
async fn default_listing_excludes_terminal_states_remotely() {
    let testbed = ScriptedTestbed::with_slices(vec![fixture_slice(vec![])]);
    let query = ListQuery {
        name_filter: None,
        include_terminal: false,
        scope: Scope::SelfOnly,
    };
    Reporter::new(&testbed).list(&query).await.unwrap();

    let seen = testbed.last_query.lock().unwrap().clone().unwrap();
    assert_eq!(seen.excluded_states(), ["Dead", "Closing"]);
}

#[tokio::test]
async fn all_flag_includes_terminal_states() {
    let testbed = ScriptedTestbed::with_slices(vec![]);
    let query = ListQuery {
        name_filter: Some("wsl-demo".into()),
        include_terminal: true,
        scope: Scope::Project,
    };
    Reporter::new(&testbed).list(&query).await.unwrap();

    let seen = testbed.last_query.lock().unwrap().clone().unwrap();
    assert!(seen.excluded_states().is_empty());
    assert_eq!(seen.name_filter.as_deref(), Some("wsl-demo"));
}

#[tokio::test]
async fn zero_slices_is_an_empty_listing_not_an_error() {
    let testbed = ScriptedTestbed::with_slices(vec![]);
    let query = ListQuery {
        name_filter: None,
        include_terminal: false,
        scope: Scope::SelfOnly,
    };
    let slices = Reporter::new(&testbed).list(&query).await.unwrap();
    assert!(slices.is_empty());
}

#[tokio::test]
async fn nodes_without_ips_still_carry_ssh_commands() {
    let testbed = ScriptedTestbed::with_slices(vec![fixture_slice(vec![NodeSummary {
        name: "node1".into(),
        management_ip: None,
        ssh_command: "ssh -F ssh_config ubuntu@node1".into(),
    }])]);
    let query = ListQuery {
        name_filter: None,
        include_terminal: false,
        scope: Scope::SelfOnly,
    };
    let slices = Reporter::new(&testbed).list(&query).await.unwrap();

    let node = &slices[0].nodes[0];
    assert!(node.management_ip.is_none());
    assert!(!node.ssh_command.is_empty());
    let rendered = slicectl::inventory::render(&slices[0]);
    assert!(rendered.contains("ip=None"));
    assert!(rendered.contains("ssh=\"ssh -F ssh_config ubuntu@node1\""));
}

// ── Maintenance ──────────────────────────────────────────────

#[tokio::test]
async fn renew_delegates_exactly_once() {
    let testbed = ScriptedTestbed::new();
    CredentialMaintainer::new(&testbed).renew().await.unwrap();
    assert_eq!(testbed.verifies.load(Ordering::SeqCst), 1);
}
