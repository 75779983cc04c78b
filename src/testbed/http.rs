//! reqwest-backed [`TestbedClient`] against the control-plane JSON API.
//!
//! The wire surface is deliberately thin: every call is a single request
//! with no transport-level retries. The only repetition in this tool is
//! the orchestrator's fixed-interval state polling.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use url::Url;

use super::{ListQuery, Scope, SliceId, SliceRequest, SliceSummary, TestbedClient};
use crate::token::raw_bearer;

#[derive(Debug)]
pub struct HttpTestbed {
    client: reqwest::Client,
    base: Url,
    project_id: Option<String>,
}

impl HttpTestbed {
    /// Build the client. Fails fast on a bad base URL or an unreadable
    /// token file, before any provisioning side effect can happen.
    pub fn new(
        base_url: &str,
        token_location: &Path,
        project_id: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url)
            .with_context(|| format!("invalid orchestrator URL: {base_url}"))?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let bearer = read_bearer(token_location)?;
        let mut auth = HeaderValue::from_str(&format!("Bearer {bearer}"))
            .context("token contains characters not valid in a header")?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base,
            project_id,
        })
    }

    fn endpoint(&self, path: &str) -> anyhow::Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("invalid endpoint path: {path}"))
    }

    /// One X-Request-Id per call so operator actions can be correlated
    /// with control-plane logs.
    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("x-request-id", uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    slice_id: SliceId,
}

#[derive(Debug, Deserialize)]
struct StateResponse {
    state: String,
}

#[derive(Debug, Deserialize)]
struct SiteResponse {
    name: String,
}

/// Surface non-2xx responses as errors carrying the body, which is where
/// the control plane puts quota and auth details.
async fn checked(resp: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(anyhow!("testbed returned {status}: {body}"))
}

#[async_trait]
impl TestbedClient for HttpTestbed {
    async fn select_site(&self) -> anyhow::Result<String> {
        let url = self.endpoint("sites/random")?;
        let resp = self
            .request(self.client.get(url))
            .send()
            .await
            .context("site selection request failed")?;
        let site: SiteResponse = checked(resp)
            .await?
            .json()
            .await
            .context("malformed site response from testbed")?;
        Ok(site.name)
    }

    async fn submit_slice(&self, request: &SliceRequest) -> anyhow::Result<SliceId> {
        let mut url = self.endpoint("slices")?;
        if let Some(project) = &self.project_id {
            url.query_pairs_mut().append_pair("project_id", project);
        }
        let resp = self
            .request(self.client.post(url))
            .json(request)
            .send()
            .await
            .context("slice submission request failed")?;
        let submitted: SubmitResponse = checked(resp)
            .await?
            .json()
            .await
            .context("malformed submission response from testbed")?;
        Ok(submitted.slice_id)
    }

    async fn slice_state(&self, id: &SliceId) -> anyhow::Result<String> {
        let url = self.endpoint(&format!("slices/{id}/state"))?;
        let resp = self
            .request(self.client.get(url))
            .send()
            .await
            .context("slice state request failed")?;
        let state: StateResponse = checked(resp)
            .await?
            .json()
            .await
            .context("malformed state response from testbed")?;
        Ok(state.state)
    }

    async fn list_slices(&self, query: &ListQuery) -> anyhow::Result<Vec<SliceSummary>> {
        let mut url = self.endpoint("slices")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(name) = &query.name_filter {
                pairs.append_pair("name", name);
            }
            pairs.append_pair(
                "user_only",
                if query.scope == Scope::SelfOnly { "true" } else { "false" },
            );
            pairs.append_pair("include_unsubmitted", "true");
            for state in query.excluded_states() {
                pairs.append_pair("exclude", state);
            }
            if let Some(project) = &self.project_id {
                pairs.append_pair("project_id", project);
            }
        }
        let resp = self
            .request(self.client.get(url))
            .send()
            .await
            .context("slice listing request failed")?;
        checked(resp)
            .await?
            .json()
            .await
            .context("malformed slice listing from testbed")
    }

    async fn verify_and_configure(&self) -> anyhow::Result<()> {
        let url = self.endpoint("config/verify")?;
        let resp = self
            .request(self.client.post(url))
            .send()
            .await
            .context("verify-and-configure request failed")?;
        checked(resp).await?;
        Ok(())
    }
}

fn read_bearer(path: &Path) -> anyhow::Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read token file at {}", path.display()))?;
    let doc: serde_json::Value =
        serde_json::from_str(&raw).context("token file is not valid JSON")?;
    raw_bearer(&doc)
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("token file has no bearer token field"))
}
