use std::path::PathBuf;

/// Runtime configuration, resolved once at startup. Components receive
/// the values they need instead of reading the environment themselves.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the JSON token file (`FABRIC_TOKEN_LOCATION`). Token-gated
    /// commands fail with a precondition error when unset.
    pub token_location: Option<PathBuf>,
    pub orchestrator_url: String,
    pub project_id: Option<String>,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    Ok(Config {
        token_location: std::env::var("FABRIC_TOKEN_LOCATION")
            .ok()
            .map(PathBuf::from),
        orchestrator_url: std::env::var("FABRIC_ORCHESTRATOR_URL")
            .unwrap_or_else(|_| "https://orchestrator.fabric-testbed.net".into()),
        project_id: std::env::var("FABRIC_PROJECT_ID").ok(),
    })
}
