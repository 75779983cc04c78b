//! Credential and bastion-key maintenance.
//!
//! Pure delegation, and deliberately not freshness-gated: renewal is most
//! often run with a token at or near expiry.

use tracing::info;

use crate::errors::AppError;
use crate::testbed::TestbedClient;

pub struct CredentialMaintainer<'a> {
    testbed: &'a dyn TestbedClient,
}

impl<'a> CredentialMaintainer<'a> {
    pub fn new(testbed: &'a dyn TestbedClient) -> Self {
        Self { testbed }
    }

    /// Run the remote verify-and-configure routine once. No retry, no
    /// result interpretation beyond success or error.
    pub async fn renew(&self) -> Result<(), AppError> {
        info!("verifying configuration and renewing bastion keys if needed");
        self.testbed
            .verify_and_configure()
            .await
            .map_err(AppError::Internal)?;
        info!("done; SSH config should be updated");
        Ok(())
    }
}
