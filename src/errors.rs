use thiserror::Error;

/// Failures surfaced to the operator. Each variant maps to a distinct
/// process exit code so wrapper scripts can tell precondition problems
/// from provisioning ones.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("FABRIC_TOKEN_LOCATION is not set")]
    TokenLocationUnset,

    #[error("token unreadable or missing at {path}")]
    TokenUnreadable { path: String },

    #[error("token expired at {expired_at}")]
    TokenExpired { expired_at: String },

    #[error("testbed client init failed: {0:#}")]
    ClientInit(anyhow::Error),

    #[error("slice creation failed: {0:#}")]
    Submission(anyhow::Error),

    #[error("slice state poll failed: {0:#}")]
    Poll(anyhow::Error),

    #[error("slice {slice} timed out after {elapsed_secs}s waiting for stable (last state: {last_state})")]
    Timeout {
        slice: String,
        elapsed_secs: u64,
        last_state: String,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Exit code contract: 0 success, 2 precondition failure, 3 timeout,
    /// 1 anything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::TokenLocationUnset
            | AppError::TokenUnreadable { .. }
            | AppError::TokenExpired { .. }
            | AppError::ClientInit(_) => 2,
            AppError::Timeout { .. } => 3,
            AppError::Submission(_) | AppError::Poll(_) | AppError::Internal(_) => 1,
        }
    }

    /// Remediation hint printed under the error line, when there is one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AppError::TokenLocationUnset | AppError::ClientInit(_) => {
                Some("did you source your fabric_rc in this shell?")
            }
            AppError::TokenExpired { .. } => Some("download a new token from the portal"),
            AppError::Submission(_) => Some(
                "common causes: wrong site name, quota/capacity, wrong image name, auth/config issues",
            ),
            AppError::Timeout { .. } => {
                Some("check the portal for sliver errors; the slice is left in place")
            }
            AppError::TokenUnreadable { .. } | AppError::Poll(_) | AppError::Internal(_) => None,
        }
    }
}
