//! Bearer-token freshness checks.
//!
//! The token is decoded, never verified: this is a UX guard that avoids
//! pointless network calls with a dead credential, not a security
//! control. A tampered token that merely claims a future expiry passes.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::errors::AppError;

/// Token-file fields accepted as the bearer token, in lookup order.
const TOKEN_FIELDS: [&str; 3] = ["id_token", "access_token", "token"];

/// Outcome of a freshness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// The `exp` claim lies in the future.
    Fresh {
        expires_at: DateTime<Utc>,
        minutes_left: i64,
    },
    /// The `exp` claim lies at or before now.
    Expired { expired_at: DateTime<Utc> },
    /// Token missing, unreadable, or without an `exp` claim.
    Unknown { reason: String, blocking: bool },
}

impl Freshness {
    /// Whether downstream network calls should be refused.
    ///
    /// An unreadable or missing token blocks; a readable token without an
    /// `exp` claim does not: it cannot be validated, so proceed.
    pub fn blocks(&self) -> bool {
        match self {
            Freshness::Fresh { .. } => false,
            Freshness::Expired { .. } => true,
            Freshness::Unknown { blocking, .. } => *blocking,
        }
    }
}

pub struct FreshnessChecker {
    token_location: Option<PathBuf>,
}

impl FreshnessChecker {
    /// The location comes from [`crate::config::Config`]; passing it in
    /// keeps the checker testable without touching process environment.
    pub fn new(token_location: Option<PathBuf>) -> Self {
        Self { token_location }
    }

    /// Check the configured token against the current clock.
    pub fn check(&self) -> Freshness {
        self.check_at(Utc::now())
    }

    /// Clock-injected variant of [`Self::check`].
    pub fn check_at(&self, now: DateTime<Utc>) -> Freshness {
        let Some(path) = &self.token_location else {
            return Freshness::Unknown {
                reason: "FABRIC_TOKEN_LOCATION is not set".into(),
                blocking: true,
            };
        };
        let Some(payload) = load_token_payload(path) else {
            return Freshness::Unknown {
                reason: format!("token unreadable or missing at {}", path.display()),
                blocking: true,
            };
        };
        classify_expiry(&payload, now)
    }

    /// Gate a token-protected command: log the verdict and convert a
    /// blocking one into the matching precondition error.
    pub fn gate(&self) -> Result<(), AppError> {
        match self.check() {
            Freshness::Fresh {
                expires_at,
                minutes_left,
            } => {
                tracing::info!(
                    expires_at = %expires_at.to_rfc3339(),
                    minutes_left,
                    "token OK"
                );
                Ok(())
            }
            Freshness::Unknown {
                reason,
                blocking: false,
            } => {
                tracing::warn!("{reason}");
                Ok(())
            }
            Freshness::Expired { expired_at } => Err(AppError::TokenExpired {
                expired_at: expired_at.to_rfc3339(),
            }),
            Freshness::Unknown { blocking: true, .. } => match &self.token_location {
                None => Err(AppError::TokenLocationUnset),
                Some(path) => Err(AppError::TokenUnreadable {
                    path: path.display().to_string(),
                }),
            },
        }
    }
}

/// Judge a decoded payload's `exp` claim against `now`.
fn classify_expiry(payload: &Value, now: DateTime<Utc>) -> Freshness {
    let Some(exp) = payload.get("exp").and_then(Value::as_i64) else {
        return Freshness::Unknown {
            reason: "token has no exp claim; cannot validate freshness".into(),
            blocking: false,
        };
    };
    let Some(exp_dt) = Utc.timestamp_opt(exp, 0).single() else {
        return Freshness::Unknown {
            reason: format!("exp claim {exp} is not a representable timestamp"),
            blocking: true,
        };
    };
    if now >= exp_dt {
        Freshness::Expired { expired_at: exp_dt }
    } else {
        Freshness::Fresh {
            expires_at: exp_dt,
            minutes_left: (exp_dt - now).num_seconds() / 60,
        }
    }
}

/// First bearer-token field present in a parsed token file.
pub fn raw_bearer(doc: &Value) -> Option<&str> {
    TOKEN_FIELDS.iter().find_map(|f| doc.get(f).and_then(Value::as_str))
}

/// Decode the payload of the bearer token held in the JSON token file.
/// Returns `None` on any shape or decode problem.
fn load_token_payload(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    let doc: Value = serde_json::from_str(&raw).ok()?;
    decode_payload(raw_bearer(&doc)?)
}

/// Split a dot-delimited bearer token and decode its payload segment as
/// base64url JSON. The signature segment is never inspected.
pub fn decode_payload(token: &str) -> Option<Value> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() < 2 {
        return None;
    }
    let bytes = base64::engine::general_purpose::URL_SAFE
        .decode(pad_base64url(parts[1]).as_bytes())
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Restore standard '=' padding: `(-len mod 4)` characters.
fn pad_base64url(segment: &str) -> String {
    let pad = (4 - segment.len() % 4) % 4;
    format!("{}{}", segment, "=".repeat(pad))
}
