//! Slice provisioning lifecycle: submit once, poll at a fixed interval,
//! classify terminal states.
//!
//! The lifecycle is linear: Created, Submitted, Polling, then exactly
//! one of Stable, TimedOut, or a submission error. There is no retry and
//! no branching back.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::info;

use crate::errors::AppError;
use crate::testbed::{SliceId, SliceRequest, StateClass, TestbedClient};

/// Terminal result of one provisioning run.
#[derive(Debug)]
pub enum Provisioned {
    /// A success-marker state was observed.
    Stable {
        slice: SliceId,
        polls: u32,
        elapsed: Duration,
    },
    /// The bound elapsed before a success marker. The remote slice is
    /// left in place as a diagnostic aid, never torn down here.
    TimedOut {
        slice: SliceId,
        last_state: String,
        elapsed: Duration,
    },
}

pub struct Orchestrator<'a> {
    testbed: &'a dyn TestbedClient,
}

impl<'a> Orchestrator<'a> {
    pub fn new(testbed: &'a dyn TestbedClient) -> Self {
        Self { testbed }
    }

    /// Submit `request` and poll until a stable state or `timeout`.
    ///
    /// Submission gets a single attempt; a failure there is an error,
    /// while a timeout is a non-error outcome so callers can tell "never
    /// started" from "started but did not stabilize". States that look
    /// failed keep polling: only the timeout distinguishes them from slow
    /// provisioning.
    pub async fn provision(
        &self,
        request: &SliceRequest,
        timeout: Duration,
        interval: Duration,
    ) -> Result<Provisioned, AppError> {
        info!(slice = %request.name, site = %request.site, image = %request.image, "submitting slice");
        let slice = self
            .testbed
            .submit_slice(request)
            .await
            .map_err(AppError::Submission)?;
        info!(%slice, "slice submitted; provisioning started");

        let start = Instant::now();
        let mut polls = 0u32;
        loop {
            polls += 1;
            let state = self
                .testbed
                .slice_state(&slice)
                .await
                .map_err(AppError::Poll)?;
            info!(%slice, %state, "slice state");

            if StateClass::classify(&state) == StateClass::Stable {
                return Ok(Provisioned::Stable {
                    slice,
                    polls,
                    elapsed: start.elapsed(),
                });
            }
            if start.elapsed() > timeout {
                return Ok(Provisioned::TimedOut {
                    slice,
                    last_state: state,
                    elapsed: start.elapsed(),
                });
            }
            sleep(interval).await;
        }
    }
}
