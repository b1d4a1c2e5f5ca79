// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Latency estimation for a single request body against a single endpoint.
//!
//! Calls are issued strictly one after another, parallel calls would compete for the same
//! search nodes and distort what is measured. The reading is the processing time reported by
//! the engine, not the wall clock time, so network jitter between us and the cluster doesn't
//! end up in the numbers.

use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tracing::{debug, warn};

use super::{SampleParameters, SearchEndpoint, SearchError};
use crate::{dsl::SearchBody, math::trimmed_mean};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Success { value: T, retries: u32 },
    Failure { error: SearchError, attempts: u32 },
}

impl RetryPolicy {
    /// Repeats `call` while it fails with a retryable error, at most `max_attempts` times.
    pub async fn run<T, F, Fut>(&self, mut call: F) -> CallOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SearchError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match call().await {
                Ok(value) => {
                    return CallOutcome::Success {
                        value,
                        retries: attempts - 1,
                    }
                }
                Err(error) if error.is_retryable() && attempts < self.max_attempts => {
                    warn!(%error, attempts, "search call failed, retrying");
                    if !self.backoff.is_zero() {
                        sleep(self.backoff).await;
                    }
                }
                Err(error) => return CallOutcome::Failure { error, attempts },
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatencySample {
    /// Trimmed mean of the readings in milliseconds.
    pub mean: f64,
    /// Readings left after trimming, ascending.
    pub readings: Vec<u64>,
    /// Iterations which never got an answer and therefore have no reading.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    Available(LatencySample),
    /// The endpoint rejected the request, no latency can be given for it.
    Unavailable(SearchError),
}

impl Measurement {
    pub fn mean(&self) -> Option<f64> {
        match self {
            Measurement::Available(sample) => Some(sample.mean),
            Measurement::Unavailable(_) => None,
        }
    }
}

/// Issues `body` `params.iterations` times and reduces the readings to a trimmed mean.
///
/// Calls without any answer are retried per `params.retry` and skipped if that doesn't help.
/// Any other failure ends the sampling right away.
pub async fn sample<E>(
    endpoint: &E,
    index: &str,
    body: &SearchBody<'_>,
    params: &SampleParameters,
) -> Measurement
where
    E: SearchEndpoint + ?Sized,
{
    let mut readings = Vec::with_capacity(params.iterations);
    let mut skipped = 0;

    for _ in 0..params.iterations {
        match params.retry.run(|| endpoint.search(index, body)).await {
            CallOutcome::Success { value, retries } => {
                if retries > 0 {
                    debug!(endpoint = endpoint.name(), retries, "search call recovered");
                }
                readings.push(value);
            }
            CallOutcome::Failure { error, attempts } if error.is_retryable() => {
                warn!(
                    endpoint = endpoint.name(),
                    %error,
                    attempts,
                    "giving up on search call, reading skipped"
                );
                skipped += 1;
                continue;
            }
            CallOutcome::Failure { error, .. } => {
                warn!(
                    endpoint = endpoint.name(),
                    variant = body.name(),
                    %error,
                    "search call rejected, measurement unavailable"
                );
                return Measurement::Unavailable(error);
            }
        }

        if !params.max_pause.is_zero() {
            sleep(params.max_pause.mul_f64(rand::random::<f64>())).await;
        }
    }

    let trimmed = trimmed_mean(readings);
    Measurement::Available(LatencySample {
        mean: trimmed.mean,
        readings: trimmed.kept,
        skipped,
    })
}
