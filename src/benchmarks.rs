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

pub mod category_match;
pub mod latency;
pub mod terms_filter;

use std::{
    fmt::{self, Display},
    time::Duration,
};

use anyhow::Error;
use async_trait::async_trait;

use crate::{dsl::SearchBody, resources::ReadingsLog};

use self::latency::{sample, RetryPolicy};

#[derive(Clone, Copy)]
pub struct SampleParameters {
    pub iterations: usize,
    pub retry: RetryPolicy,
    /// Upper bound of the random pause after every answered call, zero disables it.
    pub max_pause: Duration,
}

impl Display for SampleParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            iterations,
            retry,
            max_pause,
        } = self;
        write!(
            f,
            "{iterations}x-{attempts}a-{pause}ms",
            attempts = retry.max_attempts,
            pause = max_pause.as_millis()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The request never got an answer, e.g. connection reset or timeout.
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("search failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed search response: {0}")]
    Malformed(String),
}

impl SearchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SearchError::Transport(_))
    }
}

#[async_trait]
pub trait SearchEndpoint: Send + Sync {
    fn name(&self) -> &str;

    /// Runs the search and returns the processing time the engine reports, in milliseconds.
    async fn search(&self, index: &str, body: &SearchBody<'_>) -> Result<u64, SearchError>;
}

/// Samples `body` and records the readings, returns the trimmed mean if there is one.
pub(crate) async fn measure<E>(
    log: &mut ReadingsLog,
    keyword: &str,
    variant: &str,
    endpoint: &E,
    index: &str,
    body: &SearchBody<'_>,
    params: &SampleParameters,
) -> Result<Option<f64>, Error>
where
    E: SearchEndpoint + ?Sized,
{
    let measurement = sample(endpoint, index, body, params).await;
    log.record(keyword, variant, endpoint.name(), &measurement)?;
    Ok(measurement.mean())
}
