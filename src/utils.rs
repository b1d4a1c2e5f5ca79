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

use std::future::Future;

use anyhow::{anyhow, Error};
use reqwest::Response;
use tracing_subscriber::EnvFilter;

/// Reads the body of a failed response, falling back to the read error if there is none.
pub(crate) async fn response_text(response: Response) -> String {
    match response.bytes().await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(error) => error.to_string(),
    }
}

pub(crate) async fn body_to_error(response: Response) -> Error {
    let status = response.status();
    let text = response_text(response).await;
    anyhow!("request failed ({status}): {text}")
}

pub(crate) async fn await_and_check_request(
    fut: impl Future<Output = Result<Response, reqwest::Error>>,
) -> Result<Response, Error> {
    let response = fut.await?;
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(body_to_error(response).await)
    }
}

/// Logs to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
