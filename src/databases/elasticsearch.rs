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

use anyhow::{bail, Error};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::{
    benchmarks::{SearchEndpoint, SearchError},
    dsl::SearchBody,
    utils::response_text,
};

pub struct Elasticsearch {
    client: Client,
    base_url: Url,
    name: String,
}

impl Elasticsearch {
    pub fn new(name: impl Into<String>, base_url: &str) -> Result<Self, Error> {
        let base_url: Url = base_url.parse()?;
        if base_url.cannot_be_a_base() {
            bail!("not usable as base url: {base_url}");
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            name: name.into(),
        })
    }

    fn make_url(&self, segments: impl IntoIterator<Item = impl AsRef<str>>) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            // checked in `new`
            .unwrap()
            .pop_if_empty()
            .extend(segments);
        url
    }
}

#[async_trait]
impl SearchEndpoint for Elasticsearch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, index: &str, body: &SearchBody<'_>) -> Result<u64, SearchError> {
        // `.json` also sets `Content-Type: application/json`
        let response = self
            .client
            .request(Method::GET, self.make_url([index, "_search"]))
            .json(body)
            .send()
            .await
            .map_err(|error| SearchError::Transport(error.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: response_text(response).await,
            });
        }

        let SearchResult { took } = response
            .json()
            .await
            .map_err(|error| SearchError::Malformed(error.to_string()))?;
        Ok(took)
    }
}

/// The only part of the response we care about.
#[derive(Deserialize)]
struct SearchResult {
    took: u64,
}
