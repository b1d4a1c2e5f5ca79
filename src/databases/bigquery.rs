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

//! Warehouse access over the BigQuery REST API (`jobs.query` / `jobs.getQueryResults`).

use std::env;

use anyhow::{bail, Context, Error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{
    config::WarehouseConfig,
    utils::await_and_check_request,
    warehouse::{Table, Warehouse},
};

const API_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2/";
/// How long a single call waits for the job to complete before it returns.
const WAIT_TIMEOUT_MS: u64 = 60_000;
const PAGE_SIZE: u64 = 50_000;

pub struct BigQuery {
    client: Client,
    base_url: Url,
    project: String,
    access_token: String,
}

impl BigQuery {
    pub fn new(project: impl Into<String>, access_token: impl Into<String>) -> Result<Self, Error> {
        Self::with_base_url(API_BASE_URL, project, access_token)
    }

    pub fn with_base_url(
        base_url: &str,
        project: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, Error> {
        let base_url: Url = base_url.parse()?;
        if base_url.cannot_be_a_base() {
            bail!("not usable as base url: {base_url}");
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            project: project.into(),
            access_token: access_token.into(),
        })
    }

    pub fn from_config(config: &WarehouseConfig) -> Result<Self, Error> {
        let access_token = env::var(&config.access_token_env).with_context(|| {
            format!(
                "no warehouse access token, set {} (e.g. to `gcloud auth print-access-token`)",
                config.access_token_env
            )
        })?;
        Self::new(&config.project, access_token)
    }

    fn make_url(&self, segments: impl IntoIterator<Item = impl AsRef<str>>) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            // checked in `with_base_url`
            .unwrap()
            .pop_if_empty()
            .extend(["projects", self.project.as_str()])
            .extend(segments);
        url
    }

    async fn start_query(&self, sql: &str) -> Result<QueryResponse, Error> {
        let fut = self
            .client
            .post(self.make_url(["queries"]))
            .bearer_auth(&self.access_token)
            .json(&QueryRequest {
                query: sql,
                use_legacy_sql: false,
                timeout_ms: WAIT_TIMEOUT_MS,
                max_results: PAGE_SIZE,
            })
            .send();
        Ok(await_and_check_request(fut).await?.json().await?)
    }

    async fn query_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, Error> {
        let mut url = self.make_url(["queries", job.job_id.as_str()]);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("timeoutMs", &WAIT_TIMEOUT_MS.to_string())
                .append_pair("maxResults", &PAGE_SIZE.to_string());
            if let Some(location) = &job.location {
                query.append_pair("location", location);
            }
            if let Some(page_token) = page_token {
                query.append_pair("pageToken", page_token);
            }
        }
        let fut = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send();
        Ok(await_and_check_request(fut).await?.json().await?)
    }
}

#[async_trait]
impl Warehouse for BigQuery {
    async fn query(&self, sql: &str) -> Result<Table, Error> {
        let mut response = self.start_query(sql).await?;
        let mut table = Table::default();

        loop {
            let job = response
                .job_reference
                .context("query response without job reference")?;
            if !response.job_complete {
                debug!(job = %job.job_id, "waiting for query job");
                response = self.query_results(&job, None).await?;
                continue;
            }

            if table.columns.is_empty() {
                if let Some(schema) = response.schema {
                    table.columns = schema.fields.into_iter().map(|field| field.name).collect();
                }
            }
            table
                .rows
                .extend(response.rows.into_iter().map(|row| {
                    row.f.into_iter().map(|cell| cell_to_string(cell.v)).collect()
                }));

            match response.page_token {
                Some(page_token) => {
                    debug!(job = %job.job_id, rows = table.rows.len(), "fetching next page");
                    response = self.query_results(&job, Some(&page_token)).await?;
                }
                None => break,
            }
        }

        Ok(table)
    }
}

/// Scalars come as strings, anything nested is kept in its JSON form.
fn cell_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(value) => Some(value),
        other => Some(other.to_string()),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    timeout_ms: u64,
    max_results: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    job_reference: Option<JobReference>,
    #[serde(default)]
    job_complete: bool,
    schema: Option<Schema>,
    #[serde(default)]
    rows: Vec<Row>,
    page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Deserialize)]
struct Schema {
    fields: Vec<SchemaField>,
}

#[derive(Deserialize)]
struct SchemaField {
    name: String,
}

#[derive(Deserialize)]
struct Row {
    f: Vec<Cell>,
}

#[derive(Deserialize)]
struct Cell {
    #[serde(default)]
    v: Value,
}
