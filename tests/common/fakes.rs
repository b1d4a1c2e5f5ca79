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

use std::sync::Mutex;

use ad_query_benchmarks::{
    benchmarks::{latency::RetryPolicy, SampleParameters, SearchEndpoint, SearchError},
    dsl::SearchBody,
    warehouse::{Table, Warehouse},
};
use anyhow::{anyhow, Error};
use async_trait::async_trait;
use serde_json::Value;

type Respond = Box<dyn Fn(usize, &SearchBody<'_>) -> Result<u64, SearchError> + Send + Sync>;

/// Search endpoint answering from a closure, gets the call index and the body.
pub struct FakeEndpoint {
    name: &'static str,
    respond: Respond,
    calls: Mutex<Vec<Call>>,
}

#[derive(Debug, Clone)]
pub struct Call {
    /// `SearchBody::name` of the body.
    pub variant: &'static str,
    pub index: String,
    pub body: Value,
}

impl FakeEndpoint {
    pub fn new(
        name: &'static str,
        respond: impl Fn(usize, &SearchBody<'_>) -> Result<u64, SearchError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name,
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers the calls in order, panics if there are more calls than answers.
    pub fn scripted(name: &'static str, answers: Vec<Result<u64, SearchError>>) -> Self {
        Self::new(name, move |call, _| answers[call].clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn variants(&self) -> Vec<&'static str> {
        self.calls().iter().map(|call| call.variant).collect()
    }
}

#[async_trait]
impl SearchEndpoint for FakeEndpoint {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(&self, index: &str, body: &SearchBody<'_>) -> Result<u64, SearchError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                variant: body.name(),
                index: index.to_owned(),
                body: serde_json::to_value(body).unwrap(),
            });
            calls.len() - 1
        };
        (self.respond)(call, body)
    }
}

/// Warehouse answering every query containing a needle with the table registered for it.
#[derive(Default)]
pub struct FakeWarehouse {
    tables: Vec<(&'static str, Table)>,
    queries: Mutex<Vec<String>>,
}

impl FakeWarehouse {
    pub fn with_table(mut self, needle: &'static str, table: Table) -> Self {
        self.tables.push((needle, table));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn query(&self, sql: &str) -> Result<Table, Error> {
        self.queries.lock().unwrap().push(sql.to_owned());
        self.tables
            .iter()
            .find(|(needle, _)| sql.contains(needle))
            .map(|(_, table)| table.clone())
            .ok_or_else(|| anyhow!("no table for query: {sql}"))
    }
}

pub fn table(columns: &[&str], rows: &[&[Option<&str>]]) -> Table {
    Table {
        columns: columns.iter().map(|column| column.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.map(str::to_owned)).collect())
            .collect(),
    }
}

pub fn transport_error() -> SearchError {
    SearchError::Transport("connection reset by peer".into())
}

pub fn status_error(status: u16) -> SearchError {
    SearchError::Status {
        status,
        body: "{\"error\":\"boom\"}".into(),
    }
}

pub fn params(iterations: usize) -> SampleParameters {
    SampleParameters {
        iterations,
        retry: RetryPolicy {
            max_attempts: 3,
            backoff: std::time::Duration::ZERO,
        },
        max_pause: std::time::Duration::ZERO,
    }
}
