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

mod common;

use ad_query_benchmarks::{
    benchmarks::{latency::sample, SearchEndpoint, SearchError},
    databases::{bigquery::BigQuery, elasticsearch::Elasticsearch},
    dsl::{self, SearchBody},
    warehouse::{Table, Warehouse},
};
use axum::http::StatusCode;
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn body() -> SearchBody<'static> {
    dsl::current("nike").into()
}

#[tokio::test]
async fn search_reports_took() {
    let server =
        FakeHttpServer::start(vec![(StatusCode::OK, json!({"took": 17, "hits": {}}))]).await;
    let es = Elasticsearch::new("staging", &server.base_url()).unwrap();

    assert_eq!(es.name(), "staging");
    assert_eq!(es.search("ads", &body()).await, Ok(17));

    let requests = server.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].target, "/ads/_search");
    assert_eq!(requests[0].header("content-type"), Some("application/json"));
    assert_eq!(requests[0].json(), serde_json::to_value(body()).unwrap());
}

#[tokio::test]
async fn rejected_search_keeps_status_and_body() {
    let server =
        FakeHttpServer::start(vec![(StatusCode::BAD_REQUEST, json!({"error": "parse"}))]).await;
    let es = Elasticsearch::new("staging", &server.base_url()).unwrap();

    assert_eq!(
        es.search("ads", &body()).await,
        Err(SearchError::Status {
            status: 400,
            body: r#"{"error":"parse"}"#.into(),
        })
    );
}

#[tokio::test]
async fn search_without_took_is_malformed() {
    let server = FakeHttpServer::start(vec![(StatusCode::OK, json!({"hits": {}}))]).await;
    let es = Elasticsearch::new("staging", &server.base_url()).unwrap();

    let error = es.search("ads", &body()).await.unwrap_err();
    assert!(matches!(error, SearchError::Malformed(_)), "{error:?}");
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let es = Elasticsearch::new("staging", &closed_port_url().await).unwrap();

    let error = es.search("ads", &body()).await.unwrap_err();
    assert!(matches!(error, SearchError::Transport(_)), "{error:?}");
    assert!(error.is_retryable());
}

#[tokio::test]
async fn sampling_over_http() {
    let responses = [30, 10, 20]
        .into_iter()
        .map(|took| (StatusCode::OK, json!({ "took": took })))
        .collect();
    let server = FakeHttpServer::start(responses).await;
    let es = Elasticsearch::new("production", &server.base_url()).unwrap();

    let measurement = sample(&es, "ads", &body(), &params(3)).await;

    assert_eq!(measurement.mean(), Some(20.));
    assert_eq!(server.requests().await.len(), 3);
}

#[tokio::test]
async fn warehouse_query_follows_the_job_and_its_pages() {
    let server = FakeHttpServer::start(vec![
        (
            StatusCode::OK,
            json!({
                "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
                "jobComplete": false
            }),
        ),
        (
            StatusCode::OK,
            json!({
                "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
                "jobComplete": true,
                "schema": {"fields": [{"name": "queryText"}, {"name": "qc"}]},
                "rows": [{"f": [{"v": "toy"}, {"v": "50"}]}],
                "pageToken": "page-2"
            }),
        ),
        (
            StatusCode::OK,
            json!({
                "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
                "jobComplete": true,
                "schema": {"fields": [{"name": "queryText"}, {"name": "qc"}]},
                "rows": [{"f": [{"v": "lamp"}, {"v": null}]}]
            }),
        ),
    ])
    .await;
    let bq = BigQuery::with_base_url(&server.base_url(), "p", "secret").unwrap();

    let table = bq.query("SELECT 1").await.unwrap();

    assert_eq!(
        table,
        Table {
            columns: vec!["queryText".into(), "qc".into()],
            rows: vec![
                vec![Some("toy".into()), Some("50".into())],
                vec![Some("lamp".into()), None],
            ],
        }
    );

    let requests = server.requests().await;
    assert_eq!(requests.len(), 3);
    assert!(requests
        .iter()
        .all(|request| request.header("authorization") == Some("Bearer secret")));

    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].target, "/projects/p/queries");
    let start = requests[0].json();
    assert_eq!(start["query"], "SELECT 1");
    assert_eq!(start["useLegacySql"], false);

    assert_eq!(requests[1].method, "GET");
    assert!(requests[1].target.starts_with("/projects/p/queries/job_1?"));
    assert!(requests[1].target.contains("location=US"));
    assert!(!requests[1].target.contains("pageToken"));
    assert!(requests[2].target.contains("pageToken=page-2"));
}

#[tokio::test]
async fn warehouse_errors_are_propagated() {
    let server =
        FakeHttpServer::start(vec![(StatusCode::FORBIDDEN, json!({"error": "denied"}))]).await;
    let bq = BigQuery::with_base_url(&server.base_url(), "p", "secret").unwrap();

    assert!(bq.query("SELECT 1").await.is_err());
}
