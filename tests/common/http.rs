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

//! Fake HTTP API answering a scripted list of JSON responses in order.
//!
//! Runs an `axum` router on a random local port. Every request, whatever its route, gets the
//! next scripted response and is recorded for the test to inspect.

use std::{collections::VecDeque, net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Default)]
struct ApiState {
    responses: VecDeque<(StatusCode, Value)>,
    requests: Vec<RecordedRequest>,
}

pub struct FakeHttpServer {
    addr: SocketAddr,
    state: Arc<Mutex<ApiState>>,
}

impl FakeHttpServer {
    /// Serves `responses` in order, anything after them is answered with a 500.
    pub async fn start(responses: Vec<(StatusCode, Value)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(ApiState {
            responses: responses.into(),
            requests: Vec::new(),
        }));

        let app = Router::new().fallback(respond).with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().await.requests.clone()
    }
}

async fn respond(
    State(state): State<Arc<Mutex<ApiState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let mut state = state.lock().await;
    state.requests.push(RecordedRequest {
        method: method.to_string(),
        target: uri
            .path_and_query()
            .map_or_else(|| uri.path().to_owned(), ToString::to_string),
        headers,
        body,
    });
    let (status, body) = state.responses.pop_front().unwrap_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": "no scripted response left"}),
        )
    });
    (status, Json(body))
}

/// A url nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);
    url
}
