//! Test doubles for the transport and host seams.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ConnectorError, Result};
use crate::host::Host;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Transport that answers from scripted responses and records every request.
///
/// A response routed to an exact URL wins; otherwise queued responses are
/// handed out in order.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, ApiResponse>>,
    queue: Mutex<VecDeque<ApiResponse>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route_json(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .insert(url.to_string(), ApiResponse::new(status, body));
    }

    pub fn push_json(&self, status: u16, body: &str) {
        self.queue.lock().push_back(ApiResponse::new(status, body));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = request.url.clone();
        self.requests.lock().push(request);

        if let Some(response) = self.routes.lock().get(&url) {
            return Ok(response.clone());
        }

        self.queue
            .lock()
            .pop_front()
            .ok_or_else(|| ConnectorError::Transport(format!("no mock response for {}", url)))
    }
}

/// Host that keeps its slots in memory and records submissions and aborts.
#[derive(Debug, Default)]
pub struct RecordingHost {
    connection_data: Mutex<String>,
    password: Mutex<String>,
    submits: Mutex<usize>,
    aborts: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_count(&self) -> usize {
        *self.submits.lock()
    }

    pub fn aborts(&self) -> Vec<String> {
        self.aborts.lock().clone()
    }
}

impl Host for RecordingHost {
    fn connection_data(&self) -> String {
        self.connection_data.lock().clone()
    }

    fn set_connection_data(&self, data: String) {
        *self.connection_data.lock() = data;
    }

    fn password(&self) -> String {
        self.password.lock().clone()
    }

    fn set_password(&self, password: String) {
        *self.password.lock() = password;
    }

    fn submit(&self) {
        *self.submits.lock() += 1;
    }

    fn abort_with_error(&self, message: &str) {
        self.aborts.lock().push(message.to_string());
    }
}
