//! Scripted transport for tests.

use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ApiRequest, HttpTransport, TransportError, TransportResponse};

type Responder =
    dyn Fn(&ApiRequest) -> Result<TransportResponse, TransportError> + Send + Sync;

/// Transport that answers from a closure and records every request.
pub struct ScriptedTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    /// Answers every request with the response built by `respond`.
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&ApiRequest) -> TransportResponse + Send + Sync + 'static,
    {
        Self::with_results(move |request| Ok(respond(request)))
    }

    /// Answers every request with the result built by `respond`.
    pub fn with_results<F>(respond: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<TransportResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails every request with `error`.
    pub fn failing(error: TransportError) -> Self {
        Self::with_results(move |_| Err(error.clone()))
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose URL path ends with `suffix`.
    pub fn requests_to(&self, suffix: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.url.path().ends_with(suffix))
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("requests", &self.request_count())
            .finish()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, request: ApiRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request.clone());
        (self.responder)(&request)
    }
}

/// Builds a 200 response carrying `value` as JSON.
pub fn ok_json(value: serde_json::Value) -> TransportResponse {
    TransportResponse {
        status: 200,
        body: value.to_string(),
    }
}

/// Reads a query parameter from a recorded request.
pub fn query_param(request: &ApiRequest, name: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
