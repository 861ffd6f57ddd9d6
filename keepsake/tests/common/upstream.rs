//! Scripted transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use http::StatusCode;
use keepsake_core::{RequestDescriptor, TransportResponse, Upstream, UpstreamError};

#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("connection refused")]
    Connection,
    #[error("HTTP status {}", .0.status())]
    Status(TransportResponse),
    #[error("no scripted response left")]
    Exhausted,
}

impl UpstreamError for MockError {
    fn into_not_modified(self) -> Result<TransportResponse, Self> {
        match self {
            MockError::Status(response) if response.status() == StatusCode::NOT_MODIFIED => {
                Ok(response)
            }
            other => Err(other),
        }
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<TransportResponse, MockError>>,
    requests: Vec<RequestDescriptor>,
}

/// Transport answering with queued responses and recording every request.
#[derive(Clone, Default)]
pub struct MockUpstream {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn respond(&self, response: TransportResponse) -> &Self {
        self.script.lock().unwrap().responses.push_back(Ok(response));
        self
    }

    pub fn fail(&self, error: MockError) -> &Self {
        self.script.lock().unwrap().responses.push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn last_request(&self) -> RequestDescriptor {
        self.requests().pop().expect("no request was sent")
    }
}

impl Upstream for MockUpstream {
    type Error = MockError;
    type Future = BoxFuture<'static, Result<TransportResponse, MockError>>;

    fn call(&mut self, req: RequestDescriptor) -> Self::Future {
        let response = {
            let mut script = self.script.lock().unwrap();
            script.requests.push(req);
            script
                .responses
                .pop_front()
                .unwrap_or(Err(MockError::Exhausted))
        };
        let delay = self.delay;
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            response
        }
        .boxed()
    }
}
