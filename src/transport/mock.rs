//! A scripted transport for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Request, Response, Transport, TransportError};

enum Script {
    Reply(Response),
    Fail(String),
    /// Never resolves; pairs with cancellation tests.
    Hang,
}

/// Replays a scripted queue of responses and records every request for
/// later assertions.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a raw response.
    pub fn enqueue(&self, status: u16, body: Vec<u8>) {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Script::Reply(Response { status, body }));
    }

    /// Script a JSON response.
    pub fn enqueue_json(&self, status: u16, body: serde_json::Value) {
        self.enqueue(status, body.to_string().into_bytes());
    }

    /// Script a transport failure.
    pub fn enqueue_error(&self, message: impl Into<String>) {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Script::Fail(message.into()));
    }

    /// Script a call that never completes.
    pub fn enqueue_hang(&self) {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(Script::Hang);
    }

    /// All requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("mock request lock").clone()
    }

    /// Number of scripted responses not yet consumed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.script.lock().expect("mock script lock").len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.requests
            .lock()
            .expect("mock request lock")
            .push(request);

        let next = self.script.lock().expect("mock script lock").pop_front();
        match next {
            Some(Script::Reply(response)) => Ok(response),
            Some(Script::Fail(message)) => Err(TransportError::Connection(message)),
            Some(Script::Hang) => {
                let never: Response = std::future::pending().await;
                Ok(never)
            }
            None => Err(TransportError::Connection(
                "mock transport: no scripted response".to_string(),
            )),
        }
    }
}
