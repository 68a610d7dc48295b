//! Scripted backend for tests
//!
//! Queues canned responses and records every request it receives, so the
//! pipeline can be exercised without a live model.

use crate::ai::backend::{BackendError, FixBackend};
use crate::remedy::types::{FixRequest, FixResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Backend that replays queued responses in FIFO order.
///
/// Interior mutability keeps the scripting API usable through an
/// `Arc<MockFixBackend>` shared with the pipeline under test.
#[derive(Default)]
pub struct MockFixBackend {
    responses: Mutex<VecDeque<Result<FixResponse, BackendError>>>,
    requests: Mutex<Vec<FixRequest>>,
}

impl MockFixBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next response to hand out.
    pub fn push_response(&self, response: Result<FixResponse, BackendError>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    /// Returns every request seen so far, in call order.
    pub fn requests(&self) -> Vec<FixRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of analyze calls made against this backend.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl FixBackend for MockFixBackend {
    async fn analyze(&self, request: &FixRequest) -> Result<FixResponse, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(BackendError::Other {
                    message: "mock backend response queue is empty".to_string(),
                })
            })
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
