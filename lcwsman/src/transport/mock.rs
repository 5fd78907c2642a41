//! Mock transport for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::Transport;
use crate::errors::WsmanError;

type Handler = Box<dyn FnMut(&str) -> Result<Vec<u8>, WsmanError> + Send>;

/// Scripted transport.
///
/// Queued replies are served first, in order. Once the queue is empty the
/// handler, if any, answers. Every posted payload is captured. Clones share
/// the same queue, handler and log.
#[derive(Clone)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<Result<Vec<u8>, WsmanError>>>>,
    handler: Arc<Mutex<Option<Handler>>>,
    sent: Arc<Mutex<Vec<String>>>,
    url: String,
    max_retries: u32,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            handler: Arc::new(Mutex::new(None)),
            sent: Arc::new(Mutex::new(Vec::new())),
            url: "https://mock.invalid:443/wsman".to_string(),
            max_retries: 0,
        }
    }

    /// Answers every request not covered by the queue.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: FnMut(&str) -> Result<Vec<u8>, WsmanError> + Send + 'static,
    {
        let mock = Self::new();
        *mock.handler.lock().unwrap() = Some(Box::new(handler));
        mock
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Queues a response body.
    pub fn push_response(&self, xml: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(xml.into().into_bytes()));
    }

    /// Queues a failure.
    pub fn push_error(&self, error: WsmanError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Every payload posted so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of posted payloads containing `needle`.
    pub fn count_sent(&self, needle: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|payload| payload.contains(needle))
            .count()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn post(&self, payload: &str) -> Result<Vec<u8>, WsmanError> {
        self.sent.lock().unwrap().push(payload.to_string());

        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }

        match self.handler.lock().unwrap().as_mut() {
            Some(handler) => handler(payload),
            None => Err(WsmanError::connection("mock transport has no reply queued", false)),
        }
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
