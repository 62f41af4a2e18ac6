//! Helpers shared by the integration test binaries.

#![allow(dead_code)]

use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use shipengine::dispatcher::ListenerError;
use shipengine::events::{EventKind, LifecycleEvent, RequestSentEvent, ResponseReceivedEvent};
use shipengine::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use shipengine::EventListener;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Records every event it receives.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(LifecycleEvent::kind).collect()
    }

    pub fn request_sent(&self) -> Vec<RequestSentEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LifecycleEvent::RequestSent(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn response_received(&self) -> Vec<ResponseReceivedEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LifecycleEvent::ResponseReceived(e) => Some(e),
                _ => None,
            })
            .collect()
    }
}

impl EventListener for RecordingListener {
    fn on_request_sent(&self, event: &RequestSentEvent) -> Result<(), ListenerError> {
        self.events.lock().unwrap().push(event.clone().into());
        Ok(())
    }

    fn on_response_received(&self, event: &ResponseReceivedEvent) -> Result<(), ListenerError> {
        self.events.lock().unwrap().push(event.clone().into());
        Ok(())
    }
}

/// A listener whose callbacks always fail.
pub struct FailingListener;

impl EventListener for FailingListener {
    fn on_request_sent(&self, _event: &RequestSentEvent) -> Result<(), ListenerError> {
        Err("listener exploded".into())
    }

    fn on_response_received(&self, _event: &ResponseReceivedEvent) -> Result<(), ListenerError> {
        Err("listener exploded".into())
    }
}

/// A listener whose callbacks always panic.
pub struct PanickingListener;

impl EventListener for PanickingListener {
    fn on_request_sent(&self, _event: &RequestSentEvent) -> Result<(), ListenerError> {
        panic!("listener panicked on send")
    }

    fn on_response_received(&self, _event: &ResponseReceivedEvent) -> Result<(), ListenerError> {
        panic!("listener panicked on receive")
    }
}

/// One scripted reply.
pub enum Reply {
    Json {
        status: StatusCode,
        body: Value,
        delay: Duration,
    },
    Fail(String),
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Reply::Json {
            status: StatusCode::from_u16(status).unwrap(),
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(status: u16, body: Value, delay: Duration) -> Self {
        Reply::Json {
            status: StatusCode::from_u16(status).unwrap(),
            body,
            delay,
        }
    }
}

/// A transport that plays back replies in order and records every request.
///
/// Once the script runs out, the last reply repeats.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<(StatusCode, Value)>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn sends(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let next = self.replies.lock().unwrap().pop_front();
        let last = self.last.lock().unwrap().clone();
        let (status, body, delay) = match next {
            Some(Reply::Json {
                status,
                body,
                delay,
            }) => {
                *self.last.lock().unwrap() = Some((status, body.clone()));
                (status, body, delay)
            }
            Some(Reply::Fail(message)) => return Err(TransportError::Other(message)),
            None => match last {
                Some((status, body)) => (status, body, Duration::ZERO),
                None => return Err(TransportError::Other("script is empty".to_string())),
            },
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(TransportResponse {
            status,
            headers: HeaderMap::new(),
            body: body.to_string(),
        })
    }
}
