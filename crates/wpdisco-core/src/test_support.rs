//! Scripted in-memory collaborators for tests.

#![allow(clippy::unwrap_used)]

use crate::error::{TransportError, TransportErrorKind};
use crate::fetcher::PageFetcher;
use crate::jetpack::JetpackProbe;
use crate::xmlrpc::{RpcResponse, RpcValue, XmlRpcTransport};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

type Handler = dyn Fn(&Url) -> std::result::Result<RpcResponse, TransportError> + Send + Sync;

/// Answers every call through a closure and remembers which endpoints were called.
pub struct RecordingTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Url) -> std::result::Result<RpcResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl XmlRpcTransport for RecordingTransport {
    async fn call(
        &self,
        endpoint: &Url,
        _method: &str,
        _params: &[RpcValue],
    ) -> std::result::Result<RpcResponse, TransportError> {
        self.calls.lock().unwrap().push(endpoint.to_string());
        (self.handler)(endpoint)
    }
}

/// A successful `system.listMethods` answer from `url`.
pub fn list_methods(methods: &[&str], url: &str) -> RpcResponse {
    RpcResponse {
        value: RpcValue::Array(
            methods
                .iter()
                .map(|m| RpcValue::String((*m).to_string()))
                .collect(),
        ),
        url: Some(Url::parse(url).unwrap()),
        status: 200,
    }
}

/// A `system.listMethods` answer from a WordPress endpoint at `url`.
pub fn wordpress_methods(url: &str) -> RpcResponse {
    list_methods(
        &["system.listMethods", "wp.getUsersBlogs", "wp.getPosts"],
        url,
    )
}

/// Serves canned pages. Unknown URLs answer with an HTTP 404 failure.
#[derive(Default)]
pub struct StaticPages {
    pages: HashMap<String, std::result::Result<String, TransportErrorKind>>,
    requests: Mutex<Vec<String>>,
}

impl StaticPages {
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(key(url), Ok(body.to_string()));
        self
    }

    pub fn with_failure(mut self, url: &str, kind: TransportErrorKind) -> Self {
        self.pages.insert(key(url), Err(kind));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn key(url: &str) -> String {
    Url::parse(url).unwrap().to_string()
}

#[async_trait]
impl PageFetcher for StaticPages {
    async fn fetch_text(&self, url: &Url) -> std::result::Result<String, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.pages.get(url.as_str()) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(kind)) => Err(TransportError::new(*kind, "scripted page failure").with_url(url.clone())),
            None => Err(TransportError::new(TransportErrorKind::HttpStatus, "HTTP 404")
                .with_url(url.clone())
                .with_status(404)),
        }
    }
}

/// Jetpack probe with a fixed answer, or a fixed failure.
pub struct ScriptedJetpack {
    answer: Option<bool>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedJetpack {
    pub fn answering(has_jetpack: bool) -> Self {
        Self {
            answer: Some(has_jetpack),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl JetpackProbe for ScriptedJetpack {
    async fn has_jetpack(&self, site: &str, user_agent: &str) -> Result<bool> {
        self.calls
            .lock()
            .unwrap()
            .push((site.to_string(), user_agent.to_string()));
        self.answer.ok_or_else(|| {
            Error::from(TransportError::new(TransportErrorKind::HttpStatus, "HTTP 500").with_status(500))
        })
    }
}
