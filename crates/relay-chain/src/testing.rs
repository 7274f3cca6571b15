//! Scripted in-memory fetcher for tests
//!
//! Routes each call by URL prefix to a canned answer and records every call
//! so tests can assert which providers were reached.

use std::sync::Mutex;

use async_trait::async_trait;
use relay_core::{FetchRequest, FetchResponse, HttpFetch, TransportError};

#[derive(Debug, Clone)]
enum Scripted {
    Respond(u16, String),
    Fail(TransportError),
}

#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    routes: Vec<(String, Scripted)>,
    calls: Mutex<Vec<FetchRequest>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls whose URL starts with `prefix`
    pub fn respond(mut self, prefix: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.routes
            .push((prefix.into(), Scripted::Respond(status, body.into())));
        self
    }

    /// Fail calls whose URL starts with `prefix`
    pub fn fail(mut self, prefix: impl Into<String>, error: TransportError) -> Self {
        self.routes.push((prefix.into(), Scripted::Fail(error)));
        self
    }

    /// Every call received, in order
    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.url.starts_with(prefix)).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl HttpFetch for ScriptedFetcher {
    async fn call(&self, request: FetchRequest) -> Result<FetchResponse, TransportError> {
        let route = self
            .routes
            .iter()
            .find(|(prefix, _)| request.url.starts_with(prefix.as_str()))
            .map(|(_, scripted)| scripted.clone());

        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        match route {
            Some(Scripted::Respond(status, body)) => Ok(FetchResponse::new(status, body)),
            Some(Scripted::Fail(error)) => Err(error),
            None => Ok(FetchResponse::new(404, "no scripted route")),
        }
    }
}
