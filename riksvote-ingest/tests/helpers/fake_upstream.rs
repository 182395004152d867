//! Scripted upstream API
//!
//! Responses are queued per exact URL. The last queued response for a URL
//! repeats once the queue drains; unknown URLs answer 404. Every request is
//! counted so tests can assert what was (not) fetched.

use async_trait::async_trait;
use reqwest::Url;
use riksvote_ingest::services::fetch_client::{RawResponse, Transport, TransportError};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

type Scripted = Result<RawResponse, TransportError>;

#[derive(Default)]
pub struct FakeUpstream {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    hits: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<String>>,
}

impl FakeUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, url: &Url, response: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Queue a raw response for `url`
    pub fn respond(&self, url: &Url, response: RawResponse) {
        self.push(url, Ok(response));
    }

    /// Queue a 200 JSON response for `url`
    pub fn respond_json(&self, url: &Url, body: Value) {
        self.respond(url, RawResponse::ok(body.to_string()));
    }

    /// Queue a network failure for `url`
    pub fn fail_transport(&self, url: &Url, message: &str) {
        self.push(url, Err(TransportError(message.to_string())));
    }

    /// Drop everything scripted for `url` (it answers 404 afterwards)
    pub fn clear(&self, url: &Url) {
        self.routes.lock().unwrap().remove(url.as_str());
    }

    /// Requests made for `url`
    pub fn hits(&self, url: &Url) -> usize {
        self.hits.lock().unwrap().get(url.as_str()).copied().unwrap_or(0)
    }

    /// Requests made in total
    pub fn total_hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every requested URL, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeUpstream {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        let key = url.to_string();
        *self.hits.lock().unwrap().entry(key.clone()).or_default() += 1;
        self.requests.lock().unwrap().push(key.clone());

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| Ok(RawResponse::not_found())),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Ok(RawResponse::not_found())),
            None => Ok(RawResponse::not_found()),
        }
    }
}
