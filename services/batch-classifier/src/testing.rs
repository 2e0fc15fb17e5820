//! Scripted `Lookup` for engine tests

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use video_lookup::{Lookup, LookupError, LookupResponse};

type Script = dyn Fn(&str, &str) -> Result<LookupResponse, LookupError> + Send + Sync;

/// Answers each `(video_id, credential)` call from a closure and records
/// every call made.
pub struct ScriptedLookup {
    script: Box<Script>,
    delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedLookup {
    pub fn new(
        script: impl Fn(&str, &str) -> Result<LookupResponse, LookupError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, video_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == video_id)
            .count()
    }

    pub fn calls_with(&self, credential: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, key)| key == credential)
            .count()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Lookup for ScriptedLookup {
    fn id(&self) -> &str {
        "scripted"
    }

    fn fetch<'a>(
        &'a self,
        video_id: &'a str,
        credential: &'a str,
    ) -> Pin<Box<dyn Future<Output = video_lookup::Result<LookupResponse>> + Send + 'a>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((video_id.to_string(), credential.to_string()));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let response = (self.script)(video_id, credential);

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            response
        })
    }
}

/// HTTP 200 with a single-item payload.
pub fn ok(duration: &str, width: u32, height: u32) -> Result<LookupResponse, LookupError> {
    Ok(LookupResponse {
        status: 200,
        body: serde_json::json!({
            "items": [{
                "contentDetails": { "duration": duration },
                "player": { "embedWidth": width, "embedHeight": height }
            }]
        })
        .to_string(),
    })
}

/// Bare status response with an empty body.
pub fn status(code: u16) -> Result<LookupResponse, LookupError> {
    Ok(LookupResponse {
        status: code,
        body: String::new(),
    })
}

pub fn transport_error() -> Result<LookupResponse, LookupError> {
    Err(LookupError::Transport("connection reset".into()))
}
