//! Shared fixtures for the scenario tests.
//!
//! - `ServiceError`: error raised by the fake service
//! - `FlakyService`: answers `"500"` until its n-th call, then `"OK"`
//! - `Counter`: counts invocations of a closure

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Errors raised by the fake service.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ServiceError {
    /// The service refused the request.
    #[error("service unavailable")]
    Unavailable,

    /// The request was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Eventually-consistent service: not ready until `ready_on` calls have been made.
#[derive(Clone, Debug)]
pub struct FlakyService {
    calls: Arc<Mutex<Vec<String>>>,
    ready_on: usize,
}

impl FlakyService {
    pub fn ready_on(ready_on: usize) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            ready_on,
        }
    }

    /// Record the request and answer according to how many calls came before.
    pub async fn get(&self, path: &str) -> Result<String, ServiceError> {
        let seen = {
            let mut calls = self.calls.lock();
            calls.push(path.to_owned());
            calls.len()
        };
        if seen >= self.ready_on {
            Ok("OK".to_owned())
        } else {
            Ok("500".to_owned())
        }
    }

    /// Like `get`, but raises instead of answering `"500"`.
    pub async fn try_get(&self, path: &str) -> Result<String, ServiceError> {
        match self.get(path).await? {
            status if status == "OK" => Ok(status),
            _ => Err(ServiceError::Unavailable),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }
}

/// Counts how many times a closure ran.
#[derive(Clone, Debug, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
