//! Test utilities and mocks for capstan unit tests.
//!
//! The main piece is [`MockLoader`], a scripted [`Loader`] that records
//! every location it is asked for.
//!
//! # Example
//!
//! ```rust,ignore
//! use capstan::test_support::MockLoader;
//!
//! let loader = MockLoader::new()
//!     .fail("Modules/OrgChart.js", FailureReason::NetworkError)
//!     .succeed("modules/OrgChart.js");
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::{FailureReason, Implementation};
use crate::loader::{LoadFailure, LoadRequest, Loader};

pub use fixtures::*;

/// Scripted behavior for one location.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Load succeeds with these exports.
    Succeed(toml::Table),
    /// Load fails with the given reason.
    Fail(FailureReason),
    /// Load never completes.
    Hang,
}

/// Loader whose answers are set up front.
///
/// Locations without a scripted response fail with `NetworkError`, the same
/// way a missing file would.
#[derive(Debug, Clone, Default)]
pub struct MockLoader {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Duration,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed at `location` with empty exports.
    pub fn succeed(self, location: &str) -> Self {
        self.succeed_with(location, toml::Table::new())
    }

    /// Succeed at `location` with the given exports.
    pub fn succeed_with(self, location: &str, exports: toml::Table) -> Self {
        self.set(location, MockResponse::Succeed(exports));
        self
    }

    /// Fail at `location`.
    pub fn fail(self, location: &str, reason: FailureReason) -> Self {
        self.set(location, MockResponse::Fail(reason));
        self
    }

    /// Never answer for `location`.
    pub fn hang(self, location: &str) -> Self {
        self.set(location, MockResponse::Hang);
        self
    }

    /// Delay every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the scripted response for `location`, also after construction.
    pub fn set(&self, location: &str, response: MockResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(location.to_string(), response);
    }

    /// Locations requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Loader for MockLoader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load(&self, request: &LoadRequest<'_>) -> Result<Implementation, LoadFailure> {
        self.calls.lock().unwrap().push(request.location.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = self.responses.lock().unwrap().get(request.location).cloned();
        match response {
            Some(MockResponse::Succeed(exports)) => {
                Ok(Implementation::loaded(request.location, exports))
            }
            Some(MockResponse::Fail(reason)) => {
                Err(LoadFailure::new(reason, format!("scripted failure for {}", request.location)))
            }
            Some(MockResponse::Hang) => {
                std::future::pending::<()>().await;
                Err(LoadFailure::network("unreachable"))
            }
            None => Err(LoadFailure::network(format!("no such resource: {}", request.location))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CapabilityName;

    #[tokio::test]
    async fn test_mock_loader_records_calls() {
        let loader = MockLoader::new()
            .succeed("a.js")
            .fail("b.js", FailureReason::NotFound);
        let name = CapabilityName::new("a");

        assert!(loader.load(&LoadRequest::new(&name, "a.js")).await.is_ok());
        let err = loader.load(&LoadRequest::new(&name, "b.js")).await.unwrap_err();
        assert_eq!(err.reason, FailureReason::NotFound);
        let err = loader.load(&LoadRequest::new(&name, "c.js")).await.unwrap_err();
        assert_eq!(err.reason, FailureReason::NetworkError);

        assert_eq!(loader.calls(), vec!["a.js", "b.js", "c.js"]);
    }
}
