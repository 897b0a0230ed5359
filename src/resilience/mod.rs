//! Retry policy for results GitHub has not finished computing.
//!
//! Some GET endpoints (repository statistics, for one) answer 202 while the
//! result is computed in the background and expect to be polled again.

use crate::config::RetryConfig;
use crate::errors::GitHubError;
use reqwest::Method;
use std::time::Duration;

/// What the executor should do with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReadyAction {
    /// Not a 202; hand the response on.
    Accept,
    /// Sleep for the delay, then reissue the request.
    Retry {
        /// 1-based retry number.
        attempt: u32,
        /// Delay before the retry.
        delay: Duration,
    },
    /// Return the 202 body as-is and log a warning.
    AcceptWithWarning(&'static str),
    /// Give up; the result never became ready.
    Exhausted,
}

/// Decides whether a 202 response should be polled again.
#[derive(Debug, Clone)]
pub struct NotReadyPolicy {
    max_retries: u32,
    delay: Duration,
}

impl NotReadyPolicy {
    /// Creates a policy.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Creates the policy described by the configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.maximum_retries_when_result_not_ready, config.retry_delay)
    }

    /// Maximum number of retries.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Classifies a response given how many retries have already happened.
    pub fn decide(&self, status: u16, method: &Method, retries_so_far: u32) -> NotReadyAction {
        if status != 202 {
            return NotReadyAction::Accept;
        }

        if *method != Method::GET {
            return NotReadyAction::AcceptWithWarning(
                "Only GET requests are retried when the result is not ready.",
            );
        }

        if self.delay.is_zero() {
            return NotReadyAction::AcceptWithWarning(
                "Retrying is disabled because retry_delay is set to 0.",
            );
        }

        if retries_so_far < self.max_retries {
            NotReadyAction::Retry {
                attempt: retries_so_far + 1,
                delay: self.delay,
            }
        } else {
            NotReadyAction::Exhausted
        }
    }

    /// The error raised for [`NotReadyAction::Exhausted`].
    pub fn exhausted_error(&self) -> GitHubError {
        GitHubError::result_not_ready(self.max_retries)
    }
}

/// Returns true for methods that change server state.
pub fn is_state_changing(method: &Method) -> bool {
    [Method::POST, Method::PATCH, Method::PUT, Method::DELETE].contains(method)
}
