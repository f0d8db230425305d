//! HTTP client shared by every spec index
//!
//! This module provides a client with:
//! - A per-fetch timeout that feeds the retry path
//! - Exponential backoff retry driven by `RetryPolicy`
//! - Basic-auth credentials chosen by request host

use super::retry::{RetryPolicy, Sleeper, TokioSleeper};
use super::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::domain::Credential;
use crate::error::IndexError;
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for one fetch (10 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    timeout: Duration,
    credentials: Vec<Credential>,
}

impl HttpClient {
    /// Create a new client over `transport` with default settings
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            credentials: Vec::new(),
        }
    }

    /// Set the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the sleeper used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Set the per-fetch timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the credentials available for private sources
    pub fn with_credentials(mut self, credentials: Vec<Credential>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Perform a GET request with retry logic.
    ///
    /// Any 2xx and 304 count as success. 404 gives `NotFound`; other
    /// non-retryable statuses give `Http`. Exhausted retries give
    /// `Unavailable`.
    pub async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, IndexError> {
        let request = self.authenticate(request);
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            log::debug!("GET {} (attempt {})", request.url, attempt);

            let outcome = match tokio::time::timeout(self.timeout, self.transport.send(&request))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(TransportError::Timeout),
            };

            match outcome {
                Ok(response) if is_success(response.status) => return Ok(response),
                Ok(response) if response.status == 404 => {
                    return Err(IndexError::NotFound {
                        url: request.url.clone(),
                    })
                }
                Ok(response) if RetryPolicy::is_retryable_status(response.status) => {
                    last_error = format!("HTTP {}", response.status);
                }
                Ok(response) => {
                    return Err(IndexError::Http {
                        url: request.url.clone(),
                        status: response.status,
                    })
                }
                Err(e) => {
                    debug_assert!(RetryPolicy::is_retryable_error(&e));
                    last_error = e.to_string();
                }
            }

            if self.policy.should_retry(attempt) {
                let delay = self.policy.delay_for(attempt);
                log::warn!(
                    "fetching {} failed ({}), retrying in {:?}",
                    request.url,
                    last_error,
                    delay
                );
                self.sleeper.sleep(delay).await;
            }
        }

        Err(IndexError::Unavailable {
            url: request.url.clone(),
            attempts: self.policy.max_attempts,
            message: last_error,
        })
    }

    /// Perform a GET request and return the body as text
    pub async fn get_text(&self, url: &str) -> Result<String, IndexError> {
        Ok(self.fetch(HttpRequest::get(url)).await?.text())
    }

    /// Attach basic auth when a credential matches the request host
    fn authenticate(&self, mut request: HttpRequest) -> HttpRequest {
        if request.basic_auth.is_some() {
            return request;
        }
        let Some(host) = request.host() else {
            return request;
        };
        if let Some(credential) = self.credentials.iter().find(|c| c.applies_to(&host)) {
            let username = credential
                .username
                .clone()
                .unwrap_or_else(|| "x-access-token".to_string());
            request.basic_auth = Some((username, credential.secret.clone()));
        }
        request
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status) || status == 304
}
