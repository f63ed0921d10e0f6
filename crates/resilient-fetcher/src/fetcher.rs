//! Authenticated request execution with bounded retry.

use crate::classifier::{classify, failure_message, FailureClass};
use crate::navigation::{NavigationIntent, RedirectReason};
use crate::retry::{FetchAttempt, FetchOutcome, RetryPolicy};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::{FetchError, FetchResult};
use auth_engine::SessionStore;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Executes authenticated requests against the backend.
///
/// Attempts for one call are strictly sequential. Separate calls may run
/// concurrently; each reads the bearer token when it dispatches.
pub struct ResilientFetcher {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionStore>,
    policy: RetryPolicy,
    intent_tx: broadcast::Sender<NavigationIntent>,
}

impl ResilientFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
        policy: RetryPolicy,
    ) -> Self {
        let (intent_tx, _) = broadcast::channel(16);

        Self {
            transport,
            session,
            policy,
            intent_tx,
        }
    }

    /// Subscribe to navigation intents.
    pub fn subscribe(&self) -> broadcast::Receiver<NavigationIntent> {
        self.intent_tx.subscribe()
    }

    fn emit(&self, intent: NavigationIntent) {
        if self.intent_tx.send(intent).is_err() {
            debug!("No subscriber for navigation intent");
        }
    }

    /// Clear the session and ask the front end to show the login screen.
    fn tear_down(&self, reason: RedirectReason) -> FetchError {
        let cleared = self.session.clear();
        self.emit(NavigationIntent::redirect_to_login(reason));
        match cleared {
            Ok(()) => FetchError::SessionExpired,
            Err(e) => e.into(),
        }
    }

    /// Run `request` until it succeeds, the retry budget is spent, or a
    /// failure ends the session.
    pub async fn execute(&self, request: &ApiRequest) -> FetchResult<ApiResponse> {
        let mut attempt = FetchAttempt::first();

        loop {
            if !attempt.backoff_delay.is_zero() {
                tokio::time::sleep(attempt.backoff_delay).await;
            }

            let Some(token) = self.session.get_token()? else {
                info!(path = %request.path, "No session for authenticated request");
                self.emit(NavigationIntent::redirect_to_login(RedirectReason::NotLoggedIn));
                return Err(FetchError::NotLoggedIn);
            };

            let failure = match self.transport.send(request, &token).await {
                Ok(response) => {
                    attempt.classified_outcome = Some(FetchOutcome::Success);
                    debug!(
                        path = %request.path,
                        status = response.status,
                        retry_count = attempt.retry_count,
                        "Request succeeded"
                    );
                    return Ok(response);
                }
                Err(failure) => failure,
            };

            let class = classify(&failure);
            attempt.classified_outcome = Some(FetchOutcome::from(class));

            match class {
                FailureClass::Retryable => match attempt.next(&self.policy) {
                    Some(next) => {
                        warn!(
                            path = %request.path,
                            retry_count = next.retry_count,
                            max_retries = self.policy.max_retries,
                            delay_ms = next.backoff_delay.as_millis() as u64,
                            "Transient failure, retrying"
                        );
                        attempt = next;
                    }
                    None => {
                        warn!(
                            path = %request.path,
                            attempts = attempt.dispatched(),
                            "Retry budget exhausted"
                        );
                        return Err(FetchError::ServiceUnavailable {
                            attempts: attempt.dispatched(),
                        });
                    }
                },
                FailureClass::AuthExpired => {
                    warn!(path = %request.path, "Session rejected as expired");
                    return Err(self.tear_down(RedirectReason::SessionExpired));
                }
                FailureClass::AuthzDenied => {
                    warn!(path = %request.path, "Session denied by role check");
                    return Err(self.tear_down(RedirectReason::AuthorizationDenied));
                }
                FailureClass::Fatal => {
                    let status = match &failure {
                        crate::TransportFailure::Http { status, .. } => Some(*status),
                        crate::TransportFailure::NoResponse { .. } => None,
                    };
                    let message = failure_message(&failure);
                    warn!(path = %request.path, status = ?status, "Request failed");
                    return Err(FetchError::Fatal { status, message });
                }
            }
        }
    }

    /// Execute `request` and decode the JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> FetchResult<T> {
        self.execute(request).await?.json()
    }

    /// `GET path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> FetchResult<T> {
        self.fetch_json(&ApiRequest::get(path)).await
    }
}
