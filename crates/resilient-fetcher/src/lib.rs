//! Authenticated request execution with classified failure handling.
//!
//! Every request goes through [`ResilientFetcher::execute`]:
//! - the bearer token is read from the [`auth_engine::SessionStore`] at dispatch
//! - failures are mapped by [`classify`] to a [`FailureClass`]
//! - transient failures are retried with exponential backoff
//! - expired or denied sessions are cleared and a
//!   [`NavigationIntent::RedirectToLogin`] is broadcast

mod classifier;
mod error;
mod fetcher;
mod navigation;
mod retry;
mod transport;

pub use classifier::{classify, failure_message, FailureClass};
pub use error::{FetchError, FetchResult};
pub use fetcher::ResilientFetcher;
pub use navigation::{NavigationIntent, RedirectReason};
pub use retry::{FetchAttempt, FetchOutcome, RetryPolicy};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport, TransportFailure};
