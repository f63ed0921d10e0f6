//! Rendering of navigation intents for the terminal.
//!
//! The fetcher broadcasts a [`NavigationIntent`] whenever it tears a session
//! down. A terminal has no login screen to switch to, so the console turns
//! the intent into a notice and a hint to run the login command.

use resilient_fetcher::{FetchError, NavigationIntent, RedirectReason};
use tokio::sync::broadcast;
use tracing::debug;

const LOGIN_HINT: &str = "Run `mall-console login --email <address>` to sign in.";

/// Notice shown for a redirect to login.
pub fn redirect_notice(reason: RedirectReason) -> String {
    let headline = match reason {
        RedirectReason::NotLoggedIn => "You are not logged in.",
        RedirectReason::SessionExpired | RedirectReason::AuthorizationDenied => {
            "Your session has expired. Please log in again."
        }
    };
    format!("{}\n{}", headline, LOGIN_HINT)
}

/// Pick the redirect reason for a failed fetch that requires login.
///
/// The first intent broadcast during the call wins; the error itself is the
/// fallback when the receiver lagged or saw nothing.
pub fn take_redirect(
    intents: &mut broadcast::Receiver<NavigationIntent>,
    error: &FetchError,
) -> RedirectReason {
    let mut first = None;
    loop {
        match intents.try_recv() {
            Ok(NavigationIntent::RedirectToLogin { reason }) => {
                debug!(?reason, "Redirect to login requested");
                first.get_or_insert(reason);
            }
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                debug!(skipped, "Navigation intents dropped");
            }
            Err(_) => break,
        }
    }

    first.unwrap_or(match error {
        FetchError::NotLoggedIn => RedirectReason::NotLoggedIn,
        _ => RedirectReason::SessionExpired,
    })
}
