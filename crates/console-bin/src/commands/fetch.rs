//! Authenticated backend commands.

use std::io::Write;

use auth_engine::{AuthError, Session};
use resilient_fetcher::{ApiRequest, FetchError, RedirectReason};
use serde_json::Value;
use tracing::debug;

use crate::app::Console;
use crate::error::{CliError, CliResult};
use crate::intents::take_redirect;
use crate::malls::{self, MallPage, MALLS_PATH};

/// Refresh a locally expired session before any request goes out.
async fn ensure_session(console: &Console) -> CliResult<Session> {
    match console.session.ensure_fresh().await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(CliError::LoginRequired(RedirectReason::NotLoggedIn)),
        Err(e) if e.is_transient() => Err(e.into()),
        Err(AuthError::Storage(e)) => Err(e.into()),
        Err(_) => Err(CliError::LoginRequired(RedirectReason::SessionExpired)),
    }
}

/// Run one request through the fetcher, turning a teardown into a login
/// notice.
async fn send<T, F, Fut>(console: &Console, call: F) -> CliResult<T>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, FetchError>>,
{
    let session = ensure_session(console).await?;
    debug!(user_id = %session.user_id, "Session ready");

    let mut intents = console.fetcher.subscribe();
    match call().await {
        Ok(value) => Ok(value),
        Err(e) if e.requires_login() => Err(CliError::LoginRequired(take_redirect(&mut intents, &e))),
        Err(e) => Err(e.into()),
    }
}

/// `GET path` and print the body, pretty-printed when it is JSON.
pub async fn get(console: &Console, path: &str, out: &mut impl Write) -> CliResult<()> {
    let request = ApiRequest::get(path);
    let response = send(console, || console.fetcher.execute(&request)).await?;

    let pretty = serde_json::from_str::<Value>(&response.body)
        .and_then(|json| serde_json::to_string_pretty(&json))
        .unwrap_or(response.body);
    writeln!(out, "{}", pretty)?;
    Ok(())
}

pub async fn malls(console: &Console, page: u32, size: u32, out: &mut impl Write) -> CliResult<()> {
    let request = ApiRequest::get(MALLS_PATH)
        .with_query("page", page)
        .with_query("size", size);
    let listing: MallPage = send(console, || console.fetcher.fetch_json(&request)).await?;

    writeln!(out, "{}", malls::render(&listing, page))?;
    Ok(())
}
