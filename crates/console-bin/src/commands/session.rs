//! Session commands: status, refresh, logout.

use std::io::Write;

use auth_engine::{AuthError, AuthStatus};
use resilient_fetcher::RedirectReason;
use tracing::{info, warn};

use crate::app::Console;
use crate::error::{CliError, CliResult};

pub fn status(console: &Console, out: &mut impl Write) -> CliResult<()> {
    match console.session.status()? {
        AuthStatus::LoggedIn {
            user_id,
            expires_at,
        } => {
            writeln!(out, "Logged in as {}", user_id)?;
            match expires_at {
                Some(at) => writeln!(out, "  Expires: {}", at.to_rfc3339())?,
                None => writeln!(out, "  Expires: not stated")?,
            }
        }
        AuthStatus::Expired => {
            writeln!(out, "Session expired")?;
            writeln!(out, "  Run `mall-console refresh` or log in again.")?;
        }
        AuthStatus::NotLoggedIn => writeln!(out, "Not logged in")?,
    }
    Ok(())
}

/// Refresh the stored session. A refresh the backend refuses ends the
/// session; a transient failure leaves it for another try.
pub async fn refresh(console: &Console, out: &mut impl Write) -> CliResult<()> {
    match console.session.refresh().await {
        Ok(session) => {
            writeln!(out, "Session refreshed for {}", session.user_id)?;
            if let Some(at) = session.expires_at {
                writeln!(out, "  Expires: {}", at.to_rfc3339())?;
            }
            Ok(())
        }
        Err(AuthError::NotLoggedIn) => Err(CliError::LoginRequired(RedirectReason::NotLoggedIn)),
        Err(e) if e.is_transient() => Err(e.into()),
        Err(e) => {
            warn!(error = %e, "Refresh refused, clearing session");
            console.session.clear()?;
            Err(CliError::LoginRequired(RedirectReason::SessionExpired))
        }
    }
}

pub fn logout(console: &Console, out: &mut impl Write) -> CliResult<()> {
    console.session.clear()?;
    info!("Logged out");
    writeln!(out, "Logged out")?;
    Ok(())
}
