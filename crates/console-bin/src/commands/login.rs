//! Interactive email OTP login.

use std::io::Write;
use std::sync::Arc;

use auth_engine::{AuthError, OtpLogin, Session};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::app::Console;
use crate::error::{CliError, CliResult};

const RESEND: &str = "resend";

pub async fn run(console: &Console, email: &str, out: &mut impl Write) -> CliResult<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let session = login_with_input(console, email, stdin, out).await?;
    writeln!(out, "Logged in as {}.", session.user_id)?;
    Ok(())
}

/// Request a code for `email`, then read codes (or `resend`) line by line
/// from `input` until one verifies.
pub async fn login_with_input<R>(
    console: &Console,
    email: &str,
    input: R,
    out: &mut impl Write,
) -> CliResult<Session>
where
    R: AsyncBufRead + Unpin,
{
    let login = Arc::new(OtpLogin::new(
        console.identity.clone(),
        console.session.clone(),
        console.otp.clone(),
    ));
    login.set_state_callback(Box::new(|payload| {
        debug!(
            state = ?payload.state,
            cooldown_remaining = payload.cooldown_remaining,
            "OTP state changed"
        );
    }));

    login.request_code(email).await?;
    let mut clock = login.spawn_cooldown_clock();
    writeln!(out, "A {}-digit code was sent to {}.", console.otp.code_length, email)?;
    writeln!(
        out,
        "Enter the code, or type \"{}\" for a new one once {}s have passed.",
        RESEND, console.otp.cooldown_secs
    )?;

    let mut lines = input.lines();
    let result = loop {
        let Some(line) = lines.next_line().await? else {
            break Err(CliError::Cancelled);
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case(RESEND) {
            match login.request_code(email).await {
                Ok(()) => {
                    clock.abort();
                    clock = login.spawn_cooldown_clock();
                    writeln!(out, "A new code was sent to {}.", email)?;
                }
                Err(e) => writeln!(out, "{}", e.user_message())?,
            }
            continue;
        }

        match login.verify_code(line).await {
            Ok(session) => break Ok(session),
            Err(e @ AuthError::AttemptsExhausted { .. }) => {
                writeln!(out, "{} Type \"{}\" when allowed.", e.user_message(), RESEND)?;
            }
            Err(e) => writeln!(out, "{}", e.user_message())?,
        }
    };

    clock.abort();
    match &result {
        Ok(session) => info!(user_id = %session.user_id, "Console login complete"),
        Err(_) => {
            if let Err(e) = login.reset() {
                debug!(error = %e, "Login flow not reset");
            }
        }
    }
    result
}
