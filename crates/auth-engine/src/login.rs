//! Email OTP login flow.
//!
//! `OtpLogin` drives the [`OtpMachine`] against the identity service and
//! stores the resulting session. Flow state lives behind a mutex that is
//! never held across an `.await`: each operation checks its guards and
//! transitions under the lock, releases it for the network call, then
//! re-acquires it to record the outcome.

use crate::challenge::{validate_code, validate_email, OtpChallenge, OtpConfig};
use crate::error::INVALID_CODE_MESSAGE;
use crate::identity_client::{IdentityApi, VerifyOutcome, VerifyRequest};
use crate::otp_fsm::{OtpMachine, OtpMachineInput, OtpState, OtpStateChangedPayload};
use crate::session::{Session, SessionStore};
use crate::{AuthError, AuthResult};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Callback type for OTP state change notifications.
pub type OtpStateCallback = Box<dyn Fn(OtpStateChangedPayload) + Send + Sync>;

struct FlowState {
    machine: OtpMachine,
    challenge: OtpChallenge,
    request_in_flight: bool,
}

impl FlowState {
    fn state(&self) -> OtpState {
        OtpState::from(self.machine.state())
    }

    fn apply(&mut self, input: &OtpMachineInput) -> AuthResult<OtpState> {
        self.machine.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                self.machine.state()
            ))
        })?;
        Ok(self.state())
    }

    fn payload(&self) -> OtpStateChangedPayload {
        OtpStateChangedPayload {
            state: self.state(),
            subject_key: self.challenge.subject_key.clone(),
            cooldown_remaining: self.challenge.cooldown_remaining,
        }
    }
}

/// One login attempt's worth of OTP state for a console context.
pub struct OtpLogin {
    identity: Arc<dyn IdentityApi>,
    session: Arc<SessionStore>,
    config: OtpConfig,
    flow: Mutex<FlowState>,
    state_callback: Mutex<Option<OtpStateCallback>>,
}

impl OtpLogin {
    pub fn new(identity: Arc<dyn IdentityApi>, session: Arc<SessionStore>, config: OtpConfig) -> Self {
        Self {
            identity,
            session,
            config,
            flow: Mutex::new(FlowState {
                machine: OtpMachine::new(),
                challenge: OtpChallenge::default(),
                request_in_flight: false,
            }),
            state_callback: Mutex::new(None),
        }
    }

    /// Set a callback to be notified of OTP state changes.
    pub fn set_state_callback(&self, callback: OtpStateCallback) {
        *self.state_callback.lock() = Some(callback);
    }

    pub fn state(&self) -> OtpState {
        self.flow.lock().state()
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.flow.lock().challenge.cooldown_remaining
    }

    /// Snapshot of the current challenge.
    pub fn challenge(&self) -> OtpChallenge {
        self.flow.lock().challenge.clone()
    }

    fn notify(&self, payload: OtpStateChangedPayload) {
        if let Some(callback) = self.state_callback.lock().as_ref() {
            callback(payload);
        }
    }

    /// Ask the identity service to email a code to `subject_key`.
    ///
    /// Rejected without a network call while a verification or another send
    /// is in flight, while the cooldown is running, or when the identifier is
    /// not shaped like an email address.
    pub async fn request_code(&self, subject_key: &str) -> AuthResult<()> {
        let subject_key = subject_key.trim();
        {
            let mut flow = self.flow.lock();
            match flow.state() {
                OtpState::Verifying => return Err(AuthError::VerificationInFlight),
                OtpState::Verified => {
                    return Err(AuthError::InvalidStateTransition(
                        "Already verified; reset the flow before requesting a new code".to_string(),
                    ))
                }
                _ => {}
            }
            if flow.request_in_flight {
                return Err(AuthError::RequestInFlight);
            }
            if flow.challenge.cooldown_remaining > 0 {
                return Err(AuthError::AlreadyCoolingDown {
                    remaining: flow.challenge.cooldown_remaining,
                });
            }
            validate_email(subject_key)?;
            flow.request_in_flight = true;
        }

        let result = self.identity.request_code(subject_key).await;

        let payload = {
            let mut flow = self.flow.lock();
            flow.request_in_flight = false;

            let issued = match result {
                Ok(issued) => issued,
                Err(e) => {
                    warn!(error = %e, "Failed to send login code");
                    return Err(e);
                }
            };

            flow.challenge
                .issue(subject_key, issued.user_id, self.config.cooldown_secs);
            flow.apply(&OtpMachineInput::CodeSent)?;
            flow.payload()
        };

        info!(
            cooldown_secs = self.config.cooldown_secs,
            "Login code sent"
        );
        self.notify(payload);
        Ok(())
    }

    /// Submit a code for the current challenge.
    ///
    /// On success the session is stored and returned. A rejected code moves
    /// the flow to `Failed`, keeps the challenge, and leaves the cooldown
    /// alone.
    pub async fn verify_code(&self, code: &str) -> AuthResult<Session> {
        let code = code.trim();
        validate_code(code, self.config.code_length)?;

        let (request, started) = {
            let mut flow = self.flow.lock();
            match flow.state() {
                OtpState::Verifying => return Err(AuthError::VerificationInFlight),
                OtpState::Idle => return Err(AuthError::NoActiveChallenge),
                OtpState::Verified => {
                    return Err(AuthError::InvalidStateTransition(
                        "Code already verified".to_string(),
                    ))
                }
                OtpState::Sent | OtpState::Failed => {}
            }
            if flow.request_in_flight {
                return Err(AuthError::RequestInFlight);
            }

            let (Some(challenge_id), Some(subject_key)) = (
                flow.challenge.challenge_id.clone(),
                flow.challenge.subject_key.clone(),
            ) else {
                return Err(AuthError::NoActiveChallenge);
            };

            if flow.challenge.verify_attempts >= self.config.max_verify_attempts {
                return Err(AuthError::AttemptsExhausted {
                    max: self.config.max_verify_attempts,
                });
            }

            flow.challenge.verify_attempts += 1;
            flow.apply(&OtpMachineInput::VerifyStarted)?;
            debug!(attempt = flow.challenge.verify_attempts, "Verifying login code");

            (
                VerifyRequest::email(&challenge_id, &subject_key, code),
                flow.payload(),
            )
        };
        self.notify(started);

        let outcome = self.identity.verify_code(&request).await;

        let stored = match outcome {
            Ok(VerifyOutcome::Accepted(credentials)) => {
                let session = Session::from_credentials(credentials, &request.user_id, Utc::now());
                self.session.set_session(&session).map(|_| session)
            }
            Ok(VerifyOutcome::Rejected { message }) => {
                debug!(reason = %message, "Login code rejected");
                Err(AuthError::InvalidCode(if message.is_empty() {
                    INVALID_CODE_MESSAGE.to_string()
                } else {
                    message
                }))
            }
            Err(e) => Err(e),
        };

        let payload = {
            let mut flow = self.flow.lock();
            match &stored {
                Ok(_) => {
                    flow.apply(&OtpMachineInput::VerifySucceeded)?;
                    // Codes are single-use; the correlation id dies with it.
                    flow.challenge.challenge_id = None;
                }
                Err(_) => {
                    flow.apply(&OtpMachineInput::VerifyRejected)?;
                }
            }
            flow.payload()
        };
        self.notify(payload);

        match &stored {
            Ok(session) => info!(user_id = %session.user_id, "Login verified"),
            Err(e) => warn!(error = %e, "Login verification failed"),
        }
        stored
    }

    /// Abandon the flow and return to `Idle`.
    ///
    /// Challenge data is dropped; the cooldown keeps running so abandoning a
    /// flow cannot be used to skip the resend wait. Refused while a send or
    /// a verification is outstanding.
    pub fn reset(&self) -> AuthResult<()> {
        let payload = {
            let mut flow = self.flow.lock();
            if flow.request_in_flight {
                return Err(AuthError::RequestInFlight);
            }
            match flow.state() {
                OtpState::Idle => return Ok(()),
                OtpState::Verifying => return Err(AuthError::VerificationInFlight),
                _ => {}
            }
            flow.apply(&OtpMachineInput::Reset)?;
            flow.challenge.discard();
            flow.payload()
        };
        self.notify(payload);
        Ok(())
    }

    /// Advance the cooldown by one second. Returns the seconds left.
    pub fn tick(&self) -> u32 {
        self.flow.lock().challenge.tick()
    }

    /// Tick the cooldown once per second until it reaches zero.
    pub fn spawn_cooldown_clock(self: &Arc<Self>) -> JoinHandle<()> {
        let login = Arc::clone(self);
        tokio::spawn(async move {
            while login.cooldown_remaining() > 0 {
                tokio::time::sleep(Duration::from_secs(1)).await;
                if login.tick() == 0 {
                    debug!("Resend cooldown elapsed");
                    break;
                }
            }
        })
    }
}
