//! Session and login core for the mall console.
//!
//! This crate provides:
//! - Email OTP login as an explicit FSM with a resend cooldown clock
//! - Session persistence, expiry detection, and token refresh over
//!   [`console_storage::SecureStorage`]
//! - The identity service client (send code, verify code, refresh)

mod challenge;
mod error;
mod identity_client;
mod jwt;
mod login;
mod otp_fsm;
mod session;

#[cfg(test)]
mod testing;

pub use challenge::{validate_code, validate_email, OtpChallenge, OtpConfig};
pub use error::{AuthError, AuthResult};
pub use identity_client::{
    extract_credentials, CodeIssued, IdentityApi, IdentityClient, IssuedCredentials,
    RefreshedTokens, VerifyOutcome, VerifyRequest,
};
pub use jwt::expiry_from_jwt;
pub use login::{OtpLogin, OtpStateCallback};
pub use otp_fsm::otp_machine;
pub use otp_fsm::{OtpMachine, OtpMachineInput, OtpMachineState, OtpState, OtpStateChangedPayload};
pub use session::{AuthStatus, Session, SessionStore};
