//! OTP login state machine using rust-fsm.
//!
//! ## Transitions
//!
//! ```text
//! Idle      --CodeSent-------->  Sent
//! Sent      --CodeSent-------->  Sent        (resend after cooldown)
//! Sent      --VerifyStarted--->  Verifying
//! Verifying --VerifySucceeded->  Verified
//! Verifying --VerifyRejected-->  Failed
//! Failed    --VerifyStarted--->  Verifying   (same challenge, next code)
//! Failed    --CodeSent-------->  Sent
//! Sent | Failed | Verified --Reset--> Idle
//! ```
//!
//! `Verifying` accepts neither `CodeSent` nor `Reset`: a resend can never
//! cancel an in-flight verification.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub otp_machine(Idle)

    Idle => {
        CodeSent => Sent
    },
    Sent => {
        // Resend once the cooldown has elapsed
        CodeSent => Sent,
        VerifyStarted => Verifying,
        Reset => Idle
    },
    Verifying => {
        VerifySucceeded => Verified,
        VerifyRejected => Failed
    },
    Failed => {
        // Try another code against the same challenge
        VerifyStarted => Verifying,
        CodeSent => Sent,
        Reset => Idle
    },
    Verified => {
        Reset => Idle
    }
}

pub use otp_machine::Input as OtpMachineInput;
pub use otp_machine::State as OtpMachineState;
pub use otp_machine::StateMachine as OtpMachine;

/// Externally visible OTP flow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpState {
    /// No code has been requested.
    Idle,
    /// A code was sent and can be verified.
    Sent,
    /// A code is being checked by the server.
    Verifying,
    /// The code was accepted and a session was stored.
    Verified,
    /// The last code was rejected; the challenge is still usable.
    Failed,
}

impl From<&OtpMachineState> for OtpState {
    fn from(state: &OtpMachineState) -> Self {
        match state {
            OtpMachineState::Idle => OtpState::Idle,
            OtpMachineState::Sent => OtpState::Sent,
            OtpMachineState::Verifying => OtpState::Verifying,
            OtpMachineState::Verified => OtpState::Verified,
            OtpMachineState::Failed => OtpState::Failed,
        }
    }
}

/// Payload for OTP state change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpStateChangedPayload {
    pub state: OtpState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_key: Option<String>,
    pub cooldown_remaining: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let machine = OtpMachine::new();
        assert_eq!(*machine.state(), OtpMachineState::Idle);
    }

    #[test]
    fn test_happy_path() {
        let mut machine = OtpMachine::new();

        machine.consume(&OtpMachineInput::CodeSent).unwrap();
        assert_eq!(*machine.state(), OtpMachineState::Sent);

        machine.consume(&OtpMachineInput::VerifyStarted).unwrap();
        assert_eq!(*machine.state(), OtpMachineState::Verifying);

        machine.consume(&OtpMachineInput::VerifySucceeded).unwrap();
        assert_eq!(*machine.state(), OtpMachineState::Verified);
    }

    #[test]
    fn test_rejected_code_can_be_retried() {
        let mut machine = OtpMachine::new();
        machine.consume(&OtpMachineInput::CodeSent).unwrap();
        machine.consume(&OtpMachineInput::VerifyStarted).unwrap();

        machine.consume(&OtpMachineInput::VerifyRejected).unwrap();
        assert_eq!(*machine.state(), OtpMachineState::Failed);

        machine.consume(&OtpMachineInput::VerifyStarted).unwrap();
        assert_eq!(*machine.state(), OtpMachineState::Verifying);
    }

    #[test]
    fn test_failed_allows_resend_and_reset() {
        let mut machine = OtpMachine::new();
        machine.consume(&OtpMachineInput::CodeSent).unwrap();
        machine.consume(&OtpMachineInput::VerifyStarted).unwrap();
        machine.consume(&OtpMachineInput::VerifyRejected).unwrap();

        machine.consume(&OtpMachineInput::CodeSent).unwrap();
        assert_eq!(*machine.state(), OtpMachineState::Sent);

        machine.consume(&OtpMachineInput::Reset).unwrap();
        assert_eq!(*machine.state(), OtpMachineState::Idle);
    }

    #[test]
    fn test_cannot_resend_while_verifying() {
        let mut machine = OtpMachine::new();
        machine.consume(&OtpMachineInput::CodeSent).unwrap();
        machine.consume(&OtpMachineInput::VerifyStarted).unwrap();

        assert!(machine.consume(&OtpMachineInput::CodeSent).is_err());
        assert!(machine.consume(&OtpMachineInput::Reset).is_err());
        assert_eq!(*machine.state(), OtpMachineState::Verifying);
    }

    #[test]
    fn test_cannot_verify_without_code() {
        let mut machine = OtpMachine::new();
        assert!(machine.consume(&OtpMachineInput::VerifyStarted).is_err());
        assert_eq!(*machine.state(), OtpMachineState::Idle);
    }

    #[test]
    fn test_state_conversion() {
        assert_eq!(OtpState::from(&OtpMachineState::Failed), OtpState::Failed);
        assert_eq!(OtpState::from(&OtpMachineState::Verifying), OtpState::Verifying);
    }
}
