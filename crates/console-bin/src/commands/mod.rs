//! Command implementations.
//!
//! Each command writes its normal output to the writer it is given and
//! returns a [`crate::error::CliError`] for anything the user must see on
//! stderr.

pub mod fetch;
pub mod login;
pub mod session;
