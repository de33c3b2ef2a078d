//! Core types and utilities shared by the samlkit crates.
//!
//! This crate provides the `Result` alias used for error propagation and the
//! strongly-typed identifiers placed in the `ID` attribute of outbound SAML
//! protocol messages.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{AuthnRequestId, LogoutRequestId, ParseIdError};
