//! Secure-token protocol toolkit.
//!
//! This crate implements the protocol cluster spoken between a terminal and
//! a secure token:
//!
//! - **CV-certificates** ([`cvc`]) — a compact binary certificate format
//!   with chain-of-trust validation and delegated issuance;
//! - **Secure messaging** ([`sm`], [`apdu`]) — encrypted and
//!   integrity-protected framing of APDU command/response exchanges over a
//!   counter-derived keystream;
//! - **BAUTH** ([`bauth`]) — a 5-message mutual authentication and
//!   key-establishment protocol producing a 32-octet session key.
//!
//! The underlying public-key signature scheme, ephemeral key agreement, and
//! block cipher are consumed through the narrow seams in [`crypto`], so the
//! protocol logic is testable with deterministic substitutes and usable with
//! whatever primitive providers the caller certifies. AES-256 and X25519
//! providers are included.
//!
//! All buffers are caller-owned; operations are synchronous and never retry
//! internally. Randomness is always passed in explicitly, never read from
//! ambient state.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub use error::{Error, Result};

pub mod params;
pub use params::SecurityLevel;

pub mod crypto;
pub use crypto::{KeyAgreement, Prp, SignatureScheme};

pub mod cvc;
pub use cvc::{Cvc, Date};

pub mod apdu;
pub use apdu::{Command, Response};

pub mod sm;
pub use sm::SmState;

pub mod bauth;
pub use bauth::{BauthCt, BauthT, Settings, Suite};

#[cfg(test)]
pub(crate) mod testkit;
