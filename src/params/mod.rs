//! Security levels and long-term parameter identifiers
//!
//! The three supported levels correspond to the standard curve parameter
//! sets named by their object identifiers. Key and signature lengths are
//! fixed per level; all wire-format sizing in the crate derives from these.

use crate::error::{Error, Result};

/// Private key length at the 128-bit level, in octets
pub const PRIVATE_KEY_LEN_128: usize = 32;
/// Private key length at the 192-bit level, in octets
pub const PRIVATE_KEY_LEN_192: usize = 48;
/// Private key length at the 256-bit level, in octets
pub const PRIVATE_KEY_LEN_256: usize = 64;

/// Supported security level of the long-term signature parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityLevel {
    /// 128-bit level (32-octet private keys)
    L128,
    /// 192-bit level (48-octet private keys)
    L192,
    /// 256-bit level (64-octet private keys)
    L256,
}

impl SecurityLevel {
    /// All levels, in ascending strength order.
    pub const ALL: [SecurityLevel; 3] =
        [SecurityLevel::L128, SecurityLevel::L192, SecurityLevel::L256];

    /// Private key length in octets (32, 48, or 64).
    pub const fn private_key_len(self) -> usize {
        match self {
            SecurityLevel::L128 => PRIVATE_KEY_LEN_128,
            SecurityLevel::L192 => PRIVATE_KEY_LEN_192,
            SecurityLevel::L256 => PRIVATE_KEY_LEN_256,
        }
    }

    /// Public key length in octets, always twice the private key length.
    pub const fn public_key_len(self) -> usize {
        2 * self.private_key_len()
    }

    /// Signature length in octets (48, 72, or 96).
    pub const fn signature_len(self) -> usize {
        3 * self.private_key_len() / 2
    }

    /// Object identifier of the standard parameter set for this level.
    pub const fn oid(self) -> &'static str {
        match self {
            SecurityLevel::L128 => "1.2.112.0.2.0.34.101.45.3.1",
            SecurityLevel::L192 => "1.2.112.0.2.0.34.101.45.3.2",
            SecurityLevel::L256 => "1.2.112.0.2.0.34.101.45.3.3",
        }
    }

    /// Resolves a standard parameter-set object identifier.
    pub fn from_oid(oid: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.oid() == oid)
            .ok_or(Error::BadInput {
                context: "unknown parameter-set object identifier",
            })
    }

    /// Level implied by a private key length.
    pub fn from_private_key_len(len: usize) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.private_key_len() == len)
            .ok_or(Error::BadInput {
                context: "unsupported private key length",
            })
    }

    /// Level implied by a public key length.
    pub fn from_public_key_len(len: usize) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.public_key_len() == len)
            .ok_or(Error::BadInput {
                context: "unsupported public key length",
            })
    }

    /// Level implied by a signature length.
    pub fn from_signature_len(len: usize) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.signature_len() == len)
            .ok_or(Error::BadInput {
                context: "unsupported signature length",
            })
    }
}
