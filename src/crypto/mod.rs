//! Primitive seams consumed by the protocol layers
//!
//! The curve arithmetic behind the signature scheme, the ephemeral key
//! agreement, and the block cipher are external collaborators. This module
//! defines the narrow traits through which the certificate, secure-messaging
//! and BAUTH code consume them, plus concrete providers for the symmetric
//! side (AES-256) and the key-agreement side (X25519). Callers supply their
//! own certified [`SignatureScheme`] implementation.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::error::Result;
use crate::params::SecurityLevel;

pub mod aes;
pub mod cmac;
pub mod kdf;
pub mod x25519;

pub use self::aes::Aes256;
pub use self::x25519::X25519;
pub use cmac::cmac;

/// A keyed pseudorandom permutation over 16-octet blocks.
///
/// The secure-messaging keystream, the MAC, and the BAUTH key derivation are
/// all built generically on top of this trait.
pub trait Prp: Sized {
    /// Key length in octets accepted by [`Prp::new`].
    const KEY_SIZE: usize;

    /// Creates an instance keyed with `key` (`BadInput` on a wrong length).
    fn new(key: &[u8]) -> Result<Self>;

    /// Encrypts one block in place.
    fn encrypt_block(&self, block: &mut [u8; 16]);
}

/// A signature scheme with level-selectable long-term parameters.
///
/// Key and signature lengths per level are fixed by [`SecurityLevel`];
/// implementations must reject keys whose length does not match the level
/// with `BadInput`.
pub trait SignatureScheme {
    /// Generates a keypair at `level`, returning `(private, public)`.
    fn keypair<R: RngCore + CryptoRng>(
        &self,
        level: SecurityLevel,
        rng: &mut R,
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)>;

    /// Recomputes the public key bound to `private_key`.
    fn public_key(&self, level: SecurityLevel, private_key: &[u8]) -> Result<Vec<u8>>;

    /// Signs `data` with `private_key`.
    fn sign(&self, level: SecurityLevel, private_key: &[u8], data: &[u8]) -> Result<Vec<u8>>;

    /// Verifies `signature` over `data` against `public_key`.
    ///
    /// Fails with `BadSig` on mismatch.
    fn verify(
        &self,
        level: SecurityLevel,
        public_key: &[u8],
        data: &[u8],
        signature: &[u8],
    ) -> Result<()>;
}

/// An unauthenticated ephemeral key agreement.
pub trait KeyAgreement {
    /// Length of the public contribution exchanged on the wire.
    fn public_len(&self) -> usize;

    /// Generates an ephemeral keypair, returning `(private, public)`.
    fn ephemeral_keypair<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)>;

    /// Derives the shared secret from an own private and a peer public key.
    fn agree(&self, private: &[u8], peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}
