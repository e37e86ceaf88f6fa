//! Session-key derivation for BAUTH
//!
//! CMAC-based extract-then-expand over the suite cipher: the ephemeral
//! shared secret is compressed into a pseudorandom key, which keys an
//! expansion over the protocol transcript. The 96 octets of output split
//! into the session key and the two key-confirmation values.

use zeroize::Zeroizing;

use super::{cmac, Prp};
use crate::error::Result;

/// Keys derived from one BAUTH exchange.
pub struct SessionKeys {
    /// The 32-octet shared session key.
    pub key: Zeroizing<[u8; 32]>,
    /// Key-confirmation value proving the initiator derived the key.
    pub kc_t: Zeroizing<[u8; 32]>,
    /// Key-confirmation value proving the responder derived the key.
    pub kc_ct: Zeroizing<[u8; 32]>,
}

/// Derives the session and confirmation keys from the ephemeral shared
/// `secret` and the full protocol `transcript`.
///
/// Both sides call this with identical inputs; the transcript binds the
/// ephemeral contributions and both certificates, so any disagreement about
/// identities yields disjoint keys.
pub fn derive_session_keys<C: Prp>(secret: &[u8], transcript: &[u8]) -> Result<SessionKeys> {
    // extract
    let zeros = vec![0u8; C::KEY_SIZE];
    let extractor = C::new(&zeros)?;
    let prk = cmac(&extractor, secret);

    // re-key with the extracted value, cycled up to the cipher key size
    let mut key_material = Zeroizing::new(Vec::with_capacity(C::KEY_SIZE));
    while key_material.len() < C::KEY_SIZE {
        key_material.extend_from_slice(&prk);
    }
    key_material.truncate(C::KEY_SIZE);
    let expander = C::new(&key_material)?;

    // expand over the transcript
    let mut okm = Zeroizing::new([0u8; 96]);
    for i in 0..6u8 {
        let mut input = Vec::with_capacity(1 + transcript.len());
        input.push(i + 1);
        input.extend_from_slice(transcript);
        okm[usize::from(i) * 16..usize::from(i + 1) * 16]
            .copy_from_slice(&cmac(&expander, &input));
    }

    let mut key = Zeroizing::new([0u8; 32]);
    let mut kc_t = Zeroizing::new([0u8; 32]);
    let mut kc_ct = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&okm[..32]);
    kc_t.copy_from_slice(&okm[32..64]);
    kc_ct.copy_from_slice(&okm[64..]);
    Ok(SessionKeys { key, kc_t, kc_ct })
}
