//! X25519 provider for the [`KeyAgreement`] seam

use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::KeyAgreement;
use crate::error::{Error, Result};

/// Length of X25519 public and private contributions, in octets.
pub const X25519_KEY_LEN: usize = 32;

/// X25519 ephemeral key agreement.
pub struct X25519;

impl KeyAgreement for X25519 {
    fn public_len(&self) -> usize {
        X25519_KEY_LEN
    }

    fn ephemeral_keypair<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
        let mut scalar = Zeroizing::new([0u8; X25519_KEY_LEN]);
        rng.fill_bytes(scalar.as_mut());
        let public = x25519_dalek::x25519(*scalar, x25519_dalek::X25519_BASEPOINT_BYTES);
        Ok((Zeroizing::new(scalar.to_vec()), public.to_vec()))
    }

    fn agree(&self, private: &[u8], peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let scalar: [u8; X25519_KEY_LEN] =
            private.try_into().map_err(|_| Error::BadInput {
                context: "X25519 private key must be 32 octets",
            })?;
        let point: [u8; X25519_KEY_LEN] =
            peer_public.try_into().map_err(|_| Error::BadFormat {
                context: "X25519 peer public key must be 32 octets",
            })?;
        let shared = x25519_dalek::x25519(scalar, point);
        // reject low-order peer contributions (all-zero shared secret)
        if bool::from(shared.ct_eq(&[0u8; X25519_KEY_LEN])) {
            return Err(Error::BadAuth {
                context: "X25519 low-order peer public key",
            });
        }
        Ok(Zeroizing::new(shared.to_vec()))
    }
}
