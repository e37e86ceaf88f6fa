//! Deterministic substitutes for the out-of-scope primitives
//!
//! The protocol tests need a signature scheme with the right key and
//! signature geometry per level, reproducible from fixed seeds. `StubScheme`
//! derives public keys and signatures by keyed expansion from the private
//! key, so keypair consistency, tamper detection, and wrong-key rejection
//! all behave like the real scheme while staying replayable. Not a real
//! signature scheme — test builds only.

use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::bauth::Suite;
use crate::crypto::{cmac, Aes256, KeyAgreement, Prp, SignatureScheme, X25519};
use crate::error::{Error, Result};
use crate::params::SecurityLevel;

/// Deterministic signature-scheme double.
pub struct StubScheme;

/// Full suite double: stub signatures, real X25519, AES-256.
pub struct StubSuite;

fn base() -> Aes256 {
    Aes256::new(&[0x42u8; 32]).expect("fixed-size key")
}

/// Keyed expansion of `seed` to `out_len` octets under a domain `label`.
fn expand(label: u8, seed: &[u8], out_len: usize) -> Vec<u8> {
    let base = base();
    let mut input = vec![label];
    input.extend_from_slice(seed);
    let k1 = cmac(&base, &input);
    input.push(0xFF);
    let k2 = cmac(&base, &input);

    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(&k1);
    key.extend_from_slice(&k2);
    let cipher = Aes256::new(&key).expect("fixed-size key");

    let mut out = Vec::with_capacity(out_len + 16);
    let mut counter = 0u64;
    while out.len() < out_len {
        let mut block = [0u8; 16];
        block[8..].copy_from_slice(&counter.to_be_bytes());
        cipher.encrypt_block(&mut block);
        out.extend_from_slice(&block);
        counter += 1;
    }
    out.truncate(out_len);
    out
}

fn signature_of(level: SecurityLevel, public_key: &[u8], data: &[u8]) -> Vec<u8> {
    let digest = cmac(&base(), data);
    let mut seed = public_key.to_vec();
    seed.extend_from_slice(&digest);
    expand(0x03, &seed, level.signature_len())
}

impl SignatureScheme for StubScheme {
    fn keypair<R: RngCore + CryptoRng>(
        &self,
        level: SecurityLevel,
        rng: &mut R,
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
        let mut private = Zeroizing::new(vec![0u8; level.private_key_len()]);
        rng.fill_bytes(&mut private);
        let public = self.public_key(level, &private)?;
        Ok((private, public))
    }

    fn public_key(&self, level: SecurityLevel, private_key: &[u8]) -> Result<Vec<u8>> {
        if private_key.len() != level.private_key_len() {
            return Err(Error::BadInput {
                context: "private key length does not match level",
            });
        }
        Ok(expand(0x01, private_key, level.public_key_len()))
    }

    fn sign(&self, level: SecurityLevel, private_key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let public = self.public_key(level, private_key)?;
        Ok(signature_of(level, &public, data))
    }

    fn verify(
        &self,
        level: SecurityLevel,
        public_key: &[u8],
        data: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        if public_key.len() != level.public_key_len() {
            return Err(Error::BadInput {
                context: "public key length does not match level",
            });
        }
        let expected = signature_of(level, public_key, data);
        if signature.len() != expected.len() || !bool::from(signature.ct_eq(&expected)) {
            return Err(Error::BadSig {
                context: "signature does not verify",
            });
        }
        Ok(())
    }
}

impl SignatureScheme for StubSuite {
    fn keypair<R: RngCore + CryptoRng>(
        &self,
        level: SecurityLevel,
        rng: &mut R,
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
        StubScheme.keypair(level, rng)
    }

    fn public_key(&self, level: SecurityLevel, private_key: &[u8]) -> Result<Vec<u8>> {
        StubScheme.public_key(level, private_key)
    }

    fn sign(&self, level: SecurityLevel, private_key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        StubScheme.sign(level, private_key, data)
    }

    fn verify(
        &self,
        level: SecurityLevel,
        public_key: &[u8],
        data: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        StubScheme.verify(level, public_key, data, signature)
    }
}

impl KeyAgreement for StubSuite {
    fn public_len(&self) -> usize {
        X25519.public_len()
    }

    fn ephemeral_keypair<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
        X25519.ephemeral_keypair(rng)
    }

    fn agree(&self, private: &[u8], peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        X25519.agree(private, peer_public)
    }
}

impl Suite for StubSuite {
    type Cipher = Aes256;
}
