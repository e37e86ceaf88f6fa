//! BAUTH mutual key establishment
//!
//! Two role state machines negotiate a 32-octet session key over an
//! untrusted channel: [`BauthCt`] (the token, responder) opens with its
//! ephemeral contribution and certificate, [`BauthT`] (the terminal,
//! initiator) answers with its own plus a signature over the joint
//! transcript, and optional key-confirmation tags close the run. Every
//! message is bound to both certificates through the transcript, so the
//! derived keys agree only between the two authenticated parties.
//!
//! Steps must be called in protocol order; a step invoked out of turn
//! fails with `BadState` and leaves the machine untouched, while a step
//! that fails mid-processing poisons the machine for good.

use core::mem;

use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::crypto::kdf::{derive_session_keys, SessionKeys};
use crate::crypto::{KeyAgreement, Prp, SignatureScheme};
use crate::cvc::{chain, Cvc};
use crate::error::{Error, Result};
use crate::params::SecurityLevel;


/// Length of the key-confirmation tags carried in M3 and M4.
pub const KC_LEN: usize = 32;

/// The full primitive suite one BAUTH run is parameterized over.
///
/// The signature scheme authenticates the transcript, the key agreement
/// contributes the ephemeral secret, and the cipher drives key derivation.
pub trait Suite: SignatureScheme + KeyAgreement {
    /// Block cipher for the key-derivation function.
    type Cipher: Prp;
}

/// Per-run protocol options.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Initiator key confirmation: M3 carries a tag proving the initiator
    /// derived the session key.
    pub kca: bool,
    /// Responder key confirmation: adds M4 and the final verification
    /// step. Requires `kca`.
    pub kcb: bool,
    /// Certificate that signed the peer certificate. When absent, peer
    /// certificates must be self-signed.
    pub trust_anchor: Option<Cvc>,
}

fn check_start<Z: Suite>(
    suite: &Z,
    level: SecurityLevel,
    settings: &Settings,
    private_key: &[u8],
    cert: &[u8],
) -> Result<()> {
    if private_key.len() != level.private_key_len() {
        return Err(Error::BadInput {
            context: "private key length does not match the level",
        });
    }
    if settings.kcb && !settings.kca {
        return Err(Error::BadInput {
            context: "responder key confirmation requires initiator key confirmation",
        });
    }
    Cvc::matches_private_key(cert, suite, private_key)
}

/// Checks `cert_bytes` against the trust anchor, or against its own
/// embedded key when no anchor is configured. The protocol has no clock,
/// so no validity-window date is applied here; [`BauthT::t_step5`] lets the
/// caller inject date or policy checks of its own.
fn validate_peer<Z: Suite>(suite: &Z, anchor: Option<&Cvc>, cert_bytes: &[u8]) -> Result<Cvc> {
    match anchor {
        Some(anchor) => chain::validate_decode(suite, cert_bytes, anchor, None),
        None => Cvc::unwrap(cert_bytes, suite, None),
    }
}

/// Splits `buf` into a leading field of `head_len` octets and exactly one
/// certificate frame.
fn split_pub_cert(buf: &[u8], head_len: usize) -> Result<(&[u8], &[u8])> {
    if buf.len() < head_len {
        return Err(Error::BadFormat {
            context: "message shorter than the ephemeral public key",
        });
    }
    let (head, rest) = buf.split_at(head_len);
    match Cvc::probe_len(rest).map_err(|_| Error::BadFormat {
        context: "message certificate frame",
    })? {
        Some(n) if n == rest.len() => Ok((head, rest)),
        _ => Err(Error::BadFormat {
            context: "message certificate frame",
        }),
    }
}

enum CtState {
    Start,
    AwaitM3 {
        eph_private: Zeroizing<Vec<u8>>,
        eph_public: Vec<u8>,
    },
    Done {
        key: Zeroizing<[u8; 32]>,
    },
    Failed,
}

/// Responder (token) side of a BAUTH run.
pub struct BauthCt<Z: Suite> {
    suite: Z,
    level: SecurityLevel,
    settings: Settings,
    private_key: Zeroizing<Vec<u8>>,
    cert: Vec<u8>,
    state: CtState,
}

impl<Z: Suite> BauthCt<Z> {
    /// Prepares the responder with its long-term key and certificate.
    pub fn start(
        suite: Z,
        level: SecurityLevel,
        settings: Settings,
        private_key: &[u8],
        cert: &[u8],
    ) -> Result<Self> {
        check_start(&suite, level, &settings, private_key, cert)?;
        Ok(BauthCt {
            suite,
            level,
            settings,
            private_key: Zeroizing::new(private_key.to_vec()),
            cert: cert.to_vec(),
            state: CtState::Start,
        })
    }

    /// Opens the run: `M2 = eph_pub_ct ++ cert_ct`.
    pub fn ct_step2<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<Vec<u8>> {
        match mem::replace(&mut self.state, CtState::Failed) {
            CtState::Start => {}
            other => {
                self.state = other;
                return Err(Error::BadState {
                    operation: "ct_step2 after the run opened",
                });
            }
        }
        let (eph_private, eph_public) = self.suite.ephemeral_keypair(rng)?;
        let mut m2 = Vec::with_capacity(eph_public.len() + self.cert.len());
        m2.extend_from_slice(&eph_public);
        m2.extend_from_slice(&self.cert);
        self.state = CtState::AwaitM3 {
            eph_private,
            eph_public,
        };
        Ok(m2)
    }

    /// Consumes `M3`, authenticates the initiator, and emits `M4`
    /// (`sig_ct ++ kc_ct` under responder key confirmation, empty
    /// otherwise).
    pub fn ct_step4(&mut self, m3: &[u8]) -> Result<Vec<u8>> {
        let (eph_private, eph_public) = match mem::replace(&mut self.state, CtState::Failed) {
            CtState::AwaitM3 {
                eph_private,
                eph_public,
            } => (eph_private, eph_public),
            other => {
                self.state = other;
                return Err(Error::BadState {
                    operation: "ct_step4 before M2 was produced",
                });
            }
        };

        // parse fully before any cryptography
        let (eph_pub_t, tail) = split_at_checked(m3, self.suite.public_len())?;
        let cert_t_len = match Cvc::probe_len(tail) {
            Ok(Some(n)) => n,
            _ => {
                return Err(Error::BadFormat {
                    context: "initiator certificate frame",
                })
            }
        };
        let (cert_t, tail) = tail.split_at(cert_t_len);
        let peer_level = Cvc::decode(cert_t)?.level()?;
        let kc_len = if self.settings.kca { KC_LEN } else { 0 };
        if tail.len() != peer_level.signature_len() + kc_len {
            return Err(Error::BadFormat {
                context: "M3 length does not match the certificate level",
            });
        }
        let (sig_t, kc_t) = tail.split_at(peer_level.signature_len());

        let peer = validate_peer(&self.suite, self.settings.trust_anchor.as_ref(), cert_t)?;
        let secret = self.suite.agree(&eph_private, eph_pub_t)?;

        let mut transcript =
            Vec::with_capacity(eph_public.len() + eph_pub_t.len() + self.cert.len() + cert_t.len());
        transcript.extend_from_slice(&eph_public);
        transcript.extend_from_slice(eph_pub_t);
        transcript.extend_from_slice(&self.cert);
        transcript.extend_from_slice(cert_t);
        let keys = derive_session_keys::<Z::Cipher>(&secret, &transcript)?;

        self.suite
            .verify(peer_level, &peer.pubkey, &transcript, sig_t)?;
        if self.settings.kca && !bool::from(kc_t.ct_eq(&keys.kc_t[..])) {
            return Err(Error::BadAuth {
                context: "initiator key-confirmation tag",
            });
        }

        let m4 = if self.settings.kcb {
            let sig_ct = self
                .suite
                .sign(self.level, &self.private_key, &transcript)?;
            let mut m4 = Vec::with_capacity(sig_ct.len() + KC_LEN);
            m4.extend_from_slice(&sig_ct);
            m4.extend_from_slice(&keys.kc_ct[..]);
            m4
        } else {
            Vec::new()
        };
        self.state = CtState::Done { key: keys.key };
        Ok(m4)
    }

    /// The established session key; `BadState` until the run completed.
    pub fn step_g(&self) -> Result<Zeroizing<[u8; 32]>> {
        match &self.state {
            CtState::Done { key } => Ok(key.clone()),
            _ => Err(Error::BadState {
                operation: "step_g before the run completed",
            }),
        }
    }
}

enum TState {
    Start,
    AwaitM4 {
        keys: SessionKeys,
        peer: Cvc,
        peer_level: SecurityLevel,
        transcript: Vec<u8>,
    },
    Done {
        key: Zeroizing<[u8; 32]>,
    },
    Failed,
}

/// Initiator (terminal) side of a BAUTH run.
pub struct BauthT<Z: Suite> {
    suite: Z,
    level: SecurityLevel,
    settings: Settings,
    private_key: Zeroizing<Vec<u8>>,
    cert: Vec<u8>,
    state: TState,
}

impl<Z: Suite> BauthT<Z> {
    /// Prepares the initiator with its long-term key and certificate.
    pub fn start(
        suite: Z,
        level: SecurityLevel,
        settings: Settings,
        private_key: &[u8],
        cert: &[u8],
    ) -> Result<Self> {
        check_start(&suite, level, &settings, private_key, cert)?;
        Ok(BauthT {
            suite,
            level,
            settings,
            private_key: Zeroizing::new(private_key.to_vec()),
            cert: cert.to_vec(),
            state: TState::Start,
        })
    }

    /// Consumes `M2`, authenticates the responder certificate, and emits
    /// `M3 = eph_pub_t ++ cert_t ++ sig_t [++ kc_t]`.
    pub fn t_step3<R: RngCore + CryptoRng>(&mut self, m2: &[u8], rng: &mut R) -> Result<Vec<u8>> {
        match mem::replace(&mut self.state, TState::Failed) {
            TState::Start => {}
            other => {
                self.state = other;
                return Err(Error::BadState {
                    operation: "t_step3 after the run opened",
                });
            }
        }

        let (eph_pub_ct, cert_ct) = split_pub_cert(m2, self.suite.public_len())?;
        let peer = validate_peer(&self.suite, self.settings.trust_anchor.as_ref(), cert_ct)?;
        let peer_level = peer.level()?;

        let (eph_private, eph_public) = self.suite.ephemeral_keypair(rng)?;
        let secret = self.suite.agree(&eph_private, eph_pub_ct)?;

        let mut transcript = Vec::with_capacity(
            eph_pub_ct.len() + eph_public.len() + cert_ct.len() + self.cert.len(),
        );
        transcript.extend_from_slice(eph_pub_ct);
        transcript.extend_from_slice(&eph_public);
        transcript.extend_from_slice(cert_ct);
        transcript.extend_from_slice(&self.cert);
        let keys = derive_session_keys::<Z::Cipher>(&secret, &transcript)?;

        let sig_t = self
            .suite
            .sign(self.level, &self.private_key, &transcript)?;
        let mut m3 =
            Vec::with_capacity(eph_public.len() + self.cert.len() + sig_t.len() + KC_LEN);
        m3.extend_from_slice(&eph_public);
        m3.extend_from_slice(&self.cert);
        m3.extend_from_slice(&sig_t);
        if self.settings.kca {
            m3.extend_from_slice(&keys.kc_t[..]);
        }

        self.state = if self.settings.kcb {
            TState::AwaitM4 {
                keys,
                peer,
                peer_level,
                transcript,
            }
        } else {
            TState::Done { key: keys.key }
        };
        Ok(m3)
    }

    /// Consumes `M4` and closes a run with responder key confirmation.
    ///
    /// `validator` sees the responder certificate once more before the
    /// signature check, for policy decisions beyond chain validation.
    pub fn t_step5(
        &mut self,
        m4: &[u8],
        validator: impl FnOnce(&Cvc) -> Result<()>,
    ) -> Result<()> {
        let (keys, peer, peer_level, transcript) =
            match mem::replace(&mut self.state, TState::Failed) {
                TState::AwaitM4 {
                    keys,
                    peer,
                    peer_level,
                    transcript,
                } => (keys, peer, peer_level, transcript),
                other => {
                    self.state = other;
                    return Err(Error::BadState {
                        operation: "t_step5 without responder key confirmation pending",
                    });
                }
            };

        if m4.len() != peer_level.signature_len() + KC_LEN {
            return Err(Error::BadFormat {
                context: "M4 length does not match the responder level",
            });
        }
        let (sig_ct, kc_ct) = m4.split_at(peer_level.signature_len());

        validator(&peer)?;
        self.suite
            .verify(peer_level, &peer.pubkey, &transcript, sig_ct)?;
        if !bool::from(kc_ct.ct_eq(&keys.kc_ct[..])) {
            return Err(Error::BadAuth {
                context: "responder key-confirmation tag",
            });
        }
        self.state = TState::Done { key: keys.key };
        Ok(())
    }

    /// The established session key; `BadState` until the run completed.
    pub fn step_g(&self) -> Result<Zeroizing<[u8; 32]>> {
        match &self.state {
            TState::Done { key } => Ok(key.clone()),
            _ => Err(Error::BadState {
                operation: "step_g before the run completed",
            }),
        }
    }
}

fn split_at_checked(buf: &[u8], n: usize) -> Result<(&[u8], &[u8])> {
    if buf.len() < n {
        return Err(Error::BadFormat {
            context: "message shorter than the ephemeral public key",
        });
    }
    Ok(buf.split_at(n))
}
