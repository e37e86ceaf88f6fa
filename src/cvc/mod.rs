//! CV-certificates
//!
//! A compact binary certificate format for secure-token ecosystems: an
//! issuer identifier, a holder identifier, a validity window, two
//! access-rights bitmasks, the holder public key, and a trailing signature
//! by the issuer. No general-purpose ASN.1 — the frame is a flat
//! concatenation whose length is recoverable from a prefix.
//!
//! Wire layout:
//!
//! ```text
//! authority ++ 00 | holder ++ 00 | from[6] until[6] hat_eid[5] hat_esign[2]
//! pubkey_len sig_len | pubkey | signature
//! ```
//!
//! Identifiers are NUL-terminated and unpadded, so shorter identifiers
//! shrink the frame. The two length octets make the frame self-describing:
//! [`Cvc::probe_len`] answers "does this buffer hold a full certificate"
//! without touching the tail. The signature covers every byte up to the end
//! of the public key and is sized by the *issuer's* security level, which
//! may differ from the holder's.

use crate::crypto::SignatureScheme;
use crate::error::{Error, Result};
use crate::params::SecurityLevel;

mod date;
pub use date::Date;

pub mod chain;


/// Maximum identifier length (authority and holder), in octets.
pub const ID_MAX: usize = 16;
/// Length of the eID access-rights bitmask, in octets.
pub const HAT_EID_LEN: usize = 5;
/// Length of the eSign access-rights bitmask, in octets.
pub const HAT_ESIGN_LEN: usize = 2;

// ids are followed by dates, bitmasks, and the two length octets
const FIXED_LEN: usize = 6 + 6 + HAT_EID_LEN + HAT_ESIGN_LEN + 2;

/// An in-memory CV-certificate record.
///
/// The record never carries its own signature; the signature exists only in
/// the wire encoding produced by [`Cvc::wrap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cvc {
    /// Issuer identifier (non-empty, at most [`ID_MAX`] octets, no NUL).
    pub authority: String,
    /// Holder identifier (same constraints as `authority`).
    pub holder: String,
    /// First day of validity.
    pub from: Date,
    /// Last bound of validity (exclusive in window checks).
    pub until: Date,
    /// eID access-rights bitmask.
    pub hat_eid: [u8; HAT_EID_LEN],
    /// eSign access-rights bitmask.
    pub hat_esign: [u8; HAT_ESIGN_LEN],
    /// Holder public key; its length selects the holder's security level.
    pub pubkey: Vec<u8>,
}

/// Offsets of a structurally complete frame within a buffer.
struct Layout {
    authority_end: usize,
    holder_end: usize,
    pubkey_off: usize,
    holder_level: SecurityLevel,
    signer_level: SecurityLevel,
    total: usize,
}

fn check_id(id: &str, empty_reason: &'static str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::BadCert { reason: empty_reason });
    }
    if id.len() > ID_MAX {
        return Err(Error::BadCert {
            reason: "identifier longer than 16 octets",
        });
    }
    if id.bytes().any(|b| b == 0) {
        return Err(Error::BadCert {
            reason: "identifier contains a NUL octet",
        });
    }
    Ok(())
}

/// Locates the NUL terminator of an identifier starting at `start`.
///
/// `Ok(None)` means the buffer ended before the terminator could appear.
fn find_id_end(buf: &[u8], start: usize) -> Result<Option<usize>> {
    let window_end = (start + ID_MAX + 1).min(buf.len());
    match buf[start.min(buf.len())..window_end]
        .iter()
        .position(|&b| b == 0)
    {
        Some(0) => Err(Error::BadCert {
            reason: "empty identifier",
        }),
        Some(p) => Ok(Some(start + p)),
        None if buf.len() >= start + ID_MAX + 1 => Err(Error::BadCert {
            reason: "identifier terminator missing",
        }),
        None => Ok(None),
    }
}

/// Walks the prefix of `buf`; `Ok(None)` means "structurally plausible but
/// incomplete", errors mean the prefix cannot be a certificate.
fn layout(buf: &[u8]) -> Result<Option<Layout>> {
    let authority_end = match find_id_end(buf, 0)? {
        Some(p) => p,
        None => return Ok(None),
    };
    let holder_end = match find_id_end(buf, authority_end + 1)? {
        Some(p) => p,
        None => return Ok(None),
    };
    let pubkey_off = holder_end + 1 + FIXED_LEN;
    if buf.len() < pubkey_off {
        return Ok(None);
    }
    let holder_level = SecurityLevel::from_public_key_len(usize::from(buf[pubkey_off - 2]))
        .map_err(|_| Error::BadCert {
            reason: "unsupported public key length",
        })?;
    let signer_level = SecurityLevel::from_signature_len(usize::from(buf[pubkey_off - 1]))
        .map_err(|_| Error::BadCert {
            reason: "unsupported signature length",
        })?;
    let total = pubkey_off + holder_level.public_key_len() + signer_level.signature_len();
    if buf.len() < total {
        return Ok(None);
    }
    Ok(Some(Layout {
        authority_end,
        holder_end,
        pubkey_off,
        holder_level,
        signer_level,
        total,
    }))
}

/// A fully parsed frame: the record plus the signed body and signature.
struct Parsed<'a> {
    record: Cvc,
    body: &'a [u8],
    signature: &'a [u8],
    signer_level: SecurityLevel,
}

fn parse(buf: &[u8]) -> Result<Parsed<'_>> {
    let lay = match layout(buf)? {
        Some(l) => l,
        None => {
            return Err(Error::BadCert {
                reason: "truncated certificate",
            })
        }
    };
    if buf.len() != lay.total {
        return Err(Error::BadCert {
            reason: "trailing bytes after certificate",
        });
    }
    let authority = core::str::from_utf8(&buf[..lay.authority_end])
        .map_err(|_| Error::BadCert {
            reason: "authority is not valid UTF-8",
        })?
        .to_owned();
    let holder = core::str::from_utf8(&buf[lay.authority_end + 1..lay.holder_end])
        .map_err(|_| Error::BadCert {
            reason: "holder is not valid UTF-8",
        })?
        .to_owned();
    let mut off = lay.holder_end + 1;
    let mut take = |n: usize| {
        let s = &buf[off..off + n];
        off += n;
        s
    };
    let from = Date::new(take(6).try_into().expect("fixed-size slice"))?;
    let until = Date::new(take(6).try_into().expect("fixed-size slice"))?;
    let hat_eid: [u8; HAT_EID_LEN] = take(HAT_EID_LEN).try_into().expect("fixed-size slice");
    let hat_esign: [u8; HAT_ESIGN_LEN] =
        take(HAT_ESIGN_LEN).try_into().expect("fixed-size slice");
    take(2); // length octets, already consumed by layout()
    let pubkey = take(lay.holder_level.public_key_len()).to_vec();

    let record = Cvc {
        authority,
        holder,
        from,
        until,
        hat_eid,
        hat_esign,
        pubkey,
    };
    record.check()?;
    Ok(Parsed {
        record,
        body: &buf[..lay.pubkey_off + lay.holder_level.public_key_len()],
        signature: &buf[lay.pubkey_off + lay.holder_level.public_key_len()..],
        signer_level: lay.signer_level,
    })
}

impl Cvc {
    /// Validates the in-memory field constraints.
    ///
    /// No cryptography: identifier lengths, validity-window ordering, and
    /// the public-key length are checked; any violation is `BadCert`.
    pub fn check(&self) -> Result<()> {
        check_id(&self.authority, "empty authority identifier")?;
        check_id(&self.holder, "empty holder identifier")?;
        if self.from > self.until {
            return Err(Error::BadCert {
                reason: "validity window inverted",
            });
        }
        self.level().map(|_| ())
    }

    /// The holder's security level, implied by the public key length.
    pub fn level(&self) -> Result<SecurityLevel> {
        SecurityLevel::from_public_key_len(self.pubkey.len()).map_err(|_| Error::BadCert {
            reason: "unsupported public key length",
        })
    }

    /// Exact wire length this record would wrap to when signed at
    /// `signer_level`, without performing any signing.
    pub fn wrapped_len(&self, signer_level: SecurityLevel) -> Result<usize> {
        self.check()?;
        Ok(self.authority.len() + 1
            + self.holder.len() + 1
            + FIXED_LEN
            + self.pubkey.len()
            + signer_level.signature_len())
    }

    // header + public key, i.e. everything the signature covers
    fn encode_body(&self, signer_level: SecurityLevel) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.authority.len() + self.holder.len() + 2 + FIXED_LEN + self.pubkey.len(),
        );
        out.extend_from_slice(self.authority.as_bytes());
        out.push(0);
        out.extend_from_slice(self.holder.as_bytes());
        out.push(0);
        out.extend_from_slice(self.from.as_bytes());
        out.extend_from_slice(self.until.as_bytes());
        out.extend_from_slice(&self.hat_eid);
        out.extend_from_slice(&self.hat_esign);
        out.push(self.pubkey.len() as u8);
        out.push(signer_level.signature_len() as u8);
        out.extend_from_slice(&self.pubkey);
        out
    }

    /// Serializes the record and appends a signature under `private_key`.
    ///
    /// The private-key length selects the signer's level; an unsupported
    /// length is `BadInput`. A record that fails [`Cvc::check`] is refused
    /// before any signing happens.
    pub fn wrap<S: SignatureScheme>(
        &self,
        scheme: &S,
        private_key: &[u8],
    ) -> Result<Vec<u8>> {
        self.check()?;
        let signer = SecurityLevel::from_private_key_len(private_key.len())?;
        let mut out = self.encode_body(signer);
        let sig = scheme.sign(signer, private_key, &out)?;
        if sig.len() != signer.signature_len() {
            return Err(Error::BadInput {
                context: "signature scheme produced a wrong-length signature",
            });
        }
        out.extend_from_slice(&sig);
        Ok(out)
    }

    /// Structural decode without any signature verification.
    ///
    /// This is the "extract the public key from an untrusted buffer" entry
    /// point; prefer [`Cvc::unwrap`] or [`chain`] whenever a trust decision
    /// follows.
    pub fn decode(buf: &[u8]) -> Result<Cvc> {
        parse(buf).map(|p| p.record)
    }

    /// Decodes a certificate and verifies its self-signature.
    ///
    /// Verification uses the embedded public key, so this succeeds only for
    /// self-signed frames (certificate requests, trust roots); issuer-signed
    /// certificates go through [`chain::validate`]. With
    /// `expected_pubkey = Some(key)` the embedded key must additionally be
    /// byte-identical to `key`, confirming the frame certifies a known key.
    pub fn unwrap<S: SignatureScheme>(
        buf: &[u8],
        scheme: &S,
        expected_pubkey: Option<&[u8]>,
    ) -> Result<Cvc> {
        let parsed = parse(buf)?;
        if let Some(key) = expected_pubkey {
            if key != parsed.record.pubkey.as_slice() {
                return Err(Error::BadCert {
                    reason: "embedded public key does not match the expected key",
                });
            }
        }
        if parsed.record.pubkey.len() != parsed.signer_level.public_key_len() {
            return Err(Error::BadSig {
                context: "certificate is not self-signed",
            });
        }
        scheme.verify(
            parsed.signer_level,
            &parsed.record.pubkey,
            parsed.body,
            parsed.signature,
        )?;
        Ok(parsed.record)
    }

    /// Decodes and verifies against an issuer public key.
    pub(crate) fn unwrap_with_issuer_key<S: SignatureScheme>(
        buf: &[u8],
        scheme: &S,
        issuer_pubkey: &[u8],
    ) -> Result<Cvc> {
        let parsed = parse(buf)?;
        if issuer_pubkey.len() != parsed.signer_level.public_key_len() {
            return Err(Error::BadSig {
                context: "issuer key does not match the signature level",
            });
        }
        scheme.verify(
            parsed.signer_level,
            issuer_pubkey,
            parsed.body,
            parsed.signature,
        )?;
        Ok(parsed.record)
    }

    /// Length of the first certificate in `buf`, if one is fully present.
    ///
    /// `Ok(Some(n))` reports the first record's exact length even when the
    /// buffer is larger; `Ok(None)` means the buffer is any amount short of
    /// a full record; `BadCert` means the prefix cannot be a certificate.
    pub fn probe_len(buf: &[u8]) -> Result<Option<usize>> {
        Ok(layout(buf)?.map(|l| l.total))
    }

    /// Confirms that the certificate in `buf` embeds the public key
    /// belonging to `private_key`.
    ///
    /// A key-consistency check only — the signature is not verified.
    pub fn matches_private_key<S: SignatureScheme>(
        buf: &[u8],
        scheme: &S,
        private_key: &[u8],
    ) -> Result<()> {
        let record = Cvc::decode(buf)?;
        let level = SecurityLevel::from_private_key_len(private_key.len())?;
        if level != record.level()? {
            return Err(Error::BadCert {
                reason: "certificate public key does not match the private key",
            });
        }
        let public = scheme.public_key(level, private_key)?;
        if public != record.pubkey {
            return Err(Error::BadCert {
                reason: "certificate public key does not match the private key",
            });
        }
        Ok(())
    }
}
