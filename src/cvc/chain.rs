//! Chain-of-trust validation and delegated issuance
//!
//! A chain is walked one link at a time: every call validates exactly one
//! certificate against its (already trusted) issuer, so an N-link chain is
//! N calls starting from a trusted root. The same linkage invariant —
//! `issuer.holder == certificate.authority` — is enforced at issuance time,
//! not only at verification time.

use super::{Cvc, Date};
use crate::crypto::SignatureScheme;
use crate::error::{Error, Result};
use crate::params::SecurityLevel;

/// Validates one chain link given the issuer's wire certificate.
///
/// The issuer certificate is decoded structurally only — the caller vouches
/// for it (it is the previous link, or the trusted root). The presented
/// `cert` must carry a signature verifiable with the issuer's public key
/// (`BadSig`), name the issuer's holder as its authority (`BadCert`), and,
/// when `at` is given, cover it in the half-open window
/// `from <= at < until` (`OutOfRange`).
pub fn validate<S: SignatureScheme>(
    scheme: &S,
    cert: &[u8],
    issuer_cert: &[u8],
    at: Option<Date>,
) -> Result<()> {
    let issuer = Cvc::decode(issuer_cert)?;
    validate_decode(scheme, cert, &issuer, at).map(|_| ())
}

/// Validates one chain link against an already-decoded issuer record and
/// returns the decoded certificate, ready to act as the next link's issuer.
pub fn validate_decode<S: SignatureScheme>(
    scheme: &S,
    cert: &[u8],
    issuer: &Cvc,
    at: Option<Date>,
) -> Result<Cvc> {
    let record = Cvc::unwrap_with_issuer_key(cert, scheme, &issuer.pubkey)?;
    if issuer.holder != record.authority {
        return Err(Error::BadCert {
            reason: "issuer holder does not match certificate authority",
        });
    }
    if let Some(at) = at {
        if at < record.from || at >= record.until {
            return Err(Error::OutOfRange {
                context: "date outside certificate validity window",
            });
        }
    }
    Ok(record)
}

/// Issues a certificate for `record`, delegated from `issuer_cert`.
///
/// The issuer certificate must decode, its holder must equal the new
/// record's authority (`BadCert`), and `issuer_private_key` must be the key
/// certified by `issuer_cert` — issuance refuses to create a link that
/// could never validate.
pub fn issue<S: SignatureScheme>(
    scheme: &S,
    record: &Cvc,
    issuer_cert: &[u8],
    issuer_private_key: &[u8],
) -> Result<Vec<u8>> {
    let issuer = Cvc::decode(issuer_cert)?;
    if issuer.holder != record.authority {
        return Err(Error::BadCert {
            reason: "issuer holder does not match certificate authority",
        });
    }
    let signer = SecurityLevel::from_private_key_len(issuer_private_key.len())?;
    if signer != issuer.level()? {
        return Err(Error::BadCert {
            reason: "issuer private key does not match issuer certificate level",
        });
    }
    let issuer_public = scheme.public_key(signer, issuer_private_key)?;
    if issuer_public != issuer.pubkey {
        return Err(Error::BadCert {
            reason: "issuer private key does not match issuer certificate",
        });
    }
    record.wrap(scheme, issuer_private_key)
}
