//! Error handling for the token protocol stack
//!
//! Every failure is surfaced synchronously as a value of [`Error`]; there
//! are no internal retries and no panics on the library's error paths. The
//! variants carry static context only, so constructing an error never
//! allocates.

use core::fmt;

/// The error type for certificate, secure-messaging, and BAUTH operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed or out-of-range caller argument (never wire data)
    BadInput {
        /// Argument or precondition that was violated
        context: &'static str,
    },

    /// Structurally or semantically invalid certificate material
    BadCert {
        /// What about the certificate was rejected
        reason: &'static str,
    },

    /// Structurally invalid wire frame (APDU or secure-messaging)
    BadFormat {
        /// Frame or field where parsing failed
        context: &'static str,
    },

    /// Signature or MAC verification failure
    BadSig {
        /// What failed to verify
        context: &'static str,
    },

    /// Key-confirmation or authentication-tag failure
    BadAuth {
        /// Tag or proof that failed to verify
        context: &'static str,
    },

    /// Date outside a certificate validity window
    OutOfRange {
        /// Check that was violated
        context: &'static str,
    },

    /// State-machine operation invoked out of sequence
    BadState {
        /// Operation that was attempted
        operation: &'static str,
    },
}

/// Result type for all operations in this crate
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadInput { context } => write!(f, "bad input: {}", context),
            Error::BadCert { reason } => write!(f, "bad certificate: {}", reason),
            Error::BadFormat { context } => write!(f, "bad frame format: {}", context),
            Error::BadSig { context } => write!(f, "verification failed: {}", context),
            Error::BadAuth { context } => write!(f, "authentication failed: {}", context),
            Error::OutOfRange { context } => write!(f, "out of range: {}", context),
            Error::BadState { operation } => {
                write!(f, "operation out of sequence: {}", operation)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_context() {
        let e = Error::BadCert {
            reason: "unsupported public key length",
        };
        assert_eq!(
            e.to_string(),
            "bad certificate: unsupported public key length"
        );
        let e = Error::BadState { operation: "step_g" };
        assert!(e.to_string().contains("step_g"));
    }

    #[test]
    fn errors_compare_by_kind_and_context() {
        assert_eq!(
            Error::BadSig { context: "mac" },
            Error::BadSig { context: "mac" }
        );
        assert_ne!(
            Error::BadSig { context: "mac" },
            Error::BadAuth { context: "mac" }
        );
    }
}
