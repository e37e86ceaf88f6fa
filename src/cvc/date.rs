//! Packed certificate dates
//!
//! Validity bounds travel as six octets, one decimal digit per octet, laid
//! out `YY MM DD` with two digits per component (years are 2000-relative).
//! Byte-lexicographic order on that layout equals chronological order, so
//! the type derives its `Ord` straight from the packed form.

use crate::error::{Error, Result};

/// A packed 6-digit certificate date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date([u8; 6]);

impl Date {
    /// Builds a date from six digit octets.
    ///
    /// Each octet must be a decimal digit; the month must be 01..=12 and the
    /// day 01..=31. Violations are `BadCert` (dates only ever live inside
    /// certificate records).
    pub fn new(digits: [u8; 6]) -> Result<Self> {
        if digits.iter().any(|&d| d > 9) {
            return Err(Error::BadCert {
                reason: "date octet is not a decimal digit",
            });
        }
        let month = digits[2] * 10 + digits[3];
        let day = digits[4] * 10 + digits[5];
        if month < 1 || month > 12 {
            return Err(Error::BadCert {
                reason: "date month out of range",
            });
        }
        if day < 1 || day > 31 {
            return Err(Error::BadCert {
                reason: "date day out of range",
            });
        }
        Ok(Date(digits))
    }

    /// Builds a date from two-digit year, month, and day values.
    pub fn from_ymd(yy: u8, mm: u8, dd: u8) -> Result<Self> {
        if yy > 99 {
            return Err(Error::BadCert {
                reason: "date year out of range",
            });
        }
        Self::new([yy / 10, yy % 10, mm / 10, mm % 10, dd / 10, dd % 10])
    }

    /// The packed digit octets.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}
