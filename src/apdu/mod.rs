//! APDU command and response structures and their unprotected encoding
//!
//! The unprotected codec is the classic short/extended length scheme: a
//! command is `cla ins p1 p2` followed by an optional command data field
//! with its length prefix and an optional expected-response-length marker;
//! a response is the response data field followed by the two status octets.
//! Within the supported length domain (0..=257 for both fields) every
//! command encodes to a distinct frame and decodes back exactly — the
//! secure-messaging layer relies on that.

use crate::error::{Error, Result};

#[cfg(test)]
mod tests;

/// Maximum command data field length (extended-length edge case included).
pub const CDF_MAX: usize = 257;
/// Maximum response data field length.
pub const RDF_MAX: usize = 257;

/// An APDU command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Class octet.
    pub cla: u8,
    /// Instruction octet.
    pub ins: u8,
    /// First parameter octet.
    pub p1: u8,
    /// Second parameter octet.
    pub p2: u8,
    /// Command data field (at most [`CDF_MAX`] octets).
    pub cdf: Vec<u8>,
    /// Expected response data length, 0..=[`RDF_MAX`]; 0 means no response
    /// data is expected.
    pub rdf_len: usize,
}

/// An APDU response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// First status octet.
    pub sw1: u8,
    /// Second status octet.
    pub sw2: u8,
    /// Response data field (at most [`RDF_MAX`] octets).
    pub rdf: Vec<u8>,
}

impl Command {
    /// Validates the field bounds.
    pub fn check(&self) -> Result<()> {
        if self.cdf.len() > CDF_MAX {
            return Err(Error::BadInput {
                context: "command data field longer than 257 octets",
            });
        }
        if self.rdf_len > RDF_MAX {
            return Err(Error::BadInput {
                context: "expected response length above 257",
            });
        }
        Ok(())
    }

    /// Exact unprotected frame length, without encoding.
    pub fn encoded_len(&self) -> Result<usize> {
        self.check()?;
        let extended = self.cdf.len() > 255 || self.rdf_len > 256;
        let mut len = 4;
        if !self.cdf.is_empty() {
            len += if extended { 3 } else { 1 } + self.cdf.len();
        }
        if self.rdf_len > 0 {
            len += if !extended {
                1
            } else if self.cdf.is_empty() {
                3
            } else {
                2
            };
        }
        Ok(len)
    }

    /// Encodes the unprotected frame.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.check()?;
        let extended = self.cdf.len() > 255 || self.rdf_len > 256;
        let mut out = Vec::with_capacity(self.encoded_len()?);
        out.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);
        if !self.cdf.is_empty() {
            if extended {
                out.push(0);
                out.extend_from_slice(&(self.cdf.len() as u16).to_be_bytes());
            } else {
                out.push(self.cdf.len() as u8);
            }
            out.extend_from_slice(&self.cdf);
        }
        if self.rdf_len > 0 {
            if extended {
                if self.cdf.is_empty() {
                    out.push(0);
                }
                out.extend_from_slice(&(self.rdf_len as u16).to_be_bytes());
            } else {
                // 256 encodes as 00 in the short form
                out.push(self.rdf_len as u8);
            }
        }
        Ok(out)
    }

    /// Decodes an unprotected frame.
    pub fn decode(buf: &[u8]) -> Result<Command> {
        if buf.len() < 4 {
            return Err(Error::BadFormat {
                context: "command frame shorter than the header",
            });
        }
        let (cla, ins, p1, p2) = (buf[0], buf[1], buf[2], buf[3]);
        let body = &buf[4..];
        let (cdf, rdf_len) = decode_body(body)?;
        let cmd = Command {
            cla,
            ins,
            p1,
            p2,
            cdf,
            rdf_len,
        };
        cmd.check().map_err(|_| Error::BadFormat {
            context: "command field bounds",
        })?;
        Ok(cmd)
    }
}

/// Splits the post-header body into the data field and the expected
/// response length, across all short/extended cases.
fn decode_body(body: &[u8]) -> Result<(Vec<u8>, usize)> {
    let bad = Err(Error::BadFormat {
        context: "command body length fields",
    });
    if body.is_empty() {
        return Ok((Vec::new(), 0));
    }
    if body[0] != 0 {
        // short form
        if body.len() == 1 {
            let le = body[0] as usize;
            return Ok((Vec::new(), le));
        }
        let lc = body[0] as usize;
        if body.len() == 1 + lc {
            return Ok((body[1..].to_vec(), 0));
        }
        if body.len() == 2 + lc {
            let le = body[1 + lc] as usize;
            let le = if le == 0 { 256 } else { le };
            return Ok((body[1..1 + lc].to_vec(), le));
        }
        return bad;
    }
    // extended form
    if body.len() == 1 {
        // single 00: short-form "all available"
        return Ok((Vec::new(), 256));
    }
    if body.len() == 3 {
        let le = u16::from_be_bytes([body[1], body[2]]) as usize;
        if le <= 256 {
            // would have been encoded in the short form
            return bad;
        }
        return Ok((Vec::new(), le));
    }
    if body.len() < 3 {
        return bad;
    }
    let lc = u16::from_be_bytes([body[1], body[2]]) as usize;
    if lc == 0 {
        return bad;
    }
    if body.len() == 3 + lc {
        return Ok((body[3..].to_vec(), 0));
    }
    if body.len() == 3 + lc + 2 {
        let le = u16::from_be_bytes([body[3 + lc], body[3 + lc + 1]]) as usize;
        if le == 0 {
            return bad;
        }
        return Ok((body[3..3 + lc].to_vec(), le));
    }
    bad
}

impl Response {
    /// Validates the field bounds.
    pub fn check(&self) -> Result<()> {
        if self.rdf.len() > RDF_MAX {
            return Err(Error::BadInput {
                context: "response data field longer than 257 octets",
            });
        }
        Ok(())
    }

    /// Exact unprotected frame length, without encoding.
    pub fn encoded_len(&self) -> Result<usize> {
        self.check()?;
        Ok(self.rdf.len() + 2)
    }

    /// Encodes the unprotected frame: data field, then the status word.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.check()?;
        let mut out = Vec::with_capacity(self.rdf.len() + 2);
        out.extend_from_slice(&self.rdf);
        out.extend_from_slice(&[self.sw1, self.sw2]);
        Ok(out)
    }

    /// Decodes an unprotected frame.
    pub fn decode(buf: &[u8]) -> Result<Response> {
        if buf.len() < 2 {
            return Err(Error::BadFormat {
                context: "response frame shorter than the status word",
            });
        }
        if buf.len() - 2 > RDF_MAX {
            return Err(Error::BadFormat {
                context: "response data field longer than 257 octets",
            });
        }
        Ok(Response {
            sw1: buf[buf.len() - 2],
            sw2: buf[buf.len() - 1],
            rdf: buf[..buf.len() - 2].to_vec(),
        })
    }
}
