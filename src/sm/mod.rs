//! Secure messaging for APDU exchanges
//!
//! A shared 32-octet session key (normally the output of the key
//! establishment protocol) drives two block ciphers: one for the CTR
//! keystream that encrypts data fields, one for the CMAC that
//! authenticates every protected frame. Both sides keep a frame counter
//! that they advance in lock step with explicit [`SmState::ctr_inc`]
//! calls; a desynchronized counter makes verification fail.
//!
//! Protected command frames look like
//! `cla|0x04 ins p1 p2 Lc' [DO87] [DO97] DO8E Le'` and protected
//! responses like `[DO87] DO8E sw1 sw2`, where DO87 carries the
//! encrypted data field, DO97 the expected response length and DO8E an
//! 8-octet CMAC over everything before it. Frames are authenticated
//! before any decryption happens.

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::apdu::{Command, Response};
use crate::crypto::{cmac, Prp};
use crate::error::{Error, Result};

#[cfg(test)]
mod tests;

const BLOCK: usize = 16;
const TAG_LEN: usize = 8;
/// `8E 08` plus the truncated CMAC.
const DO8E_LEN: usize = 2 + TAG_LEN;

/// Secure-messaging session state for one side of the channel.
pub struct SmState<C: Prp> {
    enc: C,
    mac: C,
    ctr: u64,
}

impl<C: Prp> SmState<C> {
    /// Builds a session from a 32-octet key.
    ///
    /// The first half keys the encryption cipher directly; the MAC key is
    /// derived from the encryption cipher so that the two ciphers never
    /// share a key schedule.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != 32 {
            return Err(Error::BadInput {
                context: "secure-messaging key must be 32 octets",
            });
        }
        let enc = C::new(key)?;
        let mut mac_key = Zeroizing::new([0u8; 32]);
        for (i, block) in mac_key.chunks_exact_mut(BLOCK).enumerate() {
            // inputs disjoint from the CTR keystream domain
            let mut b = [0xFF; BLOCK];
            b[BLOCK - 1] = i as u8;
            enc.encrypt_block(&mut b);
            block.copy_from_slice(&b);
        }
        let mac = C::new(&mac_key[..C::KEY_SIZE])?;
        Ok(SmState { enc, mac, ctr: 0 })
    }

    /// Advances the frame counter. Wrapping and unwrapping never advance
    /// it on their own; both sides call this between exchanges.
    pub fn ctr_inc(&mut self) {
        self.ctr = self.ctr.wrapping_add(1);
    }

    /// XORs the CTR keystream for the current counter into `data`.
    fn apply_keystream(&self, data: &mut [u8]) {
        for (j, chunk) in data.chunks_mut(BLOCK).enumerate() {
            let mut block = [0u8; BLOCK];
            block[..8].copy_from_slice(&self.ctr.to_be_bytes());
            block[8..].copy_from_slice(&(j as u64 + 1).to_be_bytes());
            self.enc.encrypt_block(&mut block);
            for (b, k) in chunk.iter_mut().zip(block.iter()) {
                *b ^= k;
            }
        }
    }

    /// Truncated CMAC over the counter and the authenticated frame parts.
    fn tag(&self, parts: &[&[u8]]) -> [u8; TAG_LEN] {
        let mut input = Vec::new();
        input.extend_from_slice(&self.ctr.to_be_bytes());
        input.extend_from_slice(&[0u8; 8]);
        for p in parts {
            input.extend_from_slice(p);
        }
        let full = cmac(&self.mac, &input);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&full[..TAG_LEN]);
        tag
    }

    /// Exact protected frame length for `cmd`, without touching the MAC.
    pub fn cmd_wrap_len(&self, cmd: &Command) -> Result<usize> {
        cmd.check()?;
        let body = cmd_body_len(cmd.cdf.len(), cmd.rdf_len);
        let (lc, le) = if body > 255 { (3, 2) } else { (1, 1) };
        Ok(4 + lc + body + le)
    }

    /// Wraps a command into a protected frame under the current counter.
    pub fn cmd_wrap(&self, cmd: &Command) -> Result<Vec<u8>> {
        cmd.check()?;
        let header = [cmd.cla | 0x04, cmd.ins, cmd.p1, cmd.p2];

        let mut do87 = Vec::new();
        if !cmd.cdf.is_empty() {
            let mut ct = cmd.cdf.clone();
            self.apply_keystream(&mut ct);
            do87.push(0x87);
            push_der_len(&mut do87, 1 + ct.len());
            do87.push(0x02);
            do87.extend_from_slice(&ct);
        }
        let mut do97 = Vec::new();
        if cmd.rdf_len > 0 {
            if cmd.rdf_len <= 256 {
                do97.extend_from_slice(&[0x97, 0x01, cmd.rdf_len as u8]);
            } else {
                do97.push(0x97);
                do97.push(0x02);
                do97.extend_from_slice(&(cmd.rdf_len as u16).to_be_bytes());
            }
        }
        let tag = self.tag(&[&header, &do87, &do97]);

        let body = do87.len() + do97.len() + DO8E_LEN;
        let mut out = Vec::with_capacity(4 + 3 + body + 2);
        out.extend_from_slice(&header);
        if body > 255 {
            out.push(0);
            out.extend_from_slice(&(body as u16).to_be_bytes());
        } else {
            out.push(body as u8);
        }
        out.extend_from_slice(&do87);
        out.extend_from_slice(&do97);
        out.extend_from_slice(&[0x8E, TAG_LEN as u8]);
        out.extend_from_slice(&tag);
        if body > 255 {
            out.extend_from_slice(&[0, 0]);
        } else {
            out.push(0);
        }
        Ok(out)
    }

    /// Authenticates and unwraps a protected command frame.
    pub fn cmd_unwrap(&self, frame: &[u8]) -> Result<Command> {
        if frame.len() < 4 + 1 + DO8E_LEN + 1 {
            return Err(Error::BadFormat {
                context: "protected command frame too short",
            });
        }
        if frame[0] & 0x04 == 0 {
            return Err(Error::BadFormat {
                context: "command frame not marked as protected",
            });
        }
        let header = &frame[..4];
        let rest = &frame[4..];
        let (body, after) = if rest[0] != 0 {
            let lc = rest[0] as usize;
            if rest.len() < 1 + lc {
                return Err(Error::BadFormat {
                    context: "protected command body truncated",
                });
            }
            (&rest[1..1 + lc], &rest[1 + lc..])
        } else {
            if rest.len() < 3 {
                return Err(Error::BadFormat {
                    context: "protected command body truncated",
                });
            }
            let lc = u16::from_be_bytes([rest[1], rest[2]]) as usize;
            if lc <= 255 || rest.len() < 3 + lc {
                return Err(Error::BadFormat {
                    context: "protected command body truncated",
                });
            }
            (&rest[3..3 + lc], &rest[3 + lc..])
        };
        let extended = body.len() > 255;
        if after != if extended { &[0, 0][..] } else { &[0][..] } {
            return Err(Error::BadFormat {
                context: "protected command trailer",
            });
        }

        let (do87, body) = split_do87(body)?;
        let (do97, body) = split_do97(body)?;
        let tag = split_do8e(body)?;
        let expected = self.tag(&[header, do87, do97]);
        if expected.ct_eq(tag).unwrap_u8() == 0 {
            return Err(Error::BadSig {
                context: "protected command authentication tag",
            });
        }

        let mut cdf = do87_plaintext(do87);
        self.apply_keystream(&mut cdf);
        let rdf_len = match do97.len() {
            0 => 0,
            3 => {
                if do97[2] == 0 {
                    256
                } else {
                    do97[2] as usize
                }
            }
            4 => u16::from_be_bytes([do97[2], do97[3]]) as usize,
            _ => unreachable!(),
        };
        let cmd = Command {
            cla: frame[0] & !0x04,
            ins: frame[1],
            p1: frame[2],
            p2: frame[3],
            cdf,
            rdf_len,
        };
        cmd.check().map_err(|_| Error::BadFormat {
            context: "protected command field bounds",
        })?;
        Ok(cmd)
    }

    /// Exact protected frame length for `resp`, without touching the MAC.
    pub fn resp_wrap_len(&self, resp: &Response) -> Result<usize> {
        resp.check()?;
        Ok(do87_len(resp.rdf.len()) + DO8E_LEN + 2)
    }

    /// Wraps a response into a protected frame under the current counter.
    pub fn resp_wrap(&self, resp: &Response) -> Result<Vec<u8>> {
        resp.check()?;
        let mut do87 = Vec::new();
        if !resp.rdf.is_empty() {
            let mut ct = resp.rdf.clone();
            self.apply_keystream(&mut ct);
            do87.push(0x87);
            push_der_len(&mut do87, 1 + ct.len());
            do87.push(0x02);
            do87.extend_from_slice(&ct);
        }
        let tag = self.tag(&[&do87, &[resp.sw1, resp.sw2]]);

        let mut out = Vec::with_capacity(do87.len() + DO8E_LEN + 2);
        out.extend_from_slice(&do87);
        out.extend_from_slice(&[0x8E, TAG_LEN as u8]);
        out.extend_from_slice(&tag);
        out.extend_from_slice(&[resp.sw1, resp.sw2]);
        Ok(out)
    }

    /// Authenticates and unwraps a protected response frame.
    pub fn resp_unwrap(&self, frame: &[u8]) -> Result<Response> {
        if frame.len() < DO8E_LEN + 2 {
            return Err(Error::BadFormat {
                context: "protected response frame too short",
            });
        }
        let sw = &frame[frame.len() - 2..];
        let body = &frame[..frame.len() - 2];
        let (do87, body) = split_do87(body)?;
        let tag = split_do8e(body)?;
        let expected = self.tag(&[do87, sw]);
        if expected.ct_eq(tag).unwrap_u8() == 0 {
            return Err(Error::BadSig {
                context: "protected response authentication tag",
            });
        }
        let mut rdf = do87_plaintext(do87);
        self.apply_keystream(&mut rdf);
        let resp = Response {
            sw1: sw[0],
            sw2: sw[1],
            rdf,
        };
        resp.check().map_err(|_| Error::BadFormat {
            context: "protected response field bounds",
        })?;
        Ok(resp)
    }
}

/// Wraps a command, protected when a session is present.
pub fn cmd_wrap<C: Prp>(cmd: &Command, state: Option<&SmState<C>>) -> Result<Vec<u8>> {
    match state {
        Some(sm) => sm.cmd_wrap(cmd),
        None => cmd.encode(),
    }
}

/// Unwraps a command, protected when a session is present.
pub fn cmd_unwrap<C: Prp>(frame: &[u8], state: Option<&SmState<C>>) -> Result<Command> {
    match state {
        Some(sm) => sm.cmd_unwrap(frame),
        None => Command::decode(frame),
    }
}

/// Wraps a response, protected when a session is present.
pub fn resp_wrap<C: Prp>(resp: &Response, state: Option<&SmState<C>>) -> Result<Vec<u8>> {
    match state {
        Some(sm) => sm.resp_wrap(resp),
        None => resp.encode(),
    }
}

/// Unwraps a response, protected when a session is present.
pub fn resp_unwrap<C: Prp>(frame: &[u8], state: Option<&SmState<C>>) -> Result<Response> {
    match state {
        Some(sm) => sm.resp_unwrap(frame),
        None => Response::decode(frame),
    }
}

fn der_len_len(content: usize) -> usize {
    match content {
        0..=0x7F => 1,
        0x80..=0xFF => 2,
        _ => 3,
    }
}

fn push_der_len(out: &mut Vec<u8>, content: usize) {
    match content {
        0..=0x7F => out.push(content as u8),
        0x80..=0xFF => out.extend_from_slice(&[0x81, content as u8]),
        _ => {
            out.push(0x82);
            out.extend_from_slice(&(content as u16).to_be_bytes());
        }
    }
}

fn do87_len(data_len: usize) -> usize {
    if data_len == 0 {
        0
    } else {
        1 + der_len_len(1 + data_len) + 1 + data_len
    }
}

fn cmd_body_len(cdf_len: usize, rdf_len: usize) -> usize {
    let do97 = match rdf_len {
        0 => 0,
        1..=256 => 3,
        _ => 4,
    };
    do87_len(cdf_len) + do97 + DO8E_LEN
}

/// Splits a leading DO87 off `body`, returning it whole (tag and length
/// octets included) plus the remainder. Absent DO87 yields an empty slice.
fn split_do87(body: &[u8]) -> Result<(&[u8], &[u8])> {
    let bad = Err(Error::BadFormat {
        context: "DO87 structure",
    });
    if body.first() != Some(&0x87) {
        return Ok((&body[..0], body));
    }
    if body.len() < 2 {
        return bad;
    }
    let (content, hdr) = match body[1] {
        n @ 0..=0x7F => (n as usize, 2),
        0x81 => {
            if body.len() < 3 || body[2] < 0x80 {
                return bad;
            }
            (body[2] as usize, 3)
        }
        0x82 => {
            if body.len() < 4 {
                return bad;
            }
            let n = u16::from_be_bytes([body[2], body[3]]) as usize;
            if n <= 0xFF {
                return bad;
            }
            (n, 4)
        }
        _ => return bad,
    };
    if content < 2 || body.len() < hdr + content || body[hdr] != 0x02 {
        return bad;
    }
    Ok((&body[..hdr + content], &body[hdr + content..]))
}

/// The ciphertext carried by a DO87 produced by [`split_do87`].
fn do87_plaintext(do87: &[u8]) -> Vec<u8> {
    if do87.is_empty() {
        return Vec::new();
    }
    let hdr = match do87[1] {
        0..=0x7F => 2,
        0x81 => 3,
        _ => 4,
    };
    do87[hdr + 1..].to_vec()
}

/// Splits a leading DO97 off `body`.
fn split_do97(body: &[u8]) -> Result<(&[u8], &[u8])> {
    let bad = Err(Error::BadFormat {
        context: "DO97 structure",
    });
    if body.first() != Some(&0x97) {
        return Ok((&body[..0], body));
    }
    match body.get(1) {
        Some(&0x01) if body.len() >= 3 => Ok((&body[..3], &body[3..])),
        Some(&0x02) if body.len() >= 4 => {
            let le = u16::from_be_bytes([body[2], body[3]]) as usize;
            // 1..=256 belongs in the one-octet form
            if le <= 256 {
                return bad;
            }
            Ok((&body[..4], &body[4..]))
        }
        _ => bad,
    }
}

/// Requires `body` to be exactly a DO8E and returns its tag.
fn split_do8e(body: &[u8]) -> Result<&[u8]> {
    if body.len() != DO8E_LEN || body[0] != 0x8E || body[1] != TAG_LEN as u8 {
        return Err(Error::BadFormat {
            context: "DO8E structure",
        });
    }
    Ok(&body[2..])
}
