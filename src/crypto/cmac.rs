//! CMAC over any [`Prp`] (RFC 4493 subkey schedule)
//!
//! Used with an 8-octet truncation as the secure-messaging authentication
//! tag and untruncated inside the BAUTH key derivation. Generic over the
//! cipher so the whole protocol stack stays parameterized by one seam.

use super::Prp;

/// Doubling in GF(2^128) with the x^128 + x^7 + x^2 + x + 1 reduction.
fn dbl(block: &[u8; 16]) -> [u8; 16] {
    let mut out = [0u8; 16];
    let mut carry = 0u8;
    for i in (0..16).rev() {
        out[i] = (block[i] << 1) | carry;
        carry = block[i] >> 7;
    }
    if carry == 1 {
        out[15] ^= 0x87;
    }
    out
}

fn xor_into(acc: &mut [u8; 16], block: &[u8]) {
    for (a, b) in acc.iter_mut().zip(block.iter()) {
        *a ^= *b;
    }
}

/// Computes the 16-octet CMAC of `data` under `cipher`.
pub fn cmac<C: Prp>(cipher: &C, data: &[u8]) -> [u8; 16] {
    let mut l = [0u8; 16];
    cipher.encrypt_block(&mut l);
    let k1 = dbl(&l);
    let k2 = dbl(&k1);

    let mut x = [0u8; 16];
    if data.is_empty() {
        // empty message: one padded block under K2
        let mut last = [0u8; 16];
        last[0] = 0x80;
        xor_into(&mut x, &last);
        xor_into(&mut x, &k2);
        cipher.encrypt_block(&mut x);
        return x;
    }

    let full_blocks = (data.len() - 1) / 16;
    for block in data.chunks(16).take(full_blocks) {
        xor_into(&mut x, block);
        cipher.encrypt_block(&mut x);
    }

    let tail = &data[full_blocks * 16..];
    if tail.len() == 16 {
        xor_into(&mut x, tail);
        xor_into(&mut x, &k1);
    } else {
        let mut last = [0u8; 16];
        last[..tail.len()].copy_from_slice(tail);
        last[tail.len()] = 0x80;
        xor_into(&mut x, &last);
        xor_into(&mut x, &k2);
    }
    cipher.encrypt_block(&mut x);
    x
}
