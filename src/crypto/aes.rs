//! AES-256 provider for the [`Prp`] seam

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};

use super::Prp;
use crate::error::{Error, Result};

/// AES-256 keyed pseudorandom permutation.
pub struct Aes256(aes::Aes256);

impl Prp for Aes256 {
    const KEY_SIZE: usize = 32;

    fn new(key: &[u8]) -> Result<Self> {
        aes::Aes256::new_from_slice(key)
            .map(Aes256)
            .map_err(|_| Error::BadInput {
                context: "AES-256 key must be 32 octets",
            })
    }

    fn encrypt_block(&self, block: &mut [u8; 16]) {
        self.0
            .encrypt_block(GenericArray::from_mut_slice(block.as_mut_slice()));
    }
}
