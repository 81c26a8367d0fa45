//! Optional symmetric envelope around a frame's plaintext bytes (spec
//! §4.1, §9). Concrete construction grounded on
//! `original_source/upper_computer/basic/CryptoUtils.cpp`: a XOR-with-IV
//! placeholder that is explicitly *not* real AEAD, but whose wire shape
//! (`iv(12B) ‖ tag(16B) ‖ ciphertext`) is meant to be AEAD-shaped so a
//! real cipher (AES-GCM) can be swapped in without changing the protocol.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::AuthError;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Clone)]
pub struct Envelope {
    key: [u8; 16],
}

impl Envelope {
    /// Derives the 16-byte key as `SHA-256(password)[0..16]` (spec §6.5).
    pub fn from_password(password: &str) -> Self {
        let hash = Sha256::digest(password.as_bytes());
        let mut key = [0u8; 16];
        key.copy_from_slice(&hash[..16]);
        Self { key }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = xor_with(plaintext, &self.key, &iv);
        let tag = self.tag_for(&ciphertext);

        let mut out = Vec::with_capacity(IV_LEN + TAG_LEN + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&tag);
        out.extend_from_slice(&ciphertext);
        out
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, AuthError> {
        if data.len() < IV_LEN + TAG_LEN {
            return Err(AuthError);
        }
        let iv = &data[..IV_LEN];
        let tag = &data[IV_LEN..IV_LEN + TAG_LEN];
        let ciphertext = &data[IV_LEN + TAG_LEN..];

        let expected = self.tag_for(ciphertext);
        if tag != expected.as_slice() {
            return Err(AuthError);
        }

        Ok(xor_with(ciphertext, &self.key, iv))
    }

    fn tag_for(&self, ciphertext: &[u8]) -> [u8; TAG_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(ciphertext);
        hasher.update(self.key);
        let hash = hasher.finalize();
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&hash[..TAG_LEN]);
        tag
    }
}

fn xor_with(data: &[u8], key: &[u8; 16], iv: &[u8]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()] ^ iv[i % iv.len()])
        .collect()
}
