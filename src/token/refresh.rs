//! Opaque refresh tokens: the `{identity_id, role, slot}` triple encrypted
//! with AES-256-CBC (PKCS#7 padding) under a fixed key/IV, then base64'd.
//!
//! The token carries no expiry and no integrity tag of its own. It is never
//! trusted standalone: the manager only uses it to look up a live session
//! and cross-checks that session's id against the access token presented
//! alongside it. JSON is the field encoding, so field values may contain any
//! characters without ambiguity.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretSlice};
use serde::{Deserialize, Serialize};

use crate::error::Error;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const ENCRYPTION_KEY_LEN: usize = 32;
pub const ENCRYPTION_IV_LEN: usize = 16;

/// Payload of a refresh token. Only a lookup hint — see module docs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    pub identity_id: String,
    pub role: String,
    pub slot: String,
}

/// AES-256-CBC encoder/decoder over a fixed key and IV.
pub struct RefreshTokenCodec {
    key: SecretSlice<u8>,
    iv: Vec<u8>,
}

impl RefreshTokenCodec {
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] unless the key is 32 bytes and
    /// the IV 16.
    pub fn new(key: SecretSlice<u8>, iv: Vec<u8>) -> Result<Self, Error> {
        if key.expose_secret().len() != ENCRYPTION_KEY_LEN || iv.len() != ENCRYPTION_IV_LEN {
            return Err(Error::InvalidKeyLength);
        }
        Ok(Self { key, iv })
    }

    /// Encrypt the triple into an opaque string. Deterministic for a fixed
    /// payload, so a slot-stable session keeps the same refresh token
    /// across rotations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenMalformed`] if the payload cannot be encoded.
    pub fn encode(&self, claims: &RefreshClaims) -> Result<String, Error> {
        let plaintext = serde_json::to_vec(claims).map_err(|_| Error::TokenMalformed)?;
        let cipher = Aes256CbcEnc::new_from_slices(self.key.expose_secret(), &self.iv)
            .map_err(|_| Error::InvalidKeyLength)?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(&plaintext);
        Ok(Base64::encode_string(&ciphertext))
    }

    /// Decrypt an opaque string back into the triple.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenMalformed`] for bad base64, bad padding, or an
    /// undecodable payload — an attacker-supplied value cannot be
    /// distinguished from corruption, so all failures collapse to one kind.
    pub fn decode(&self, opaque: &str) -> Result<RefreshClaims, Error> {
        let ciphertext = Base64::decode_vec(opaque).map_err(|_| Error::TokenMalformed)?;
        if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
            return Err(Error::TokenMalformed);
        }
        let cipher = Aes256CbcDec::new_from_slices(self.key.expose_secret(), &self.iv)
            .map_err(|_| Error::InvalidKeyLength)?;
        let plaintext = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| Error::TokenMalformed)?;
        serde_json::from_slice(&plaintext).map_err(|_| Error::TokenMalformed)
    }
}
