//! AES-128-ECB decryption of encrypted Minew frame bodies
use std::borrow::Cow;
use std::fmt;

use aes::cipher::{BlockDecrypt, KeyInit};
use aes::Aes128;
use log::debug;

use crate::error::CipherError;

/// Only bodies of exactly this length can carry an encrypted block
pub const ENCRYPTED_BODY_LEN: usize = 24;
/// Offset of the flags byte inside the body
pub const FLAGS_OFFSET: usize = 2;
/// Flag bit marking the following block as ciphertext
pub const ENCRYPTED_FLAG: u8 = 0x80;
/// Ciphertext range inside the body (one AES block)
pub const CIPHER_START: usize = 3;
pub const CIPHER_END: usize = CIPHER_START + BLOCK_LEN;

const BLOCK_LEN: usize = 16;
const AES128_KEY_LEN: usize = 16;

/// Provisioned key bytes
///
/// The length is not checked on construction: a wrong-sized key is reported
/// as a cipher fault by every advertisement that needs it, so an operator
/// sees the problem instead of the key being silently padded or truncated.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    /// Parse a hex key. Odd-length or non-hex text is rejected outright.
    pub fn from_hex(text: &str) -> Result<Self, CipherError> {
        Ok(KeyMaterial(hex::decode(text.trim())?))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        KeyMaterial(bytes.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the key has the size AES-128 needs
    pub fn is_valid_length(&self) -> bool {
        self.0.len() == AES128_KEY_LEN
    }

    fn cipher(&self) -> Result<Aes128, CipherError> {
        Aes128::new_from_slice(&self.0).map_err(|_| CipherError::InvalidKeyLength(self.0.len()))
    }
}

// Keep key bytes out of logs
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial({} bytes)", self.0.len())
    }
}

/// True when the body header marks its block as encrypted
pub fn is_encrypted(body: &[u8]) -> bool {
    body.len() == ENCRYPTED_BODY_LEN && body[FLAGS_OFFSET] & ENCRYPTED_FLAG != 0
}

/// Decrypt a single 16-byte block with AES-128-ECB
pub fn decrypt_block(
    block: &[u8; BLOCK_LEN],
    key: &KeyMaterial,
) -> Result<[u8; BLOCK_LEN], CipherError> {
    let cipher = key.cipher()?;
    let mut output = *block;
    cipher.decrypt_block((&mut output).into());
    Ok(output)
}

/// Decrypt the body's ciphertext block in place, if it has one
///
/// Bodies that are not 24 bytes long, or when no key is configured, are
/// returned unchanged. With a key configured, every 24-byte body validates
/// the key before the flag is looked at. Decrypted bytes are written back at
/// the ciphertext offsets so frame offsets stay the same.
pub fn decrypt_body<'a>(
    body: &'a [u8],
    key: Option<&KeyMaterial>,
) -> Result<Cow<'a, [u8]>, CipherError> {
    let key = match key {
        Some(key) if body.len() == ENCRYPTED_BODY_LEN => key,
        _ => return Ok(Cow::Borrowed(body)),
    };

    let cipher = key.cipher()?;

    if !is_encrypted(body) {
        return Ok(Cow::Borrowed(body));
    }

    debug!("Decrypting body block {}..{}", CIPHER_START, CIPHER_END);
    let mut owned = body.to_vec();
    cipher.decrypt_block((&mut owned[CIPHER_START..CIPHER_END]).into());
    Ok(Cow::Owned(owned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::BlockEncrypt;

    const KEY_HEX: &str = "420ec3ea6e740feb07ff4c0012020003";

    fn encrypt_block(block: &[u8; 16], key: &KeyMaterial) -> [u8; 16] {
        let cipher = key.cipher().unwrap();
        let mut output = *block;
        cipher.encrypt_block((&mut output).into());
        output
    }

    #[test]
    fn test_key_from_hex() {
        let key = KeyMaterial::from_hex(KEY_HEX).unwrap();
        assert_eq!(key.len(), 16);
        assert!(key.is_valid_length());
    }

    #[test]
    fn test_key_with_invalid_character_rejected() {
        let result = KeyMaterial::from_hex("420ec3ea6e740feb07ff4c00120200p3");
        assert!(matches!(result, Err(CipherError::InvalidKeyHex(_))));
    }

    #[test]
    fn test_odd_length_key_rejected() {
        let result = KeyMaterial::from_hex("420ec3ea6e740feb07ff4c00120200033");
        assert!(matches!(result, Err(CipherError::InvalidKeyHex(_))));
    }

    #[test]
    fn test_wrong_byte_count_not_truncated() {
        // 17 bytes of valid hex
        let key = KeyMaterial::from_hex("420ec3ea6e740feb07ff4c001202000300").unwrap();
        assert_eq!(key.len(), 17);
        assert_eq!(
            decrypt_block(&[0u8; 16], &key),
            Err(CipherError::InvalidKeyLength(17))
        );
    }

    #[test]
    fn test_known_vector() {
        // FIPS-197 appendix C.1
        let key = KeyMaterial::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        let ciphertext: [u8; 16] = hex::decode("69c4e0d86a7b0430d8cdb78070b4c55a")
            .unwrap()
            .try_into()
            .unwrap();
        let plaintext = decrypt_block(&ciphertext, &key).unwrap();
        assert_eq!(hex::encode(plaintext), "00112233445566778899aabbccddeeff");
    }

    #[test]
    fn test_encrypted_body_decrypted_in_place() {
        let key = KeyMaterial::from_hex(KEY_HEX).unwrap();
        let plain: [u8; 16] = core::array::from_fn(|i| i as u8 + 0x10);

        let mut body = vec![0xCA, 0x1B, 0x80];
        body.extend_from_slice(&encrypt_block(&plain, &key));
        body.extend_from_slice(&[0xAA; 5]);
        assert_eq!(body.len(), ENCRYPTED_BODY_LEN);

        let decrypted = decrypt_body(&body, Some(&key)).unwrap();
        assert!(matches!(decrypted, Cow::Owned(_)));
        assert_eq!(&decrypted[..3], &[0xCA, 0x1B, 0x80]);
        assert_eq!(&decrypted[CIPHER_START..CIPHER_END], &plain);
        assert_eq!(&decrypted[CIPHER_END..], &[0xAA; 5]);
    }

    #[test]
    fn test_flag_clear_is_identity() {
        let key = KeyMaterial::from_hex(KEY_HEX).unwrap();
        let body = [0x11u8; 24];
        let out = decrypt_body(&body, Some(&key)).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&*out, &body);
    }

    #[test]
    fn test_no_key_is_identity() {
        let mut body = [0u8; 24];
        body[FLAGS_OFFSET] = ENCRYPTED_FLAG;
        assert_eq!(&*decrypt_body(&body, None).unwrap(), &body);
    }

    #[test]
    fn test_other_lengths_untouched_even_with_bad_key() {
        let key = KeyMaterial::from_bytes(vec![0u8; 5]);
        let body = [0xFFu8; 16];
        assert_eq!(&*decrypt_body(&body, Some(&key)).unwrap(), &body);
    }

    #[test]
    fn test_bad_key_faults_on_24_byte_body() {
        let key = KeyMaterial::from_bytes(vec![0u8; 17]);
        let body = [0u8; 24];
        assert_eq!(
            decrypt_body(&body, Some(&key)),
            Err(CipherError::InvalidKeyLength(17))
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let key = KeyMaterial::from_hex(KEY_HEX).unwrap();
        assert_eq!(format!("{:?}", key), "KeyMaterial(16 bytes)");
    }
}
