//! The crypter capability: single-value and batch encryption of opaque strings.
//!
//! Tree code never picks an implementation; callers inject one. Implementations
//! may be slow or remote. Retries, timeouts and cancellation belong to the
//! implementation, not to the tree logic.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// The token a [`BlindingCrypter`] returns in place of every secret.
pub const BLINDED_SECRET: &str = "[secret]";

/// Failures reported by a crypter implementation.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The ciphertext could not be parsed or authenticated.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// The backing provider (network service, KMS, ...) failed.
    #[error("provider error: {0}")]
    Provider(String),
}

/// Encrypts plaintext strings.
pub trait Encrypter: Send + Sync {
    fn encrypt_value(&self, plaintext: &str) -> Result<String, CryptoError>;

    /// Encrypt many values. Results correspond to inputs by position.
    ///
    /// The default calls [`encrypt_value`](Self::encrypt_value) once per item;
    /// implementations backed by a bulk API should override it.
    fn batch_encrypt(&self, plaintexts: &[String]) -> Result<Vec<String>, CryptoError> {
        plaintexts.iter().map(|p| self.encrypt_value(p)).collect()
    }
}

/// Decrypts ciphertext strings.
pub trait Decrypter: Send + Sync {
    fn decrypt_value(&self, ciphertext: &str) -> Result<String, CryptoError>;

    /// Decrypt many values. Results correspond to inputs by position.
    ///
    /// The default calls [`decrypt_value`](Self::decrypt_value) once per item.
    fn batch_decrypt(&self, ciphertexts: &[String]) -> Result<Vec<String>, CryptoError> {
        ciphertexts.iter().map(|c| self.decrypt_value(c)).collect()
    }
}

/// Both directions. Blanket-implemented for every type that has both.
pub trait Crypter: Encrypter + Decrypter {}

impl<T: Encrypter + Decrypter + ?Sized> Crypter for T {}

impl<T: Encrypter + ?Sized> Encrypter for &T {
    fn encrypt_value(&self, plaintext: &str) -> Result<String, CryptoError> {
        (**self).encrypt_value(plaintext)
    }

    fn batch_encrypt(&self, plaintexts: &[String]) -> Result<Vec<String>, CryptoError> {
        (**self).batch_encrypt(plaintexts)
    }
}

impl<T: Decrypter + ?Sized> Decrypter for &T {
    fn decrypt_value(&self, ciphertext: &str) -> Result<String, CryptoError> {
        (**self).decrypt_value(ciphertext)
    }

    fn batch_decrypt(&self, ciphertexts: &[String]) -> Result<Vec<String>, CryptoError> {
        (**self).batch_decrypt(ciphertexts)
    }
}

/// Identity crypter: ciphertext equals plaintext.
///
/// Useful for tests and for reassembling trees whose secrets were already
/// transformed elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopCrypter;

impl Encrypter for NopCrypter {
    fn encrypt_value(&self, plaintext: &str) -> Result<String, CryptoError> {
        Ok(plaintext.to_string())
    }

    fn batch_encrypt(&self, plaintexts: &[String]) -> Result<Vec<String>, CryptoError> {
        Ok(plaintexts.to_vec())
    }
}

impl Decrypter for NopCrypter {
    fn decrypt_value(&self, ciphertext: &str) -> Result<String, CryptoError> {
        Ok(ciphertext.to_string())
    }

    fn batch_decrypt(&self, ciphertexts: &[String]) -> Result<Vec<String>, CryptoError> {
        Ok(ciphertexts.to_vec())
    }
}

/// Redacting crypter: every secret becomes [`BLINDED_SECRET`] in both
/// directions, so plaintext is never exposed.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlindingCrypter;

impl Encrypter for BlindingCrypter {
    fn encrypt_value(&self, _plaintext: &str) -> Result<String, CryptoError> {
        Ok(BLINDED_SECRET.to_string())
    }
}

impl Decrypter for BlindingCrypter {
    fn decrypt_value(&self, _ciphertext: &str) -> Result<String, CryptoError> {
        Ok(BLINDED_SECRET.to_string())
    }
}

/// Fail-fast crypter for code paths that must never touch a secret.
///
/// Every call panics.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicCrypter;

impl Encrypter for PanicCrypter {
    fn encrypt_value(&self, _plaintext: &str) -> Result<String, CryptoError> {
        panic!("attempted to encrypt a value with PanicCrypter")
    }

    fn batch_encrypt(&self, _plaintexts: &[String]) -> Result<Vec<String>, CryptoError> {
        panic!("attempted to batch encrypt values with PanicCrypter")
    }
}

impl Decrypter for PanicCrypter {
    fn decrypt_value(&self, _ciphertext: &str) -> Result<String, CryptoError> {
        panic!("attempted to decrypt a value with PanicCrypter")
    }

    fn batch_decrypt(&self, _ciphertexts: &[String]) -> Result<Vec<String>, CryptoError> {
        panic!("attempted to batch decrypt values with PanicCrypter")
    }
}

/// Reversible base64 encoding. Not a security primitive: it exists so that
/// tests and local tooling have a faithful crypter whose ciphertext differs
/// from its plaintext and whose decrypt can reject malformed input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Crypter;

impl Encrypter for Base64Crypter {
    fn encrypt_value(&self, plaintext: &str) -> Result<String, CryptoError> {
        Ok(STANDARD.encode(plaintext))
    }
}

impl Decrypter for Base64Crypter {
    fn decrypt_value(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let bytes = STANDARD
            .decode(ciphertext)
            .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))
    }
}
