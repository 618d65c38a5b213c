//! A crypter wrapper that remembers `ciphertext -> plaintext`.

use crate::crypter::{CryptoError, Decrypter, Encrypter};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Wraps a crypter and caches every `ciphertext -> plaintext` pair it sees.
///
/// - Decrypts are served from the cache when possible. `batch_decrypt` sends
///   only the misses to the inner crypter, in a single call.
/// - Encrypts always go to the inner crypter and are never answered from the
///   cache. Freshness is inherited from the inner crypter, not enforced here:
///   a randomized inner crypter gives two equal plaintexts unlinkable
///   ciphertexts, a deterministic one (such as [`Base64Crypter`]) gives them
///   the same ciphertext.
///
/// The cache is shared behind a [`Mutex`], so one instance can serve several
/// threads.
///
/// [`Base64Crypter`]: crate::Base64Crypter
#[derive(Debug)]
pub struct CachingCrypter<C> {
    inner: C,
    plaintexts: Mutex<HashMap<String, String>>,
}

impl<C> CachingCrypter<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            plaintexts: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Number of cached ciphertexts.
    pub fn len(&self) -> usize {
        self.cache().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache().is_empty()
    }

    /// The cached plaintext for `ciphertext`, if any.
    pub fn cached_plaintext(&self, ciphertext: &str) -> Option<String> {
        self.cache().get(ciphertext).cloned()
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // The map stays consistent even if a holder panicked mid-insert.
        self.plaintexts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record<'a>(&self, pairs: impl IntoIterator<Item = (&'a String, &'a String)>) {
        let mut cache = self.cache();
        for (ciphertext, plaintext) in pairs {
            cache.insert(ciphertext.clone(), plaintext.clone());
        }
    }
}

impl<C: Encrypter> Encrypter for CachingCrypter<C> {
    fn encrypt_value(&self, plaintext: &str) -> Result<String, CryptoError> {
        let ciphertext = self.inner.encrypt_value(plaintext)?;
        self.cache().insert(ciphertext.clone(), plaintext.to_string());
        Ok(ciphertext)
    }

    fn batch_encrypt(&self, plaintexts: &[String]) -> Result<Vec<String>, CryptoError> {
        let ciphertexts = self.inner.batch_encrypt(plaintexts)?;
        self.record(ciphertexts.iter().zip(plaintexts));
        Ok(ciphertexts)
    }
}

impl<C: Decrypter> Decrypter for CachingCrypter<C> {
    fn decrypt_value(&self, ciphertext: &str) -> Result<String, CryptoError> {
        if let Some(plaintext) = self.cached_plaintext(ciphertext) {
            return Ok(plaintext);
        }
        let plaintext = self.inner.decrypt_value(ciphertext)?;
        self.cache().insert(ciphertext.to_string(), plaintext.clone());
        Ok(plaintext)
    }

    fn batch_decrypt(&self, ciphertexts: &[String]) -> Result<Vec<String>, CryptoError> {
        let mut results: Vec<Option<String>> = Vec::with_capacity(ciphertexts.len());
        let mut misses: Vec<String> = Vec::new();
        {
            let cache = self.cache();
            for ciphertext in ciphertexts {
                let hit = cache.get(ciphertext).cloned();
                if hit.is_none() {
                    misses.push(ciphertext.clone());
                }
                results.push(hit);
            }
        }
        trace!(
            hits = ciphertexts.len() - misses.len(),
            misses = misses.len(),
            "caching crypter batch decrypt"
        );

        if misses.is_empty() {
            return Ok(results.into_iter().flatten().collect());
        }

        let decrypted = self.inner.batch_decrypt(&misses)?;
        if decrypted.len() != misses.len() {
            return Err(CryptoError::Provider(format!(
                "batch decrypt returned {} values for {} inputs",
                decrypted.len(),
                misses.len()
            )));
        }
        self.record(misses.iter().zip(&decrypted));

        let mut fresh = decrypted.into_iter();
        Ok(results
            .into_iter()
            .map(|hit| hit.or_else(|| fresh.next()).unwrap_or_default())
            .collect())
    }
}
