//! Single-value conversion between the encrypted and plaintext forms.
//!
//! Each secure leaf costs one crypter call, and failures carry the property
//! path of the leaf that failed. For documents with many secrets, prefer the
//! batched pass in [`crate::batch`], which trades path attribution for far
//! fewer round-trips.

use crate::crypter::{Decrypter, Encrypter};
use crate::error::{Result, SealError};
use crate::path::PropertyPath;
use crate::tree::{EncryptedTree, PlaintextTree, Tree};
use serde_json::{Map, Value};

impl EncryptedTree {
    /// Decrypt every secure leaf with `decrypter`, one call per leaf.
    ///
    /// # Examples
    ///
    /// ```
    /// use sealcfg_core::{EncryptedTree, NopCrypter, PlaintextTree};
    ///
    /// let encrypted = EncryptedTree::object([("token", EncryptedTree::secure_string("s3cr3t"))]).unwrap();
    /// let plain = encrypted.decrypt(&NopCrypter).unwrap();
    /// assert_eq!(plain, PlaintextTree::object([("token", PlaintextTree::secure_string("s3cr3t"))]).unwrap());
    /// ```
    pub fn decrypt(&self, decrypter: &dyn Decrypter) -> Result<PlaintextTree> {
        self.try_map_secure(&mut PropertyPath::new(), &mut |path, ciphertext| {
            decrypter
                .decrypt_value(ciphertext)
                .map_err(|source| SealError::CryptoAt {
                    path: path.clone(),
                    source,
                })
        })
    }
}

impl PlaintextTree {
    /// Encrypt every secure leaf with `encrypter`, one call per leaf.
    pub fn encrypt(&self, encrypter: &dyn Encrypter) -> Result<EncryptedTree> {
        self.try_map_secure(&mut PropertyPath::new(), &mut |path, plaintext| {
            encrypter
                .encrypt_value(plaintext)
                .map_err(|source| SealError::CryptoAt {
                    path: path.clone(),
                    source,
                })
        })
    }

    /// The cleartext of every secure leaf, in depth-first key order.
    ///
    /// Handy for building redaction lists for logs and console output.
    pub fn secure_values(&self) -> Vec<&str> {
        let mut values = Vec::new();
        collect_secure_values(self, &mut values);
        values
    }

    /// Render as plain JSON, with secure leaves as bare strings.
    ///
    /// The result no longer records which leaves were secret. Use it for
    /// display or for handing values to a consumer that does not know about
    /// secrecy, never for persisting.
    /// Non-finite floats render as `null`.
    pub fn reveal(&self) -> Value {
        match self {
            Tree::Null => Value::Null,
            Tree::Bool(b) => Value::Bool(*b),
            Tree::Int(i) => Value::from(*i),
            Tree::Float(x) => Value::from(*x),
            Tree::String(text) => Value::String(text.value().to_string()),
            Tree::Array(items) => Value::Array(items.iter().map(PlaintextTree::reveal).collect()),
            Tree::Object(object) => Value::Object(
                object
                    .iter()
                    .map(|(key, value)| (key.clone(), value.reveal()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

fn collect_secure_values<'a>(tree: &'a PlaintextTree, out: &mut Vec<&'a str>) {
    match tree {
        Tree::String(text) if text.is_secure() => out.push(text.value()),
        Tree::Array(items) => items.iter().for_each(|item| collect_secure_values(item, out)),
        Tree::Object(object) => object
            .values()
            .for_each(|value| collect_secure_values(value, out)),
        _ => {}
    }
}
