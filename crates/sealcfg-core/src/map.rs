//! A configuration map: namespaced keys, each holding one encrypted tree.

use crate::batch::Batcher;
use crate::crypter::{Decrypter, Encrypter};
use crate::error::{Result, SealError};
use crate::path::PropertyPath;
use crate::tree::{EncryptedTree, PlaintextTree, Tree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A configuration key, `namespace:name`.
///
/// Keys order by namespace, then name.
///
/// # Examples
///
/// ```
/// use sealcfg_core::Key;
///
/// let key: Key = "app:db".parse().unwrap();
/// assert_eq!(key.namespace(), "app");
/// assert_eq!(key.name(), "db");
///
/// // The legacy three-part spelling is accepted and normalized.
/// assert_eq!("app:config:db".parse::<Key>().unwrap(), key);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key {
    namespace: String,
    name: String,
}

impl Key {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `namespace:name`, or the legacy `namespace:config:name`.
    pub fn parse(input: &str) -> Result<Self> {
        let parts: Vec<&str> = input.split(':').collect();
        let (namespace, name) = match parts.as_slice() {
            [namespace, name] => (*namespace, *name),
            [namespace, "config", name] => (*namespace, *name),
            _ => {
                return Err(SealError::InvalidKey {
                    input: input.to_string(),
                })
            }
        };
        if namespace.is_empty() || name.is_empty() {
            return Err(SealError::InvalidKey {
                input: input.to_string(),
            });
        }
        Ok(Self::new(namespace, name))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

impl FromStr for Key {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self> {
        Key::parse(s)
    }
}

impl TryFrom<String> for Key {
    type Error = SealError;

    fn try_from(value: String) -> Result<Self> {
        Key::parse(&value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

/// Configuration entries at rest: every secure leaf holds ciphertext.
///
/// Serializes as a plain JSON/YAML mapping from key to value, with secure
/// leaves wrapped as `{"secure": "<ciphertext>"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap {
    entries: BTreeMap<Key, EncryptedTree>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, Key, EncryptedTree> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &BTreeMap<Key, EncryptedTree> {
        &self.entries
    }

    /// Replace the whole value stored under `key`.
    pub fn insert(&mut self, key: Key, value: EncryptedTree) -> Option<EncryptedTree> {
        self.entries.insert(key, value)
    }

    /// The subtree at `path` within the value under `key`.
    pub fn get(&self, key: &Key, path: &PropertyPath) -> Option<&EncryptedTree> {
        self.entries.get(key)?.get(path)
    }

    /// Write `value` at `path` within the value under `key`, creating the
    /// entry if needed. An empty path replaces the entry.
    pub fn set(&mut self, key: Key, path: &PropertyPath, value: EncryptedTree) -> Result<()> {
        let current = self.entries.get(&key).cloned().unwrap_or_default();
        let updated = current.set(path, value)?;
        debug!(key = %key, path = %path, "set config value");
        self.entries.insert(key, updated);
        Ok(())
    }

    /// Remove `path` from the value under `key`. An empty path removes the
    /// entry itself. Missing keys and paths are a no-op.
    pub fn remove(&mut self, key: &Key, path: &PropertyPath) -> Result<()> {
        if path.is_empty() {
            if self.entries.remove(key).is_some() {
                debug!(key = %key, "removed config entry");
            }
            return Ok(());
        }
        let Some(current) = self.entries.get_mut(key) else {
            return Ok(());
        };
        *current = current.delete(path)?;
        debug!(key = %key, path = %path, "removed config value");
        Ok(())
    }

    /// Decrypt every entry in one batched pass across the whole map.
    pub fn decrypt(
        &self,
        decrypter: &dyn Decrypter,
        batcher: &Batcher,
    ) -> Result<BTreeMap<Key, PlaintextTree>> {
        batcher.decrypt_all(&self.entries, decrypter)
    }

    /// Encrypt plaintext entries in one batched pass.
    pub fn encrypt(
        plaintext: &BTreeMap<Key, PlaintextTree>,
        encrypter: &dyn Encrypter,
        batcher: &Batcher,
    ) -> Result<Self> {
        Ok(Self {
            entries: batcher.encrypt_all(plaintext, encrypter)?,
        })
    }

    /// Decrypt the single value at `key`/`path` leaf by leaf.
    ///
    /// Errors name the full path of the leaf that failed. Returns `Ok(None)`
    /// when nothing is stored there.
    pub fn decrypt_value(
        &self,
        key: &Key,
        path: &PropertyPath,
        decrypter: &dyn Decrypter,
    ) -> Result<Option<PlaintextTree>> {
        let Some(value) = self.get(key, path) else {
            return Ok(None);
        };
        value
            .decrypt(decrypter)
            .map(Some)
            .map_err(|err| match err {
                SealError::CryptoAt { path: inner, source } => SealError::CryptoAt {
                    path: path.iter().chain(inner.iter()).cloned().collect(),
                    source,
                },
                other => other,
            })
    }

    /// True if any entry holds a secure leaf.
    pub fn has_secure_value(&self) -> bool {
        self.entries.values().any(Tree::is_secure)
    }

    /// Keys whose values hold at least one secure leaf.
    pub fn secure_keys(&self) -> Vec<&Key> {
        self.entries
            .iter()
            .filter(|(_, value)| value.is_secure())
            .map(|(key, _)| key)
            .collect()
    }

    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_yaml(input: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl FromIterator<(Key, EncryptedTree)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (Key, EncryptedTree)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ConfigMap {
    type Item = (&'a Key, &'a EncryptedTree);
    type IntoIter = std::collections::btree_map::Iter<'a, Key, EncryptedTree>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
