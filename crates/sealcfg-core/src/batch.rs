//! Batched encryption and decryption across whole trees and forests.
//!
//! Sending one request per secret is too slow against a remote crypter. A
//! batched pass instead:
//!
//! 1. **Collects** every secure leaf in one pre-order walk. It records a
//!    [`Slot`] (entry index + property path) and the leaf's payload, in visit
//!    order.
//! 2. **Chunks** the payloads into contiguous groups whose combined UTF-8 size
//!    stays within [`BatchConfig::chunk_size_bytes`]. A value is appended to
//!    the current chunk if it fits, otherwise it seeds a new one. A single
//!    oversized value ships alone rather than being split or dropped.
//! 3. **Dispatches** each chunk to the crypter's batch operation, in order.
//!    The first failure aborts the pass.
//! 4. **Splices** each result into the output tree at the location its slot
//!    recorded.
//!
//! The output skeleton is a structural copy of the input in the target form.
//! Slots are resolved against that fresh tree, so nothing aliases the input.

use crate::crypter::{CryptoError, Decrypter, Encrypter};
use crate::error::{Result, SealError};
use crate::path::PropertyPath;
use crate::tree::{EncryptedTree, Form, PlaintextTree, Tree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// Default upper bound on the bytes of secret payload per batch request:
/// half of a 200 MiB remote request cap.
pub const DEFAULT_CHUNK_SIZE_BYTES: usize = 100 * 1024 * 1024;

/// Tuning for batched passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum combined byte length of the values in one batch request.
    /// Only enforced when growing a chunk: one value larger than this is
    /// still sent, alone.
    pub chunk_size_bytes: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
        }
    }
}

/// Where a collected secret lives: the index of its tree within the pass and
/// the property path inside that tree. Valid only for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub entry: usize,
    pub path: PropertyPath,
}

/// Every secure leaf of `trees`, in pre-order, with the slot it came from.
pub fn collect_secrets<F: Form>(trees: &[&Tree<F>]) -> (Vec<Slot>, Vec<String>) {
    let mut slots = Vec::new();
    let mut pending = Vec::new();
    for (entry, tree) in trees.iter().enumerate() {
        collect_into(tree, entry, &mut PropertyPath::new(), &mut slots, &mut pending);
    }
    (slots, pending)
}

fn collect_into<F: Form>(
    tree: &Tree<F>,
    entry: usize,
    path: &mut PropertyPath,
    slots: &mut Vec<Slot>,
    pending: &mut Vec<String>,
) {
    match tree {
        Tree::String(text) if text.is_secure() => {
            slots.push(Slot {
                entry,
                path: path.clone(),
            });
            pending.push(text.value().to_string());
        }
        Tree::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(i);
                collect_into(item, entry, path, slots, pending);
                path.pop();
            }
        }
        Tree::Object(object) => {
            for (key, value) in object.iter() {
                path.push(key.as_str());
                collect_into(value, entry, path, slots, pending);
                path.pop();
            }
        }
        Tree::Null | Tree::Bool(_) | Tree::Int(_) | Tree::Float(_) | Tree::String(_) => {}
    }
}

/// Partition `values` into contiguous chunks bounded by `chunk_size_bytes`.
///
/// A value joins the current chunk if `current + len <= chunk_size_bytes`.
/// Otherwise it seeds a new chunk, even if it alone exceeds the bound. No
/// chunk is ever empty, and concatenating the chunks yields `values` exactly.
///
/// # Examples
///
/// ```
/// use sealcfg_core::chunk_by_size;
///
/// let values = ["12345".to_string(), "678901".to_string()];
/// let chunks = chunk_by_size(&values, 10);
/// assert_eq!(chunks, vec![&values[..1], &values[1..]]);
/// ```
pub fn chunk_by_size<S: AsRef<str>>(values: &[S], chunk_size_bytes: usize) -> Vec<&[S]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut current = 0usize;
    for (i, value) in values.iter().enumerate() {
        let len = value.as_ref().len();
        if i > start && current.saturating_add(len) > chunk_size_bytes {
            chunks.push(&values[start..i]);
            start = i;
            current = 0;
        }
        current = current.saturating_add(len);
    }
    if start < values.len() {
        chunks.push(&values[start..]);
    }
    chunks
}

/// Runs batched passes with a fixed [`BatchConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Batcher {
    config: BatchConfig,
}

impl Batcher {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn with_chunk_size(chunk_size_bytes: usize) -> Self {
        Self::new(BatchConfig { chunk_size_bytes })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Encrypt every secure leaf of `tree` through `encrypter.batch_encrypt`.
    pub fn encrypt(
        &self,
        tree: &PlaintextTree,
        encrypter: &dyn Encrypter,
    ) -> Result<EncryptedTree> {
        let mut out: Vec<EncryptedTree> =
            self.transform(&[tree], "encrypt", |chunk| encrypter.batch_encrypt(chunk))?;
        Ok(out.pop().unwrap_or_default())
    }

    /// Decrypt every secure leaf of `tree` through `decrypter.batch_decrypt`.
    pub fn decrypt(
        &self,
        tree: &EncryptedTree,
        decrypter: &dyn Decrypter,
    ) -> Result<PlaintextTree> {
        let mut out: Vec<PlaintextTree> =
            self.transform(&[tree], "decrypt", |chunk| decrypter.batch_decrypt(chunk))?;
        Ok(out.pop().unwrap_or_default())
    }

    /// Encrypt a whole map of trees as one forest.
    ///
    /// Secrets from every entry share the same chunks, which minimizes the
    /// number of crypter round-trips.
    pub fn encrypt_all<K: Ord + Clone>(
        &self,
        entries: &BTreeMap<K, PlaintextTree>,
        encrypter: &dyn Encrypter,
    ) -> Result<BTreeMap<K, EncryptedTree>> {
        let trees: Vec<&PlaintextTree> = entries.values().collect();
        let out = self.transform(&trees, "encrypt", |chunk| encrypter.batch_encrypt(chunk))?;
        Ok(entries.keys().cloned().zip(out).collect())
    }

    /// Decrypt a whole map of trees as one forest.
    pub fn decrypt_all<K: Ord + Clone>(
        &self,
        entries: &BTreeMap<K, EncryptedTree>,
        decrypter: &dyn Decrypter,
    ) -> Result<BTreeMap<K, PlaintextTree>> {
        let trees: Vec<&EncryptedTree> = entries.values().collect();
        let out = self.transform(&trees, "decrypt", |chunk| decrypter.batch_decrypt(chunk))?;
        Ok(entries.keys().cloned().zip(out).collect())
    }

    /// Collect, chunk, dispatch and splice. Returns one output tree per input.
    fn transform<F, G>(
        &self,
        trees: &[&Tree<F>],
        op: &'static str,
        batch_op: impl Fn(&[String]) -> std::result::Result<Vec<String>, CryptoError>,
    ) -> Result<Vec<Tree<G>>>
    where
        F: Form,
        G: Form,
    {
        let (slots, pending) = collect_secrets(trees);
        let chunks = chunk_by_size(&pending, self.config.chunk_size_bytes);
        debug!(
            op,
            from = F::NAME,
            entries = trees.len(),
            secrets = pending.len(),
            chunks = chunks.len(),
            chunk_size_bytes = self.config.chunk_size_bytes,
            "dispatching secret batches"
        );

        let mut results = Vec::with_capacity(pending.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let bytes: usize = chunk.iter().map(String::len).sum();
            trace!(op, chunk = index, values = chunk.len(), bytes, "sending batch");
            let transformed = batch_op(chunk).inspect_err(|e| {
                warn!(op, chunk = index, error = %e, "batch failed, aborting pass");
            })?;
            if transformed.len() != chunk.len() {
                return Err(SealError::BatchLength {
                    expected: chunk.len(),
                    actual: transformed.len(),
                });
            }
            results.extend(transformed);
        }

        let mut outputs: Vec<Tree<G>> = trees.iter().map(|tree| tree.reform()).collect();
        for (slot, value) in slots.iter().zip(results) {
            splice(&mut outputs[slot.entry], slot, value);
        }
        Ok(outputs)
    }
}

/// Overwrite the secure leaf addressed by `slot` with `value`.
fn splice<G: Form>(tree: &mut Tree<G>, slot: &Slot, value: String) {
    match tree.get_mut(&slot.path) {
        Some(Tree::String(text)) if text.is_secure() => text.value = value,
        _ => unreachable!(
            "slot {} of entry {} no longer addresses a secure leaf",
            slot.path, slot.entry
        ),
    }
}
