//! # sealcfg-core
//!
//! Configuration value trees with selectively encrypted **secret** leaves.
//!
//! A configuration value is a JSON/YAML-shaped tree in which individual string
//! leaves may be marked secure. Secure leaves are encrypted at rest and
//! decrypted on demand through an injected crypter, while everything else
//! stays readable. On the wire a secure leaf is written as
//! `{"secure": "<ciphertext>"}`, so that one-key shape is reserved and the
//! tree API refuses to build it as ordinary data.
//!
//! Whole documents are converted in batches: every secret in a tree (or in a
//! whole map of trees) is collected, packed into size-bounded chunks, sent
//! through the crypter's batch operation, and spliced back into place.
//!
//! ## Quick start
//!
//! ```rust
//! use sealcfg_core::{Base64Crypter, Batcher, EncryptedTree, PlaintextTree};
//!
//! let plain = PlaintextTree::from_json(r#"{"user":"admin","password":{"secure":"hunter2"}}"#).unwrap();
//!
//! let batcher = Batcher::default();
//! let encrypted = batcher.encrypt(&plain, &Base64Crypter).unwrap();
//! assert_eq!(encrypted.to_json().unwrap(), r#"{"password":{"secure":"aHVudGVyMg=="},"user":"admin"}"#);
//!
//! let stored = EncryptedTree::from_json(&encrypted.to_json().unwrap()).unwrap();
//! assert_eq!(batcher.decrypt(&stored, &Base64Crypter).unwrap(), plain);
//! ```
//!
//! ## Modules
//!
//! - [`tree`]: `Tree<F>`, its two forms, and the reserved-shape guard
//! - [`path`]: property paths such as `db.hosts[0]["dotted.key"]`
//! - [`edit`]: path-addressed get/set/delete and merge
//! - [`crypter`]: the `Encrypter`/`Decrypter` capability and stock crypters
//! - [`cache`]: `CachingCrypter`
//! - [`convert`]: single-value encrypt/decrypt with path attribution
//! - [`batch`]: collect, chunk, dispatch and splice
//! - [`wire`]: JSON/YAML encoding and the out-of-band `WireValue`
//! - [`map`]: `ConfigMap` keyed by `namespace:name`
//! - [`error`]: `SealError`

pub mod batch;
pub mod cache;
pub mod convert;
pub mod crypter;
pub mod edit;
pub mod error;
pub mod map;
pub mod path;
pub mod tree;
pub mod wire;

pub use batch::{
    chunk_by_size, collect_secrets, BatchConfig, Batcher, Slot, DEFAULT_CHUNK_SIZE_BYTES,
};
pub use cache::CachingCrypter;
pub use crypter::{
    Base64Crypter, BlindingCrypter, CryptoError, Crypter, Decrypter, Encrypter, NopCrypter,
    PanicCrypter, BLINDED_SECRET,
};
pub use error::{Result, SealError};
pub use map::{ConfigMap, Key};
pub use path::{Accessor, PropertyPath};
pub use tree::{
    Cipher, Clear, EncryptedTree, Form, Object, PlaintextTree, Text, Tree, SECURE_KEY,
};
pub use wire::WireValue;
