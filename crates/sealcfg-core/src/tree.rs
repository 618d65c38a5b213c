//! The configuration value tree.
//!
//! A [`Tree`] mirrors JSON/YAML values, but string leaves carry a `secure`
//! flag. The tree comes in two forms that share one representation and
//! differ only in what a secure leaf holds:
//!
//! - [`PlaintextTree`] (`Tree<Clear>`): secure leaves hold cleartext.
//! - [`EncryptedTree`] (`Tree<Cipher>`): secure leaves hold ciphertext.
//!
//! The form is a type parameter, so a plaintext tree can never be written
//! to disk by accident, and an encrypted tree can never be handed to code
//! that expects cleartext.
//!
//! Objects of the exact shape `{"secure": <plain string>}` are reserved: that
//! shape is how a secure leaf is encoded on the wire. [`Object`] refuses to
//! hold it, so every tree built through this API serializes unambiguously.

use crate::error::{Result, SealError};
use crate::path::{Accessor, PropertyPath};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::Debug;
use std::marker::PhantomData;

/// The object key that marks a secure leaf on the wire.
pub const SECURE_KEY: &str = "secure";

mod sealed {
    pub trait Sealed {}
}

/// Marker for the two tree forms. Implemented only by [`Clear`] and [`Cipher`].
pub trait Form: sealed::Sealed + Copy + Debug + PartialEq + Send + Sync + 'static {
    /// Short name used in log fields.
    const NAME: &'static str;
}

/// Secure leaves hold cleartext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clear {}

/// Secure leaves hold ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {}

impl sealed::Sealed for Clear {}
impl sealed::Sealed for Cipher {}

impl Form for Clear {
    const NAME: &'static str = "plaintext";
}

impl Form for Cipher {
    const NAME: &'static str = "ciphertext";
}

/// A tree whose secure leaves hold cleartext.
pub type PlaintextTree = Tree<Clear>;

/// A tree whose secure leaves hold ciphertext.
pub type EncryptedTree = Tree<Cipher>;

/// A string leaf. When `secure` is set, the meaning of `value` depends on
/// the form: cleartext in a [`PlaintextTree`], ciphertext in an [`EncryptedTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text<F: Form> {
    pub(crate) value: String,
    secure: bool,
    form: PhantomData<F>,
}

impl<F: Form> Text<F> {
    pub fn plain(value: impl Into<String>) -> Self {
        Self::new(value, false)
    }

    pub fn secure(value: impl Into<String>) -> Self {
        Self::new(value, true)
    }

    pub fn new(value: impl Into<String>, secure: bool) -> Self {
        Self {
            value: value.into(),
            secure,
            form: PhantomData,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

/// A recursive configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Tree<F: Form> {
    /// Absence of a value.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Text<F>),
    /// Ordered elements.
    Array(Vec<Tree<F>>),
    /// String-keyed members. Never the reserved `{"secure": <plain string>}` shape.
    Object(Object<F>),
}

impl<F: Form> Tree<F> {
    /// A non-secure string leaf.
    pub fn string(value: impl Into<String>) -> Self {
        Tree::String(Text::plain(value))
    }

    /// A secure string leaf: cleartext for [`PlaintextTree`], ciphertext for [`EncryptedTree`].
    pub fn secure_string(value: impl Into<String>) -> Self {
        Tree::String(Text::secure(value))
    }

    pub fn array(items: impl IntoIterator<Item = Tree<F>>) -> Self {
        Tree::Array(items.into_iter().collect())
    }

    /// Build an object from key/value pairs.
    ///
    /// Fails with [`SealError::ReservedRepresentation`] if the result would be
    /// exactly `{"secure": <plain string>}`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sealcfg_core::{PlaintextTree, SealError};
    ///
    /// let ok = PlaintextTree::object([("secure", PlaintextTree::Int(42))]);
    /// assert!(ok.is_ok());
    ///
    /// let reserved = PlaintextTree::object([("secure", PlaintextTree::string("x"))]);
    /// assert!(matches!(reserved, Err(SealError::ReservedRepresentation { .. })));
    /// ```
    pub fn object<K, I>(entries: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Tree<F>)>,
    {
        Object::from_entries(entries).map(Tree::Object)
    }

    /// True if this is a secure string leaf, or a composite containing one at any depth.
    pub fn is_secure(&self) -> bool {
        match self {
            Tree::String(text) => text.is_secure(),
            Tree::Array(items) => items.iter().any(Tree::is_secure),
            Tree::Object(object) => object.values().any(Tree::is_secure),
            Tree::Null | Tree::Bool(_) | Tree::Int(_) | Tree::Float(_) => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Tree::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::String(text) => Some(text.value()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Tree<F>]> {
        match self {
            Tree::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object<F>> {
        match self {
            Tree::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Rebuild this tree in form `G`, passing every secure string through `f`.
    ///
    /// Non-secure leaves are copied. `path` is the location of `self` and is
    /// extended while descending so `f` can attribute failures; it is restored
    /// before returning.
    pub(crate) fn try_map_secure<G, E>(
        &self,
        path: &mut PropertyPath,
        f: &mut impl FnMut(&PropertyPath, &str) -> std::result::Result<String, E>,
    ) -> std::result::Result<Tree<G>, E>
    where
        G: Form,
    {
        Ok(match self {
            Tree::Null => Tree::Null,
            Tree::Bool(b) => Tree::Bool(*b),
            Tree::Int(i) => Tree::Int(*i),
            Tree::Float(x) => Tree::Float(*x),
            Tree::String(text) if text.is_secure() => Tree::secure_string(f(path, text.value())?),
            Tree::String(text) => Tree::string(text.value()),
            Tree::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    path.push(i);
                    let converted = item.try_map_secure(path, f);
                    path.pop();
                    out.push(converted?);
                }
                Tree::Array(out)
            }
            Tree::Object(object) => {
                let mut out = BTreeMap::new();
                for (key, value) in object.iter() {
                    path.push(key.as_str());
                    let converted = value.try_map_secure(path, f);
                    path.pop();
                    out.insert(key.clone(), converted?);
                }
                Tree::Object(Object::from_map_unchecked(out))
            }
        })
    }

    /// Copy this tree into form `G` without touching secure payloads.
    ///
    /// Used to build the output skeleton of a batched pass before the
    /// transformed payloads are spliced in.
    pub(crate) fn reform<G: Form>(&self) -> Tree<G> {
        let copied: std::result::Result<Tree<G>, Infallible> =
            self.try_map_secure(&mut PropertyPath::new(), &mut |_, value| Ok(value.to_string()));
        match copied {
            Ok(tree) => tree,
            Err(never) => match never {},
        }
    }

    /// An empty container suited to `accessor`: an array for an index, an object for a key.
    pub(crate) fn container_for(accessor: &Accessor) -> Self {
        match accessor {
            Accessor::Index(_) => Tree::Array(Vec::new()),
            Accessor::Key(_) => Tree::Object(Object::new()),
        }
    }
}

impl<F: Form> Default for Tree<F> {
    fn default() -> Self {
        Tree::Null
    }
}

impl<F: Form> From<bool> for Tree<F> {
    fn from(value: bool) -> Self {
        Tree::Bool(value)
    }
}

impl<F: Form> From<i64> for Tree<F> {
    fn from(value: i64) -> Self {
        Tree::Int(value)
    }
}

impl<F: Form> From<f64> for Tree<F> {
    fn from(value: f64) -> Self {
        Tree::Float(value)
    }
}

impl<F: Form> From<&str> for Tree<F> {
    fn from(value: &str) -> Self {
        Tree::string(value)
    }
}

impl<F: Form> From<String> for Tree<F> {
    fn from(value: String) -> Self {
        Tree::string(value)
    }
}

impl<F: Form> From<Vec<Tree<F>>> for Tree<F> {
    fn from(items: Vec<Tree<F>>) -> Self {
        Tree::Array(items)
    }
}

impl<F: Form> From<Object<F>> for Tree<F> {
    fn from(object: Object<F>) -> Self {
        Tree::Object(object)
    }
}

/// String-keyed members of an object node, iterated in key order.
///
/// Every constructor and mutator rejects the reserved
/// `{"secure": <plain string>}` shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Object<F: Form> {
    pub(crate) entries: BTreeMap<String, Tree<F>>,
}

impl<F: Form> Object<F> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build from key/value pairs; later duplicates replace earlier ones.
    pub fn from_entries<K, I>(entries: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Tree<F>)>,
    {
        let entries: BTreeMap<String, Tree<F>> =
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if is_reserved_shape(&entries) {
            return Err(SealError::ReservedRepresentation {
                path: PropertyPath::new(),
            });
        }
        Ok(Self { entries })
    }

    /// Wrap a map the caller has already checked (or that came from decoding,
    /// where the reserved shape was turned into a secure leaf).
    pub(crate) fn from_map_unchecked(entries: BTreeMap<String, Tree<F>>) -> Self {
        debug_assert!(!is_reserved_shape(&entries));
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Tree<F>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, String, Tree<F>> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Tree<F>> {
        self.entries.values()
    }

    /// Insert `value` under `key`, failing if the object would become reserved.
    pub fn insert(&mut self, key: impl Into<String>, value: Tree<F>) -> Result<Option<Tree<F>>> {
        let key = key.into();
        if self.reserved_after_insert(&key, &value) {
            return Err(SealError::ReservedRepresentation {
                path: PropertyPath::new(),
            });
        }
        Ok(self.entries.insert(key, value))
    }

    /// Remove `key`, failing if the remaining member would be a reserved `secure` string.
    pub fn remove(&mut self, key: &str) -> Result<Option<Tree<F>>> {
        if self.reserved_after_remove(key) {
            return Err(SealError::ReservedRepresentation {
                path: PropertyPath::new(),
            });
        }
        Ok(self.entries.remove(key))
    }

    pub fn into_map(self) -> BTreeMap<String, Tree<F>> {
        self.entries
    }

    /// Would setting `key` to `value` leave exactly `{"secure": <plain string>}`?
    pub(crate) fn reserved_after_insert(&self, key: &str, value: &Tree<F>) -> bool {
        key == SECURE_KEY
            && is_plain_string(value)
            && (self.entries.is_empty() || (self.entries.len() == 1 && self.contains_key(SECURE_KEY)))
    }

    /// Would removing `key` leave exactly `{"secure": <plain string>}`?
    pub(crate) fn reserved_after_remove(&self, key: &str) -> bool {
        key != SECURE_KEY
            && self.entries.len() == 2
            && self.contains_key(key)
            && self.get(SECURE_KEY).is_some_and(is_plain_string)
    }
}

impl<F: Form> Default for Object<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, F: Form> IntoIterator for &'a Object<F> {
    type Item = (&'a String, &'a Tree<F>);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Tree<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn is_plain_string<F: Form>(value: &Tree<F>) -> bool {
    matches!(value, Tree::String(text) if !text.is_secure())
}

/// The wire encoding of a secure leaf: one `secure` key holding a plain string.
pub(crate) fn is_reserved_shape<F: Form>(entries: &BTreeMap<String, Tree<F>>) -> bool {
    entries.len() == 1 && entries.get(SECURE_KEY).is_some_and(is_plain_string)
}
