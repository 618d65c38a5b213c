//! Path-addressed reads and edits on a value tree.
//!
//! Edits never mutate the receiver: [`Tree::set`] and [`Tree::delete`] return
//! a new tree, so a failed edit leaves the input intact.

use crate::error::{Result, SealError};
use crate::path::{Accessor, PropertyPath};
use crate::tree::{Form, Object, Tree};
use std::collections::BTreeMap;

impl<F: Form> Tree<F> {
    /// Look up the subtree at `path`.
    ///
    /// A missing key, an index outside the array, or an accessor of the wrong
    /// kind for the container is "not found", not an error.
    pub fn get(&self, path: &PropertyPath) -> Option<&Tree<F>> {
        let mut node = self;
        for accessor in path {
            node = match (node, accessor) {
                (Tree::Array(items), Accessor::Index(index)) => {
                    items.get(usize::try_from(*index).ok()?)?
                }
                (Tree::Object(object), Accessor::Key(key)) => object.get(key)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Mutable lookup, used to splice batch results back into place.
    pub(crate) fn get_mut(&mut self, path: &PropertyPath) -> Option<&mut Tree<F>> {
        let mut node = self;
        for accessor in path {
            node = match (node, accessor) {
                (Tree::Array(items), Accessor::Index(index)) => {
                    items.get_mut(usize::try_from(*index).ok()?)?
                }
                (Tree::Object(object), Accessor::Key(key)) => object.entries.get_mut(key)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Return a copy of this tree with the subtree at `path` replaced by `value`.
    ///
    /// - An empty path replaces the whole tree.
    /// - Missing intermediate containers are created from the next accessor:
    ///   an array for an index, an object for a key. A scalar at the root is
    ///   overwritten the same way; a scalar anywhere else is a
    ///   [`SealError::TypeMismatch`].
    /// - An index may address any element or the append position `len`.
    ///   Anything else is [`SealError::OutOfRange`].
    /// - Writing a plain string under `secure` into an object that would then
    ///   have no other key is [`SealError::ReservedRepresentation`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sealcfg_core::{PlaintextTree, PropertyPath};
    ///
    /// let tree = PlaintextTree::Null;
    /// let path = PropertyPath::parse("db.hosts[0]").unwrap();
    /// let tree = tree.set(&path, PlaintextTree::string("a.internal")).unwrap();
    /// assert_eq!(tree.get(&path).and_then(|t| t.as_str()), Some("a.internal"));
    /// ```
    pub fn set(&self, path: &PropertyPath, value: Tree<F>) -> Result<Tree<F>> {
        let mut updated = self.clone();
        let mut prefix = PropertyPath::new();
        updated.set_at(&mut prefix, path.accessors(), value)?;
        Ok(updated)
    }

    fn set_at(
        &mut self,
        prefix: &mut PropertyPath,
        path: &[Accessor],
        value: Tree<F>,
    ) -> Result<()> {
        let Some((head, rest)) = path.split_first() else {
            *self = value;
            return Ok(());
        };

        match self {
            Tree::Array(_) | Tree::Object(_) => {}
            Tree::Null => *self = Tree::container_for(head),
            _ if prefix.is_empty() => *self = Tree::container_for(head),
            _ => {
                return Err(SealError::TypeMismatch {
                    path: prefix.clone(),
                    expected: expected_container(head),
                })
            }
        }

        match (self, head) {
            (Tree::Array(items), Accessor::Index(index)) => {
                prefix.push(head.clone());
                let len = items.len();
                let index = usize::try_from(*index)
                    .ok()
                    .filter(|i| *i <= len)
                    .ok_or_else(|| SealError::OutOfRange {
                        path: prefix.clone(),
                    })?;
                if index == len {
                    items.push(Tree::Null);
                }
                items[index].set_at(prefix, rest, value)
            }
            (Tree::Object(object), Accessor::Key(key)) => {
                if rest.is_empty() && object.reserved_after_insert(key, &value) {
                    return Err(SealError::ReservedRepresentation {
                        path: prefix.clone(),
                    });
                }
                prefix.push(head.clone());
                object
                    .entries
                    .entry(key.clone())
                    .or_default()
                    .set_at(prefix, rest, value)
            }
            (Tree::Array(_), Accessor::Key(_)) | (Tree::Object(_), Accessor::Index(_)) => {
                Err(SealError::TypeMismatch {
                    path: prefix.clone(),
                    expected: expected_container(head),
                })
            }
            _ => unreachable!("non-container after container check"),
        }
    }

    /// Return a copy of this tree with the subtree at `path` removed.
    ///
    /// Missing targets are a no-op. Removing an array element shifts the
    /// elements after it. Removing a key that would leave an object as exactly
    /// `{"secure": <plain string>}` is [`SealError::ReservedRepresentation`].
    /// An empty path has nothing to remove from and returns the tree unchanged;
    /// dropping a whole entry is the owning map's job.
    pub fn delete(&self, path: &PropertyPath) -> Result<Tree<F>> {
        let mut updated = self.clone();
        let mut prefix = PropertyPath::new();
        updated.delete_at(&mut prefix, path.accessors())?;
        Ok(updated)
    }

    fn delete_at(&mut self, prefix: &mut PropertyPath, path: &[Accessor]) -> Result<()> {
        let Some((head, rest)) = path.split_first() else {
            return Ok(());
        };

        match (self, head) {
            (Tree::Array(items), Accessor::Index(index)) => {
                let Some(index) = usize::try_from(*index).ok().filter(|i| *i < items.len())
                else {
                    return Ok(());
                };
                if rest.is_empty() {
                    items.remove(index);
                    return Ok(());
                }
                prefix.push(head.clone());
                items[index].delete_at(prefix, rest)
            }
            (Tree::Object(object), Accessor::Key(key)) => {
                if rest.is_empty() {
                    if object.reserved_after_remove(key) {
                        return Err(SealError::ReservedRepresentation {
                            path: prefix.clone(),
                        });
                    }
                    object.entries.remove(key);
                    return Ok(());
                }
                match object.entries.get_mut(key) {
                    Some(child) => {
                        prefix.push(head.clone());
                        child.delete_at(prefix, rest)
                    }
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    /// Merge `self` onto `base` with JSON-merge-patch semantics.
    ///
    /// When both sides are objects, keys from `self` are merged recursively
    /// over the keys of `base`. Otherwise `self` replaces `base` wholesale.
    /// Neither input is modified.
    pub fn merge(&self, base: &Tree<F>) -> Tree<F> {
        match (self, base) {
            (Tree::Object(overlay), Tree::Object(base)) => {
                let mut merged: BTreeMap<String, Tree<F>> = base.entries.clone();
                for (key, value) in overlay.iter() {
                    let combined = match merged.get(key) {
                        Some(existing) => value.merge(existing),
                        None => value.clone(),
                    };
                    merged.insert(key.clone(), combined);
                }
                Tree::Object(Object::from_map_unchecked(merged))
            }
            _ => self.clone(),
        }
    }
}

fn expected_container(accessor: &Accessor) -> &'static str {
    match accessor {
        Accessor::Index(_) => "an array",
        Accessor::Key(_) => "a map",
    }
}
