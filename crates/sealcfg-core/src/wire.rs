//! JSON/YAML encoding of value trees.
//!
//! Everything maps onto the natural JSON/YAML shape, except that a secure
//! string leaf is wrapped as `{"secure": "<value>"}`. Decoding reverses this:
//! any mapping whose only key is `secure` and whose value is a string becomes
//! a secure leaf. That is the only place the reserved shape is produced or
//! consumed.
//!
//! Non-finite floats have no JSON form and fail to encode rather than
//! turning into `null`.
//!
//! A bare root string carries no secure marker of its own, so the root of a
//! single stored value travels out-of-band as a [`WireValue`].

use crate::error::Result;
use crate::tree::{is_reserved_shape, Form, Object, Text, Tree, SECURE_KEY};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

impl<F: Form> Serialize for Tree<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Tree::Null => serializer.serialize_unit(),
            Tree::Bool(b) => serializer.serialize_bool(*b),
            Tree::Int(i) => serializer.serialize_i64(*i),
            // JSON has no NaN or infinity.
            Tree::Float(x) if !x.is_finite() => Err(ser::Error::custom(format_args!(
                "cannot encode non-finite float {x}"
            ))),
            Tree::Float(x) => serializer.serialize_f64(*x),
            Tree::String(text) if text.is_secure() => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(SECURE_KEY, text.value())?;
                map.end()
            }
            Tree::String(text) => serializer.serialize_str(text.value()),
            Tree::Array(items) => serializer.collect_seq(items),
            Tree::Object(object) => serializer.collect_map(object.iter()),
        }
    }
}

impl<'de, F: Form> Deserialize<'de> for Tree<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(TreeVisitor(PhantomData))
    }
}

struct TreeVisitor<F>(PhantomData<F>);

impl<'de, F: Form> Visitor<'de> for TreeVisitor<F> {
    type Value = Tree<F>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON or YAML value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
        Ok(Tree::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(Tree::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(i64::try_from(v).map_or(Tree::Float(v as f64), Tree::Int))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> std::result::Result<Self::Value, E> {
        Ok(i64::try_from(v).map_or(Tree::Float(v as f64), Tree::Int))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> std::result::Result<Self::Value, E> {
        Ok(i64::try_from(v).map_or(Tree::Float(v as f64), Tree::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        Ok(Tree::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(Tree::string(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
        Ok(Tree::string(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(Tree::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(Tree::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Self::Value, D::Error> {
        Tree::deserialize(d)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Tree::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries: BTreeMap<String, Tree<F>> = BTreeMap::new();
        while let Some((MapKey(key), value)) = map.next_entry::<MapKey, Tree<F>>()? {
            entries.insert(key, value);
        }
        if is_reserved_shape(&entries) {
            if let Some(Tree::String(text)) = entries.remove(SECURE_KEY) {
                return Ok(Tree::secure_string(text.into_value()));
            }
        }
        Ok(Tree::Object(Object::from_map_unchecked(entries)))
    }
}

/// A mapping key. JSON keys are always strings; YAML keys may be scalars of
/// any type and are stringified.
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(MapKeyVisitor)
    }
}

struct MapKeyVisitor;

impl Visitor<'_> for MapKeyVisitor {
    type Value = MapKey;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a scalar mapping key")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<MapKey, E> {
        Ok(MapKey(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<MapKey, E> {
        Ok(MapKey(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<MapKey, E> {
        Ok(MapKey("null".to_string()))
    }
}

/// The stored form of one configuration value: its text, whether it is
/// secret, and whether the text is a JSON-encoded composite.
///
/// | root                 | `text`               | `secure`         | `object` |
/// |----------------------|----------------------|------------------|----------|
/// | string               | the string itself    | the leaf's flag  | `false`  |
/// | bool, number or null | its JSON text        | `false`          | `false`  |
/// | array or object      | its JSON text        | `is_secure()`    | `true`   |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireValue {
    pub text: String,
    pub secure: bool,
    pub object: bool,
}

impl<F: Form> Tree<F> {
    /// Encode the root out-of-band, as a [`WireValue`].
    pub fn to_wire(&self) -> Result<WireValue> {
        Ok(match self {
            Tree::String(text) => WireValue {
                text: text.value().to_string(),
                secure: text.is_secure(),
                object: false,
            },
            Tree::Null | Tree::Bool(_) | Tree::Int(_) | Tree::Float(_) => WireValue {
                text: self.to_json()?,
                secure: false,
                object: false,
            },
            Tree::Array(_) | Tree::Object(_) => WireValue {
                text: self.to_json()?,
                secure: self.is_secure(),
                object: true,
            },
        })
    }

    /// Decode a [`WireValue`].
    ///
    /// Composites are parsed as JSON, with secrecy inferred from `secure`
    /// wrappers. Anything else becomes a string leaf carrying `wire.secure`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sealcfg_core::{EncryptedTree, WireValue};
    ///
    /// let wire = WireValue { text: "djE6YWJj".into(), secure: true, object: false };
    /// let tree = EncryptedTree::from_wire(&wire).unwrap();
    /// assert!(tree.is_secure());
    /// assert_eq!(tree.as_str(), Some("djE6YWJj"));
    /// ```
    pub fn from_wire(wire: &WireValue) -> Result<Self> {
        if wire.object {
            return Self::from_json(&wire.text);
        }
        Ok(Tree::String(Text::new(wire.text.as_str(), wire.secure)))
    }

    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Compact JSON, with secure leaves wrapped as `{"secure": ...}`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
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
