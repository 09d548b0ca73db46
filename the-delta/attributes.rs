//! Formatting attributes attached to inserts and retains.
//!
//! The algebra never interprets attribute values itself. Whenever two
//! attribute sets have to be merged or undone it defers to an
//! [`AttributePolicy`]; [`StandardPolicy`] is the usual "last writer wins,
//! `null` removes" policy rich-text editors use.

use std::{
  collections::{
    BTreeMap,
    btree_map,
  },
  hash::BuildHasher,
};

use foldhash::fast::FixedState;
use serde::{
  Deserialize,
  Serialize,
};
use serde_json::Number;

/// Seed for [`StandardPolicy::hash`]. Fixed so hashes are stable across runs.
const ATTRIBUTE_HASH_SEED: u64 = 0x5eed_0000_de17_a000;

/// A scalar attribute value.
///
/// `Null` is a real value: in a retain it means "remove this attribute",
/// which is different from the key being absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
  Null,
  Bool(bool),
  Number(Number),
  String(String),
}

impl AttributeValue {
  pub fn is_null(&self) -> bool {
    matches!(self, Self::Null)
  }
}

impl From<bool> for AttributeValue {
  fn from(value: bool) -> Self {
    Self::Bool(value)
  }
}

impl From<i64> for AttributeValue {
  fn from(value: i64) -> Self {
    Self::Number(value.into())
  }
}

impl From<u64> for AttributeValue {
  fn from(value: u64) -> Self {
    Self::Number(value.into())
  }
}

impl From<&str> for AttributeValue {
  fn from(value: &str) -> Self {
    Self::String(value.to_owned())
  }
}

impl From<String> for AttributeValue {
  fn from(value: String) -> Self {
    Self::String(value)
  }
}

/// Unordered key/value formatting metadata.
///
/// Backed by an ordered map so that equal maps hash and serialize
/// identically regardless of insertion order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, AttributeValue>);

impl AttributeMap {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insert.
  #[must_use]
  pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
    self.insert(key, value);
    self
  }

  pub fn insert(
    &mut self,
    key: impl Into<String>,
    value: impl Into<AttributeValue>,
  ) -> Option<AttributeValue> {
    self.0.insert(key.into(), value.into())
  }

  pub fn get(&self, key: &str) -> Option<&AttributeValue> {
    self.0.get(key)
  }

  pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
    self.0.remove(key)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.0.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> btree_map::Iter<'_, String, AttributeValue> {
    self.0.iter()
  }

  /// `None` for an empty map. Operations never store `Some(empty)`.
  pub fn into_option(self) -> Option<Self> {
    (!self.is_empty()).then_some(self)
  }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for AttributeMap {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(
      iter
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect(),
    )
  }
}

impl<'a> IntoIterator for &'a AttributeMap {
  type IntoIter = btree_map::Iter<'a, String, AttributeValue>;
  type Item = (&'a String, &'a AttributeValue);

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

/// How attribute sets are compared, merged, undone and hashed.
///
/// Implementations must be pure: the same inputs always give the same
/// output.
pub trait AttributePolicy {
  /// Whether two attribute sets are interchangeable. Decides if adjacent
  /// operations may be fused.
  fn equal(&self, a: Option<&AttributeMap>, b: Option<&AttributeMap>) -> bool {
    a == b
  }

  /// Attributes of `a` followed by `b`. `keep_null` is set when the result
  /// is itself a retain, where a `Null` still has to reach the document.
  fn compose(
    &self,
    a: Option<&AttributeMap>,
    b: Option<&AttributeMap>,
    keep_null: bool,
  ) -> Option<AttributeMap>;

  /// Attributes that undo `attrs` applied on top of `base`.
  fn invert(
    &self,
    attrs: Option<&AttributeMap>,
    base: Option<&AttributeMap>,
  ) -> Option<AttributeMap>;

  /// Deterministic hash; equal sets hash equally.
  fn hash(&self, attrs: Option<&AttributeMap>) -> u64;
}

/// Last writer wins; `Null` removes a key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StandardPolicy;

impl AttributePolicy for StandardPolicy {
  fn compose(
    &self,
    a: Option<&AttributeMap>,
    b: Option<&AttributeMap>,
    keep_null: bool,
  ) -> Option<AttributeMap> {
    let mut composed: AttributeMap = b
      .into_iter()
      .flatten()
      .filter(|(_, value)| keep_null || !value.is_null())
      .map(|(key, value)| (key.clone(), value.clone()))
      .collect();

    for (key, value) in a.into_iter().flatten() {
      if !b.is_some_and(|b| b.contains_key(key)) {
        composed.insert(key.clone(), value.clone());
      }
    }

    composed.into_option()
  }

  fn invert(
    &self,
    attrs: Option<&AttributeMap>,
    base: Option<&AttributeMap>,
  ) -> Option<AttributeMap> {
    let mut inverted = AttributeMap::new();

    // Restore values the edit overwrote.
    for (key, value) in base.into_iter().flatten() {
      if attrs
        .and_then(|attrs| attrs.get(key))
        .is_some_and(|current| current != value)
      {
        inverted.insert(key.clone(), value.clone());
      }
    }

    // Remove keys the edit introduced.
    for (key, _) in attrs.into_iter().flatten() {
      if !base.is_some_and(|base| base.contains_key(key)) {
        inverted.insert(key.clone(), AttributeValue::Null);
      }
    }

    inverted.into_option()
  }

  fn hash(&self, attrs: Option<&AttributeMap>) -> u64 {
    FixedState::with_seed(ATTRIBUTE_HASH_SEED).hash_one(attrs)
  }
}
