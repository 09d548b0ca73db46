use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer,
  de::Error as _,
  ser::SerializeMap,
};
use serde_json::Value;

use crate::{
  Tendril,
  attributes::AttributeMap,
  cursor::INFINITE_LEN,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
  /// Insert text, optionally formatted.
  Insert {
    text:       Tendril,
    attributes: Option<AttributeMap>,
  },

  /// Keep `len` characters, optionally re-stamping their attributes.
  Retain {
    len:        usize,
    attributes: Option<AttributeMap>,
  },

  /// Delete `len` characters.
  Delete(usize),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OpKind {
  Insert,
  Retain,
  Delete,
}

impl Operation {
  pub fn insert(text: impl Into<Tendril>) -> Self {
    Self::Insert {
      text:       text.into(),
      attributes: None,
    }
  }

  /// An empty attribute map is stored as `None`.
  pub fn insert_with(text: impl Into<Tendril>, attributes: impl Into<Option<AttributeMap>>) -> Self {
    Self::Insert {
      text:       text.into(),
      attributes: attributes.into().and_then(AttributeMap::into_option),
    }
  }

  pub fn retain(len: usize) -> Self {
    Self::Retain {
      len,
      attributes: None,
    }
  }

  /// An empty attribute map is stored as `None`.
  pub fn retain_with(len: usize, attributes: impl Into<Option<AttributeMap>>) -> Self {
    Self::Retain {
      len,
      attributes: attributes.into().and_then(AttributeMap::into_option),
    }
  }

  pub fn delete(len: usize) -> Self {
    Self::Delete(len)
  }

  pub fn kind(&self) -> OpKind {
    match self {
      Self::Insert { .. } => OpKind::Insert,
      Self::Retain { .. } => OpKind::Retain,
      Self::Delete(_) => OpKind::Delete,
    }
  }

  /// Length in chars.
  pub fn len(&self) -> usize {
    match self {
      Self::Insert { text, .. } => text.chars().count(),
      Self::Retain { len, .. } | Self::Delete(len) => *len,
    }
  }

  pub fn is_empty(&self) -> bool {
    match self {
      Self::Insert { text, .. } => text.is_empty(),
      Self::Retain { len, .. } | Self::Delete(len) => *len == 0,
    }
  }

  pub fn attributes(&self) -> Option<&AttributeMap> {
    match self {
      Self::Insert { attributes, .. } | Self::Retain { attributes, .. } => attributes.as_ref(),
      Self::Delete(_) => None,
    }
  }

  /// Decode one serialized record.
  ///
  /// A record is an object with exactly one of `insert` (a string), `retain`
  /// or `delete` (non-negative integers below [`INFINITE_LEN`]), plus an
  /// optional `attributes` object of scalars on inserts and retains. Anything
  /// else yields `None`.
  pub fn from_record(record: &Value) -> Option<Self> {
    let record = record.as_object()?;

    let attributes = match record.get("attributes") {
      None | Some(Value::Null) => None,
      Some(value @ Value::Object(_)) => {
        Some(serde_json::from_value::<AttributeMap>(value.clone()).ok()?)
      },
      Some(_) => return None,
    };

    let length = |value: &Value| {
      value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .filter(|&n| n < INFINITE_LEN)
    };

    match (
      record.get("insert"),
      record.get("retain"),
      record.get("delete"),
    ) {
      (Some(Value::String(text)), None, None) => {
        Some(Self::insert_with(text.as_str(), attributes))
      },
      (None, Some(len), None) => Some(Self::retain_with(length(len)?, attributes)),
      (None, None, Some(len)) => Some(Self::Delete(length(len)?)),
      _ => None,
    }
  }
}

impl Serialize for Operation {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let attributes = self.attributes();
    let mut map = serializer.serialize_map(Some(1 + usize::from(attributes.is_some())))?;

    match self {
      Self::Insert { text, .. } => map.serialize_entry("insert", text.as_str())?,
      Self::Retain { len, .. } => map.serialize_entry("retain", len)?,
      Self::Delete(len) => map.serialize_entry("delete", len)?,
    }
    if let Some(attributes) = attributes {
      map.serialize_entry("attributes", attributes)?;
    }

    map.end()
  }
}

impl<'de> Deserialize<'de> for Operation {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let record = Value::deserialize(deserializer)?;
    Self::from_record(&record)
      .ok_or_else(|| D::Error::custom(format!("unrecognized operation record: {record}")))
  }
}
