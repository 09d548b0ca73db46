//! The [`Delta`] type: an ordered, normalized list of operations.
//!
//! # Normalization
//!
//! Every construction path goes through [`Delta::push`], which keeps the list
//! in canonical form:
//!
//! - empty operations are never stored
//! - adjacent deletes are fused, as are adjacent inserts or retains carrying
//!   equal attributes
//! - an insert directly after a delete is stored before it
//!
//! The one exception is `+` ([`std::ops::Add`]), which splices the two
//! operation lists without fusing across the seam. Use [`Delta::concat`] for
//! the normalizing variant.
//!
//! # Composition
//!
//! `a.compose(&b)` is the single delta equivalent to applying `a` and then
//! `b`. Lengths beyond the end of either side behave as plain retains, so
//! composing an edit onto the document it targets yields the edited
//! document:
//!
//! ```ignore
//! let doc = Delta::document("Hello World");
//! let mut edit = Delta::new();
//! edit.retain(6).insert("there ").delete(5).insert("Earth");
//! assert_eq!(doc.compose(&edit).raw_string(), "Hello there Earth");
//! ```
//!
//! # Inversion
//!
//! `edit.invert(&doc)` undoes `edit` given the document it was applied to:
//!
//! ```ignore
//! let undo = edit.invert(&doc)?;
//! assert_eq!(doc.compose(&edit).compose(&undo), doc);
//! ```

use std::{
  fmt,
  hash::{
    Hash,
    Hasher,
  },
  ops::Add,
  time::Instant,
};

use once_cell::sync::OnceCell;
use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer,
};
use thiserror::Error;

use crate::{
  Tendril,
  attributes::{
    AttributeMap,
    AttributePolicy,
    StandardPolicy,
  },
  cursor::{
    INFINITE_LEN,
    OpCursor,
  },
  operation::{
    OpKind,
    Operation,
  },
};

pub type Result<T> = std::result::Result<T, DeltaError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeltaError {
  #[error("invalid slice range: start {start} is after end {end}")]
  InvalidRange { start: usize, end: usize },
  #[error("slice range {start}..{end} is out of bounds for delta length {len}")]
  RangeOutOfBounds {
    start: usize,
    end:   usize,
    len:   usize,
  },
  #[error("invalid delta json: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Default, Clone)]
pub struct Delta {
  ops: Vec<Operation>,
  /// Concatenated insert text, built on first request.
  raw: OnceCell<String>,
}

impl Delta {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      ops: Vec::with_capacity(capacity),
      raw: OnceCell::new(),
    }
  }

  /// A document: a single unformatted insert of `text`.
  pub fn document(text: impl Into<Tendril>) -> Self {
    let mut delta = Self::new();
    delta.insert(text);
    delta
  }

  pub fn ops(&self) -> &[Operation] {
    &self.ops
  }

  pub fn into_ops(self) -> Vec<Operation> {
    self.ops
  }

  /// Total length of all operations, deletes included. Saturates at
  /// `usize::MAX`.
  pub fn len(&self) -> usize {
    sum_len(self.ops.iter())
  }

  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }

  /// Length of the document this delta explicitly covers (retains and
  /// deletes).
  pub fn base_len(&self) -> usize {
    sum_len(self.ops.iter().filter(|op| op.kind() != OpKind::Insert))
  }

  /// Length of that region after the delta is applied (inserts and
  /// retains).
  pub fn target_len(&self) -> usize {
    sum_len(self.ops.iter().filter(|op| op.kind() != OpKind::Delete))
  }

  /// Whether this delta is a plain document, i.e. inserts only.
  pub fn is_document(&self) -> bool {
    self.ops.iter().all(|op| op.kind() == OpKind::Insert)
  }

  /// Concatenated text of all inserts. Retains and deletes contribute
  /// nothing.
  pub fn raw_string(&self) -> &str {
    self.raw.get_or_init(|| {
      self
        .ops
        .iter()
        .filter_map(|op| {
          match op {
            Operation::Insert { text, .. } => Some(text.as_str()),
            _ => None,
          }
        })
        .collect()
    })
  }

  // Builder operations: insert/retain/delete.

  /// Append `op`, keeping the delta normalized.
  pub fn push(&mut self, op: Operation) -> &mut Self {
    self.push_with(op, &StandardPolicy)
  }

  pub fn insert(&mut self, text: impl Into<Tendril>) -> &mut Self {
    self.push(Operation::insert(text))
  }

  pub fn insert_with(&mut self, text: impl Into<Tendril>, attributes: AttributeMap) -> &mut Self {
    self.push(Operation::insert_with(text, attributes))
  }

  pub fn retain(&mut self, len: usize) -> &mut Self {
    self.push(Operation::retain(len))
  }

  pub fn retain_with(&mut self, len: usize, attributes: AttributeMap) -> &mut Self {
    self.push(Operation::retain_with(len, attributes))
  }

  pub fn delete(&mut self, len: usize) -> &mut Self {
    self.push(Operation::delete(len))
  }

  fn push_with<P: AttributePolicy + ?Sized>(&mut self, op: Operation, policy: &P) -> &mut Self {
    use Operation::*;

    if op.is_empty() {
      return self;
    }

    self.raw.take();

    let mut index = self.ops.len();
    match (self.ops.last_mut(), &op) {
      // lengths that would reach the cursor's end sentinel stay separate
      (Some(Delete(count)), Delete(n)) => {
        if let Some(sum) = fused_len(*count, *n) {
          *count = sum;
          return self;
        }
      },
      // inserts always sort before a delete at the same position
      (Some(Delete(_)), Insert { .. }) => index -= 1,
      _ => {},
    }

    if let Some(prev) = index.checked_sub(1).and_then(|i| self.ops.get_mut(i))
      && policy.equal(prev.attributes(), op.attributes())
    {
      match (prev, &op) {
        (Insert { text, .. }, Insert { text: more, .. }) => {
          text.push_str(more);
          return self;
        },
        (Retain { len, .. }, Retain { len: more, .. }) => {
          if let Some(sum) = fused_len(*len, *more) {
            *len = sum;
            return self;
          }
        },
        _ => {},
      }
    }

    self.ops.insert(index, op);
    self
  }

  /// Drop a trailing unformatted retain, which has no effect.
  pub fn chop(&mut self) -> &mut Self {
    if let Some(Operation::Retain {
      attributes: None, ..
    }) = self.ops.last()
    {
      self.ops.pop();
    }
    self
  }

  /// Concatenate, fusing operations of `self` and `other` that meet at the
  /// seam when they are compatible.
  pub fn concat(&self, other: &Self) -> Self {
    let mut delta = self.clone();
    delta.extend(other.ops.iter().cloned());
    delta
  }

  /// The part of this delta covering `[start, end)`, `end` defaulting to
  /// [`Delta::len`].
  pub fn slice(&self, start: usize, end: Option<usize>) -> Result<Self> {
    self.slice_with(start, end, &StandardPolicy)
  }

  fn slice_with<P: AttributePolicy + ?Sized>(
    &self,
    start: usize,
    end: Option<usize>,
    policy: &P,
  ) -> Result<Self> {
    let len = self.len();
    let end = end.unwrap_or(len);
    if start > end {
      return Err(DeltaError::InvalidRange { start, end });
    }
    if end > len {
      return Err(DeltaError::RangeOutOfBounds { start, end, len });
    }

    let mut cursor = OpCursor::new(&self.ops);
    let mut sliced = Self::new();
    let mut index = 0;

    while index < end && cursor.has_next() {
      if index < start {
        index += cursor.consume(start - index).len();
      } else {
        let op = cursor.consume(end - index);
        index += op.len();
        sliced.push_with(op, policy);
      }
    }

    Ok(sliced)
  }

  /// Combine with a delta applied after this one.
  pub fn compose(&self, other: &Self) -> Self {
    self.compose_with(other, &StandardPolicy)
  }

  pub fn compose_with<P: AttributePolicy + ?Sized>(&self, other: &Self, policy: &P) -> Self {
    let start = tracing::enabled!(tracing::Level::DEBUG).then(Instant::now);
    let composed = self.compose_ops(other, policy);

    if let Some(start) = start {
      tracing::debug!(
        left = self.ops.len(),
        right = other.ops.len(),
        "delta compose took {}s",
        Instant::now().duration_since(start).as_secs_f64()
      );
    }
    composed
  }

  fn compose_ops<P: AttributePolicy + ?Sized>(&self, other: &Self, policy: &P) -> Self {
    use Operation::*;

    let mut this = OpCursor::new(&self.ops);
    let mut that = OpCursor::new(&other.ops);
    let mut composed = Self::with_capacity(self.ops.len() + other.ops.len());

    // A plain leading retain leaves the inserts it covers untouched.
    if let Some(&Retain {
      len,
      attributes: None,
    }) = that.peek()
    {
      let mut left = len;
      while this.peek_kind() == Some(OpKind::Insert) && this.peek_remaining() <= left {
        left -= this.peek_remaining();
        composed.push_with(this.consume_rest(), policy);
      }
      if len > left {
        that.consume(len - left);
      }
    }

    while this.has_next() || that.has_next() {
      if that.peek_kind() == Some(OpKind::Insert) {
        composed.push_with(that.consume_rest(), policy);
        continue;
      }
      if this.peek_kind() == Some(OpKind::Delete) {
        composed.push_with(this.consume_rest(), policy);
        continue;
      }

      let len = this.peek_remaining().min(that.peek_remaining());
      let op = match (this.consume(len), that.consume(len)) {
        (Retain { attributes: a, .. }, Retain { attributes: b, .. }) => {
          Operation::retain_with(len, policy.compose(a.as_ref(), b.as_ref(), true))
        },
        (Insert { text, attributes: a }, Retain { attributes: b, .. }) => {
          Operation::insert_with(text, policy.compose(a.as_ref(), b.as_ref(), false))
        },
        (Retain { .. }, Delete(n)) => {
          composed.push_with(Delete(n), policy);
          continue;
        },
        // text inserted by `self` and deleted by `other` cancels out
        (Insert { .. }, Delete(_)) => continue,
        (a @ Delete(_), b) | (a, b @ Insert { .. }) => {
          unreachable!("deletes in self and inserts in other are drained first: {a:?}, {b:?}")
        },
      };

      if that.has_next() {
        composed.push_with(op, policy);
        continue;
      }

      // Nothing left in `other`: the rest of `self` passes through as is.
      let emitted = op.clone();
      composed.push_with(op, policy);
      if composed.ops.last() == Some(&emitted) {
        tracing::trace!("compose: other exhausted, appending remainder of self");
        for op in this.remainder() {
          composed.push_with(op, policy);
        }
        break;
      }
    }

    composed.chop();
    composed
  }

  /// The delta undoing this one, given the document `base` it was applied
  /// to.
  ///
  /// Fails if this delta reaches past the end of `base`.
  pub fn invert(&self, base: &Self) -> Result<Self> {
    self.invert_with(base, &StandardPolicy)
  }

  pub fn invert_with<P: AttributePolicy + ?Sized>(&self, base: &Self, policy: &P) -> Result<Self> {
    use Operation::*;

    let start = tracing::enabled!(tracing::Level::DEBUG).then(Instant::now);
    let mut inverted = Self::with_capacity(self.ops.len());
    let mut offset = 0;

    for op in &self.ops {
      match op {
        Insert { .. } => {
          inverted.push_with(Delete(op.len()), policy);
        },
        Retain {
          len,
          attributes: None,
        } => {
          inverted.push_with(Operation::retain(*len), policy);
          offset += len;
        },
        Delete(len) | Retain { len, .. } => {
          let end = offset
            .checked_add(*len)
            .ok_or_else(|| {
              DeltaError::RangeOutOfBounds {
                start: offset,
                end:   usize::MAX,
                len:   base.len(),
              }
            })?;
          let original = base.slice_with(offset, Some(end), policy)?;
          for base_op in original.ops {
            let restored = match op {
              Delete(_) => base_op,
              _ => {
                let attributes = policy.invert(op.attributes(), base_op.attributes());
                Operation::retain_with(base_op.len(), attributes)
              },
            };
            inverted.push_with(restored, policy);
          }
          offset += len;
        },
      }
    }

    inverted.chop();

    if let Some(start) = start {
      tracing::debug!(
        ops = self.ops.len(),
        "delta invert took {}s",
        Instant::now().duration_since(start).as_secs_f64()
      );
    }
    Ok(inverted)
  }

  pub fn from_json(json: &str) -> Result<Self> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn to_json_pretty(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}

fn sum_len<'a>(ops: impl Iterator<Item = &'a Operation>) -> usize {
  ops.map(Operation::len).fold(0, usize::saturating_add)
}

/// `a + b`, if it stays below [`INFINITE_LEN`].
fn fused_len(a: usize, b: usize) -> Option<usize> {
  a.checked_add(b).filter(|&sum| sum < INFINITE_LEN)
}

impl fmt::Debug for Delta {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Delta").field(&self.ops).finish()
  }
}

impl fmt::Display for Delta {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
    f.write_str(&json)
  }
}

impl PartialEq for Delta {
  fn eq(&self, other: &Self) -> bool {
    self.ops == other.ops
  }
}

impl Eq for Delta {}

impl Hash for Delta {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.ops.hash(state);
  }
}

impl From<Vec<Operation>> for Delta {
  fn from(ops: Vec<Operation>) -> Self {
    ops.into_iter().collect()
  }
}

impl FromIterator<Operation> for Delta {
  fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
    let mut delta = Self::new();
    delta.extend(iter);
    delta
  }
}

impl Extend<Operation> for Delta {
  fn extend<I: IntoIterator<Item = Operation>>(&mut self, iter: I) {
    for op in iter {
      self.push(op);
    }
  }
}

/// Splices the operation lists as they are. Unlike every other way of
/// building a delta, operations meeting at the seam are not fused.
impl Add for Delta {
  type Output = Delta;

  fn add(mut self, other: Delta) -> Delta {
    self.ops.extend(other.ops);
    self.raw.take();
    self
  }
}

impl Serialize for Delta {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    self.ops.serialize(serializer)
  }
}

/// Records that match no operation shape are skipped.
impl<'de> Deserialize<'de> for Delta {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
    let records = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let mut delta = Self::with_capacity(records.len());

    let mut total = 0usize;

    for record in &records {
      let Some(op) = Operation::from_record(record) else {
        tracing::trace!(%record, "skipping unrecognized operation record");
        continue;
      };
      match total.checked_add(op.len()).filter(|&sum| sum < INFINITE_LEN) {
        Some(sum) => {
          total = sum;
          delta.push(op);
        },
        None => tracing::trace!(%record, "skipping operation record past the maximum delta length"),
      }
    }

    Ok(delta)
  }
}

#[cfg(test)]
mod test {
  use quickcheck::{
    TestResult,
    quickcheck,
  };

  use super::*;
  use crate::attributes::AttributeValue;

  fn bold() -> AttributeMap {
    AttributeMap::new().with("bold", true)
  }

  fn delta(ops: Vec<Operation>) -> Delta {
    Delta::from(ops)
  }

  /// Build an edit applicable to a document of `base_len` chars from an
  /// arbitrary script of `(kind, amount, formatted)` steps.
  fn edit(base_len: usize, script: &[(u8, u8, bool)]) -> Delta {
    let mut delta = Delta::new();
    let mut remaining = base_len;

    for &(kind, amount, formatted) in script {
      let n = usize::from(amount % 6);
      match kind % 3 {
        0 => {
          let text: String = "ab世é".chars().cycle().take(n + 1).collect();
          if formatted {
            delta.insert_with(text, bold());
          } else {
            delta.insert(text);
          }
        },
        1 => {
          let n = n.min(remaining);
          remaining -= n;
          if formatted {
            delta.retain_with(n, bold());
          } else {
            delta.retain(n);
          }
        },
        _ => {
          let n = n.min(remaining);
          remaining -= n;
          delta.delete(n);
        },
      }
    }

    delta
  }

  #[test]
  fn push_skips_empty_operations() {
    let mut delta = Delta::document("abc");
    let before = delta.to_json().unwrap();

    delta
      .insert("")
      .retain(0)
      .delete(0)
      .push(Operation::retain_with(0, bold()));

    assert_eq!(delta.to_json().unwrap(), before);
  }

  #[test]
  fn push_fuses_deletes() {
    let mut delta = Delta::new();
    delta.retain(1).delete(2).delete(3);
    assert_eq!(delta.ops(), &[Operation::retain(1), Operation::delete(5)]);
  }

  #[test]
  fn push_moves_insert_before_delete() {
    let mut delta = Delta::new();
    delta.delete(2).insert("x");
    assert_eq!(delta.ops(), &[Operation::insert("x"), Operation::delete(2)]);

    // ... and fuses it with a compatible insert in front of the delete.
    let mut delta = Delta::new();
    delta.insert("a").delete(2).insert("b");
    assert_eq!(delta.ops(), &[Operation::insert("ab"), Operation::delete(2)]);

    // Formatted inserts move too.
    let mut delta = Delta::new();
    delta.retain(1).delete(1).insert_with("c", bold());
    assert_eq!(delta.ops(), &[
      Operation::retain(1),
      Operation::insert_with("c", bold()),
      Operation::delete(1),
    ]);
  }

  #[test]
  fn push_merges_only_equal_attributes() {
    let mut delta = Delta::new();
    delta.insert_with("A", bold()).insert("B").insert_with("C", bold());
    assert_eq!(delta.ops().len(), 3);

    delta.insert_with("D", bold());
    assert_eq!(delta.ops(), &[
      Operation::insert_with("A", bold()),
      Operation::insert("B"),
      Operation::insert_with("CD", bold()),
    ]);

    let mut delta = Delta::new();
    delta
      .retain_with(2, bold())
      .retain_with(3, bold())
      .retain(1);
    assert_eq!(delta.ops(), &[
      Operation::retain_with(5, bold()),
      Operation::retain(1),
    ]);
  }

  #[test]
  fn push_policy_controls_fusing() {
    struct NeverEqual;

    impl AttributePolicy for NeverEqual {
      fn equal(&self, _: Option<&AttributeMap>, _: Option<&AttributeMap>) -> bool {
        false
      }

      fn compose(
        &self,
        a: Option<&AttributeMap>,
        b: Option<&AttributeMap>,
        keep_null: bool,
      ) -> Option<AttributeMap> {
        StandardPolicy.compose(a, b, keep_null)
      }

      fn invert(
        &self,
        attrs: Option<&AttributeMap>,
        base: Option<&AttributeMap>,
      ) -> Option<AttributeMap> {
        StandardPolicy.invert(attrs, base)
      }

      fn hash(&self, attrs: Option<&AttributeMap>) -> u64 {
        StandardPolicy.hash(attrs)
      }
    }

    let mut delta = Delta::new();
    delta.push_with(Operation::insert("a"), &NeverEqual);
    delta.push_with(Operation::insert("b"), &NeverEqual);
    delta.push_with(Operation::delete(1), &NeverEqual);
    delta.push_with(Operation::delete(1), &NeverEqual);
    assert_eq!(delta.ops(), &[
      Operation::insert("a"),
      Operation::insert("b"),
      Operation::delete(2),
    ]);
  }

  #[test]
  fn raw_string_tracks_appends() {
    let mut delta = Delta::new();
    delta.insert("Hello").retain(3).delete(2);
    assert_eq!(delta.raw_string(), "Hello");

    delta.insert(" World");
    assert_eq!(delta.raw_string(), "Hello World");
  }

  #[test]
  fn lengths() {
    let delta = delta(vec![
      Operation::retain(2),
      Operation::insert("世界"),
      Operation::delete(3),
    ]);
    assert_eq!(delta.len(), 7);
    assert_eq!(delta.base_len(), 5);
    assert_eq!(delta.target_len(), 4);
    assert!(!delta.is_document());
    assert!(Delta::document("x").is_document());
  }

  #[test]
  fn chop_only_plain_trailing_retain() {
    let mut delta = delta(vec![Operation::insert("a"), Operation::retain(3)]);
    delta.chop();
    assert_eq!(delta.ops(), &[Operation::insert("a")]);

    let mut delta = delta_with_formatted_tail();
    delta.chop();
    assert_eq!(delta, delta_with_formatted_tail());
  }

  fn delta_with_formatted_tail() -> Delta {
    delta(vec![Operation::insert("a"), Operation::retain_with(3, bold())])
  }

  #[test]
  fn slice_ranges() {
    let doc = delta(vec![
      Operation::insert_with("Hello", bold()),
      Operation::insert(" World"),
    ]);

    assert_eq!(doc.slice(3, Some(8)).unwrap().ops(), &[
      Operation::insert_with("lo", bold()),
      Operation::insert(" Wo"),
    ]);
    assert_eq!(doc.slice(6, None).unwrap(), Delta::document("World"));
    assert!(doc.slice(4, Some(4)).unwrap().is_empty());
    assert_eq!(doc.slice(0, None).unwrap(), doc);
  }

  #[test]
  fn slice_rejects_bad_ranges() {
    let doc = Delta::document("abc");
    assert!(matches!(
      doc.slice(2, Some(1)),
      Err(DeltaError::InvalidRange { start: 2, end: 1 })
    ));
    assert!(matches!(
      doc.slice(1, Some(4)),
      Err(DeltaError::RangeOutOfBounds {
        start: 1,
        end:   4,
        len:   3,
      })
    ));
  }

  #[test]
  fn compose_hello_world() {
    let doc = Delta::document("Hello World");
    let mut edit = Delta::new();
    edit.retain(6).insert("there ").delete(5).insert("Earth");

    let edited = doc.compose(&edit);
    assert_eq!(edited, Delta::document("Hello there Earth"));

    let undo = edit.invert(&doc).unwrap();
    assert_eq!(undo.ops(), &[
      Operation::retain(6),
      Operation::insert("World"),
      Operation::delete(11),
    ]);
    assert_eq!(edited.compose(&undo).raw_string(), "Hello World");
  }

  #[test]
  fn compose_insert_then_delete_cancels() {
    let mut a = Delta::new();
    a.insert("abc");
    let mut b = Delta::new();
    b.retain(1).delete(1);

    assert_eq!(a.compose(&b), Delta::document("ac"));
  }

  #[test]
  fn compose_retain_then_delete() {
    let mut a = Delta::new();
    a.retain_with(3, bold());
    let mut b = Delta::new();
    b.retain(1).delete(1);

    assert_eq!(a.compose(&b).ops(), &[
      Operation::retain_with(1, bold()),
      Operation::delete(1),
      Operation::retain_with(1, bold()),
    ]);
  }

  #[test]
  fn compose_delete_passes_through() {
    let mut a = Delta::new();
    a.delete(2);
    let mut b = Delta::new();
    b.insert("x");

    assert_eq!(a.compose(&b).ops(), &[
      Operation::insert("x"),
      Operation::delete(2),
    ]);

    // Positions in `other` start after what `self` deleted.
    let mut b = Delta::new();
    b.retain(1).insert("x");

    assert_eq!(a.compose(&b).ops(), &[
      Operation::delete(2),
      Operation::retain(1),
      Operation::insert("x"),
    ]);
  }

  #[test]
  fn compose_formats_inserted_text() {
    let mut a = Delta::new();
    a.insert("ab");
    let mut b = Delta::new();
    b.retain_with(1, bold());

    assert_eq!(a.compose(&b).ops(), &[
      Operation::insert_with("a", bold()),
      Operation::insert("b"),
    ]);

    // Removing a format from inserted text leaves no null behind, but a
    // retain keeps the null so it can reach the document.
    let unbold = AttributeMap::new().with("bold", AttributeValue::Null);
    let mut c = Delta::new();
    c.retain_with(1, unbold.clone());

    assert_eq!(a.compose(&b).compose(&c), Delta::document("ab"));
    assert_eq!(b.compose(&c).ops(), &[Operation::retain_with(1, unbold)]);
  }

  #[test]
  fn compose_leading_retain_keeps_inserts() {
    let mut a = Delta::new();
    a.insert("ab").retain(2);
    let mut b = Delta::new();
    b.retain(3).delete(1);

    assert_eq!(a.compose(&b).ops(), &[
      Operation::insert("ab"),
      Operation::retain(1),
      Operation::delete(1),
    ]);
  }

  #[test]
  fn compose_with_empty() {
    let a = Delta::document("abc");
    assert_eq!(a.compose(&Delta::new()), a);
    assert_eq!(Delta::new().compose(&a), a);
  }

  #[test]
  fn compose_utf8() {
    const TEST_CASE: &str = "Hello, これはデルタです！";

    let doc = Delta::document(TEST_CASE);
    let mut edit = Delta::new();
    edit.retain(7).delete(3).insert("あれ");

    assert_eq!(doc.compose(&edit).raw_string(), "Hello, あれデルタです！");
  }

  #[test]
  fn invert_restores_formatting() {
    let doc = delta(vec![
      Operation::insert_with("ab", bold()),
      Operation::insert("cd"),
    ]);
    let italic = AttributeMap::new().with("italic", true);
    let mut edit = Delta::new();
    edit
      .retain(1)
      .retain_with(2, italic)
      .retain_with(1, AttributeMap::new().with("bold", AttributeValue::Null));

    let undo = edit.invert(&doc).unwrap();
    let unitalic = AttributeMap::new().with("italic", AttributeValue::Null);
    assert_eq!(undo.ops(), &[
      Operation::retain(1),
      Operation::retain_with(2, unitalic),
      Operation::retain_with(1, AttributeMap::new().with("bold", AttributeValue::Null)),
    ]);
    assert_eq!(doc.compose(&edit).compose(&undo), doc);
  }

  #[test]
  fn invert_deleted_formatted_text() {
    let doc = delta(vec![
      Operation::insert("a"),
      Operation::insert_with("bc", bold()),
    ]);
    let mut edit = Delta::new();
    edit.retain(1).delete(2);

    let undo = edit.invert(&doc).unwrap();
    assert_eq!(undo.ops(), &[
      Operation::retain(1),
      Operation::insert_with("bc", bold()),
    ]);
  }

  #[test]
  fn invert_past_base_fails() {
    let mut edit = Delta::new();
    edit.retain(2).delete(5);
    assert!(matches!(
      edit.invert(&Delta::document("abc")),
      Err(DeltaError::RangeOutOfBounds { .. })
    ));
  }

  #[test]
  fn add_operator_does_not_fuse() {
    let a = Delta::document("ab");
    let b = Delta::document("cd");

    assert_eq!((a.clone() + b.clone()).ops(), &[
      Operation::insert("ab"),
      Operation::insert("cd"),
    ]);
    assert_eq!(a.concat(&b), Delta::document("abcd"));
    assert_eq!((a + b).raw_string(), "abcd");
  }

  #[test]
  fn oversized_lengths_never_overflow() {
    // Past the end sentinel: dropped.
    let delta = Delta::from_json(r#"[{"delete":18446744073709551615},{"delete":1}]"#).unwrap();
    assert_eq!(delta.ops(), &[Operation::delete(1)]);

    // Each fits, their sum does not: the second is dropped.
    let big = INFINITE_LEN - 1;
    let json = format!(r#"[{{"delete":{big}}},{{"delete":{big}}},{{"retain":{big}}}]"#);
    let delta = Delta::from_json(&json).unwrap();
    assert_eq!(delta.ops(), &[Operation::delete(big)]);
    assert_eq!(delta.len(), big);

    // Built by hand, such operations stay separate instead of wrapping.
    let mut delta = Delta::new();
    delta.delete(big).delete(big).retain(big).retain(big);
    assert_eq!(delta.ops(), &[
      Operation::delete(big),
      Operation::delete(big),
      Operation::retain(big),
      Operation::retain(big),
    ]);
    assert_eq!(delta.len(), big.saturating_mul(4));
    assert_eq!(delta.base_len(), big.saturating_mul(4));
    assert!(matches!(
      delta.invert(&Delta::document("abc")),
      Err(DeltaError::RangeOutOfBounds { .. })
    ));
  }

  #[test]
  fn concat_normalizes_across_the_seam() {
    let mut a = Delta::new();
    a.retain(1).delete(2);
    let mut b = Delta::new();
    b.insert("x").delete(3);

    assert_eq!(a.concat(&b).ops(), &[
      Operation::retain(1),
      Operation::insert("x"),
      Operation::delete(5),
    ]);
    assert_eq!(a.concat(&b).raw_string(), "x");
  }

  #[test]
  fn json_round_trip() {
    let json = r#"[{"retain":3,"attributes":{"bold":true}},{"delete":2}]"#;
    let delta = Delta::from_json(json).unwrap();
    assert_eq!(delta.ops(), &[
      Operation::retain_with(3, bold()),
      Operation::delete(2),
    ]);
    assert_eq!(delta.to_json().unwrap(), json);
    assert_eq!(Delta::from_json(&delta.to_json().unwrap()).unwrap(), delta);
  }

  #[test]
  fn json_skips_malformed_records() {
    let delta = Delta::from_json(
      r#"[{"insert":"a"},{"bogus":1},{"retain":-1},{"insert":"b"},{"delete":0}]"#,
    )
    .unwrap();
    assert_eq!(delta, Delta::document("ab"));

    assert!(matches!(
      Delta::from_json(r#"{"insert":"a"}"#),
      Err(DeltaError::Json(_))
    ));
  }

  #[test]
  fn display_is_json() {
    let mut delta = Delta::new();
    delta.insert("x").delete(1);
    assert_eq!(delta.to_string(), r#"[{"insert":"x"},{"delete":1}]"#);
  }

  quickcheck! {
    fn compose_is_associative(
      doc: String,
      a: Vec<(u8, u8, bool)>,
      b: Vec<(u8, u8, bool)>,
      c: Vec<(u8, u8, bool)>
    ) -> bool {
      let doc = Delta::document(doc);
      let a = edit(doc.len(), &a);
      let b = edit(doc.compose(&a).len(), &b);
      let c = edit(doc.compose(&a).compose(&b).len(), &c);

      let left = a.compose(&b).compose(&c);
      let right = a.compose(&b.compose(&c));
      left == right && doc.compose(&left) == doc.compose(&right)
    }

    fn plain_retain_is_right_identity(script: Vec<(u8, u8, bool)>) -> bool {
      let mut a = edit(64, &script);
      let mut identity = Delta::new();
      identity.retain(a.target_len());

      let composed = a.compose(&identity);
      a.chop();
      composed == a
    }

    fn invert_undoes_edit(doc: String, script: Vec<(u8, u8, bool)>) -> bool {
      let doc = Delta::document(doc);
      let edit = edit(doc.len(), &script);
      let undo = edit.invert(&doc).unwrap();

      doc.compose(&edit).compose(&undo) == doc
    }

    fn slice_is_idempotent(script: Vec<(u8, u8, bool)>, a: usize, b: usize) -> TestResult {
      let delta = edit(32, &script);
      let len = delta.len();
      if len == 0 {
        return TestResult::discard();
      }
      let (start, end) = (a % len, b % len);
      let (start, end) = (start.min(end), start.max(end));

      let sliced = delta.slice(start, Some(end)).unwrap();
      TestResult::from_bool(sliced.slice(0, Some(end - start)).unwrap() == sliced)
    }

    fn json_preserves_delta(script: Vec<(u8, u8, bool)>) -> bool {
      let delta = edit(32, &script);
      Delta::from_json(&delta.to_json().unwrap()).unwrap() == delta
    }
  }
}
