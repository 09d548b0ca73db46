//! Forward-only reader over a slice of operations.
//!
//! [`OpCursor`] lets callers consume operations in chunks of their choosing,
//! splitting the underlying operations as needed. `slice`, `compose` and
//! `invert` are all written in terms of it.

use std::iter::once;

use crate::{
  Tendril,
  operation::{
    OpKind,
    Operation,
  },
};

/// Remaining length reported by an exhausted cursor, so that callers can
/// `min` against it without special-casing the end.
#[cfg(target_pointer_width = "64")]
pub const INFINITE_LEN: usize = (1 << 53) - 1;
#[cfg(not(target_pointer_width = "64"))]
pub const INFINITE_LEN: usize = usize::MAX;

/// Position within `ops`: the operation at `index`, of which `offset` chars
/// (`byte_offset` bytes, for inserts) were already handed out and
/// `remaining` chars are left.
#[derive(Debug, Clone)]
pub struct OpCursor<'a> {
  ops:         &'a [Operation],
  index:       usize,
  offset:      usize,
  byte_offset: usize,
  remaining:   usize,
}

impl<'a> OpCursor<'a> {
  pub fn new(ops: &'a [Operation]) -> Self {
    Self {
      ops,
      index: 0,
      offset: 0,
      byte_offset: 0,
      remaining: ops.first().map_or(INFINITE_LEN, Operation::len),
    }
  }

  pub fn has_next(&self) -> bool {
    self.index < self.ops.len()
  }

  /// The current operation as stored, ignoring how much of it was consumed.
  pub fn peek(&self) -> Option<&'a Operation> {
    self.ops.get(self.index)
  }

  pub fn peek_kind(&self) -> Option<OpKind> {
    self.peek().map(Operation::kind)
  }

  /// Chars left in the current operation, or [`INFINITE_LEN`] once
  /// exhausted.
  pub fn peek_remaining(&self) -> usize {
    self.remaining
  }

  /// Take up to `len` chars of the current operation.
  ///
  /// The result has the current operation's kind and attributes and a
  /// length of `min(len, self.peek_remaining())`. A request that reaches
  /// the end of the current operation moves on to the next one.
  ///
  /// An exhausted cursor behaves as if followed by an endless plain retain:
  /// it returns `Retain(len)`. Callers must therefore bound `len` (or check
  /// [`OpCursor::has_next`]) once the cursor may be exhausted.
  pub fn consume(&mut self, len: usize) -> Operation {
    let Some(op) = self.ops.get(self.index) else {
      return Operation::retain(len.min(INFINITE_LEN));
    };

    let len = len.min(self.remaining);
    let consumed = match op {
      Operation::Delete(_) => Operation::Delete(len),
      Operation::Retain { attributes, .. } => {
        Operation::Retain {
          len,
          attributes: attributes.clone(),
        }
      },
      Operation::Insert { text, attributes } => {
        let rest = &text.as_str()[self.byte_offset..];
        let bytes = rest.char_indices().nth(len).map_or(rest.len(), |(pos, _)| pos);
        self.byte_offset += bytes;
        Operation::Insert {
          text:       Tendril::from(&rest[..bytes]),
          attributes: attributes.clone(),
        }
      },
    };

    if len == self.remaining {
      self.advance();
    } else {
      self.offset += len;
      self.remaining -= len;
    }
    consumed
  }

  /// Take whatever is left of the current operation.
  pub fn consume_rest(&mut self) -> Operation {
    self.consume(INFINITE_LEN)
  }

  /// Everything not yet consumed, including the unconsumed tail of the
  /// current operation. The cursor itself does not move.
  pub fn remainder(&self) -> Vec<Operation> {
    if !self.has_next() {
      return Vec::new();
    }
    if self.offset == 0 {
      return self.ops[self.index..].to_vec();
    }

    let mut rest = self.clone();
    let head = rest.consume_rest();
    once(head)
      .chain(rest.ops[rest.index..].iter().cloned())
      .collect()
  }

  fn advance(&mut self) {
    self.index += 1;
    self.offset = 0;
    self.byte_offset = 0;
    self.remaining = self.peek().map_or(INFINITE_LEN, Operation::len);
  }
}
