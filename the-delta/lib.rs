//! Rich-text change algebra.
//!
//! A [`Delta`] is an ordered list of [`Operation`]s (insert / retain /
//! delete, optionally carrying formatting [`AttributeMap`]s). A delta made of
//! inserts only describes a whole document; any other delta describes an edit
//! against one. Deltas can be composed, inverted against the document they
//! were applied to, and sliced.
//!
//! ```ignore
//! use the_delta::Delta;
//!
//! let doc = Delta::document("Hello World");
//! let mut edit = Delta::new();
//! edit.retain(6).insert("there ").delete(5).insert("Earth");
//!
//! let edited = doc.compose(&edit);
//! assert_eq!(edited.raw_string(), "Hello there Earth");
//!
//! let undo = edit.invert(&doc)?;
//! assert_eq!(edited.compose(&undo), doc);
//! ```

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod attributes;
pub mod cursor;
pub mod delta;
pub mod operation;

pub use attributes::{
  AttributeMap,
  AttributePolicy,
  AttributeValue,
  StandardPolicy,
};
pub use cursor::{
  INFINITE_LEN,
  OpCursor,
};
pub use delta::{
  Delta,
  DeltaError,
  Result,
};
pub use operation::{
  OpKind,
  Operation,
};

pub type Tendril = SmartString<LazyCompact>;
