#![no_main]

mod common;

use libfuzzer_sys::fuzz_target;

use crate::common::{
  ByteCursor,
  document_from_bytes,
  edit_from_bytes,
};

fuzz_target!(|data: &[u8]| {
  let mut cursor = ByteCursor::new(data);
  let doc = document_from_bytes(&mut cursor);
  let a = edit_from_bytes(&mut cursor, doc.len());
  let b = edit_from_bytes(&mut cursor, doc.compose(&a).len());

  let left = doc.compose(&a).compose(&b);
  let right = doc.compose(&a.compose(&b));
  assert_eq!(left, right);
});
