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
  let edit = edit_from_bytes(&mut cursor, doc.len());

  let edited = doc.compose(&edit);
  assert!(edited.is_document());

  let undo = edit.invert(&doc).expect("edit fits the document");
  assert_eq!(edited.compose(&undo), doc);
});
