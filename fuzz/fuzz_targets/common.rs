use the_delta::{
  AttributeMap,
  AttributeValue,
  Delta,
  Operation,
};

const MAX_INITIAL_BYTES: usize = 4 * 1024;
const MAX_OPS: usize = 64;
const MAX_INSERT_BYTES: usize = 64;

const KEYS: &[&str] = &["bold", "italic", "color"];

/// Build a document from the next bytes. Documents never carry null
/// attribute values.
pub fn document_from_bytes(cursor: &mut ByteCursor) -> Delta {
  let len = cursor.next_usize(MAX_INITIAL_BYTES);
  let text = lossy_text(cursor.next_bytes(len));
  let mut doc = Delta::new();
  for (index, chunk) in text.split_inclusive(' ').enumerate() {
    doc.push(Operation::insert_with(chunk, attributes(cursor.next_u8() & !0b01_01_01, index)));
  }
  doc
}

/// Build an edit that applies to a document of `base_len` chars. Retains may
/// format, inserts may carry attributes, deletes never run past the end.
pub fn edit_from_bytes(cursor: &mut ByteCursor, base_len: usize) -> Delta {
  let mut edit = Delta::new();
  let mut pos = 0;
  for index in 0..cursor.next_usize(MAX_OPS) {
    let tag = cursor.next_u8();
    let remaining = base_len - pos;
    match tag % 3 {
      0 => {
        let len = cursor.next_u16() as usize % (remaining + 1);
        edit.push(Operation::retain_with(len, attributes(cursor.next_u8(), index)));
        pos += len;
      },
      1 => {
        let len = cursor.next_usize(MAX_INSERT_BYTES);
        let text = lossy_text(cursor.next_bytes(len));
        edit.push(Operation::insert_with(text, attributes(cursor.next_u8(), index)));
      },
      _ => {
        let len = cursor.next_u16() as usize % (remaining + 1);
        edit.delete(len);
        pos += len;
      },
    }
  }
  edit
}

fn attributes(bits: u8, salt: usize) -> Option<AttributeMap> {
  let mut map = AttributeMap::new();
  for (i, key) in KEYS.iter().enumerate() {
    match (bits >> (2 * i)) & 0b11 {
      0 => {},
      1 => {
        map.insert(*key, AttributeValue::Null);
      },
      2 => {
        map.insert(*key, true);
      },
      _ => {
        map.insert(*key, (salt % 4) as u64);
      },
    }
  }
  map.into_option()
}

fn lossy_text(bytes: &[u8]) -> String {
  String::from_utf8_lossy(bytes).into_owned()
}

pub struct ByteCursor<'a> {
  data: &'a [u8],
  pos:  usize,
}

impl<'a> ByteCursor<'a> {
  pub fn new(data: &'a [u8]) -> Self {
    Self { data, pos: 0 }
  }

  pub fn next_u8(&mut self) -> u8 {
    let value = self.data.get(self.pos).copied().unwrap_or(0);
    self.pos = self.pos.saturating_add(1);
    value
  }

  pub fn next_u16(&mut self) -> u16 {
    let lo = self.next_u8() as u16;
    let hi = self.next_u8() as u16;
    lo | (hi << 8)
  }

  pub fn next_usize(&mut self, max: usize) -> usize {
    if max == 0 {
      return 0;
    }
    (self.next_u16() as usize) % (max + 1)
  }

  pub fn next_bytes(&mut self, len: usize) -> &'a [u8] {
    let start = self.pos.min(self.data.len());
    let end = start.saturating_add(len).min(self.data.len());
    self.pos = self.pos.saturating_add(len);
    &self.data[start..end]
  }
}
