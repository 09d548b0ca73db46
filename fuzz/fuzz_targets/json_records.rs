#![no_main]

use libfuzzer_sys::fuzz_target;
use the_delta::Delta;

fuzz_target!(|data: &[u8]| {
  let Ok(source) = std::str::from_utf8(data) else {
    return;
  };
  let Ok(delta) = Delta::from_json(source) else {
    return;
  };

  let json = delta.to_json().expect("delta serializes");
  let reparsed = Delta::from_json(&json).expect("own output parses");
  assert_eq!(reparsed, delta);
});
