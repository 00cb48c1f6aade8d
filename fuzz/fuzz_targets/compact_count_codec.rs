#![no_main]

use compact_count::{decode_from_slice, encode_to_array, len_of_encoding, CompactCount};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|count: CompactCount| {
    let n = count.get();
    let (bytes, width) = encode_to_array(n).unwrap();
    assert_eq!(width, len_of_encoding(n));
    assert_eq!(Ok((n, width)), decode_from_slice(&bytes[..width]));

    let mut long = [0; compact_count::LONG_WIDTH];
    compact_count::encode_long_into(n, &mut long).unwrap();
    assert_eq!(Ok((n, compact_count::LONG_WIDTH)), decode_from_slice(&long));
});
