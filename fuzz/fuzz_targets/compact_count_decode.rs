#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut cursor = data;
    match compact_count::decode(&mut cursor) {
        Ok(n) => {
            let consumed = data.len() - cursor.len();
            assert_eq!(Ok((n, consumed)), compact_count::decode_from_slice(data));
            assert!(n <= compact_count::MAX_COUNT);
            assert!(consumed == compact_count::SHORT_WIDTH || consumed == compact_count::LONG_WIDTH);
        }
        Err(err) => {
            assert_eq!(data, cursor);
            assert_eq!(Err(err), compact_count::decode_from_slice(data));
        }
    }
});
