//! Assertions that every [`Converter`] must satisfy, for use in unit tests, property tests, and fuzz targets.

use core::fmt::Debug;

use crate::allocator::Allocator;
use crate::converter::Converter;
use crate::options::{AllocatorOptions, AnchorPolicy};

/// Appended after Auto and WithLengthPrefix encodings, to check that decoding stops where the value ends.
const TRAILER: &[u8] = &[0xde, 0xad, 0xbe, 0xef, 0x80];

const POLICIES: [AnchorPolicy; 2] = [AnchorPolicy::Reducing, AnchorPolicy::Pessimistic];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Direct,
    Auto,
    WithLengthPrefix,
}

const MODES: [Mode; 3] = [Mode::Direct, Mode::Auto, Mode::WithLengthPrefix];

fn encode_in<T, C>(converter: &C, value: &T, mode: Mode, options: &AllocatorOptions) -> Vec<u8>
where
    T: Debug,
    C: Converter<T> + ?Sized,
{
    let mut allocator = Allocator::with_options(options);
    let result = match mode {
        Mode::Direct => converter.encode(&mut allocator, value),
        Mode::Auto => converter.encode_auto(&mut allocator, value),
        Mode::WithLengthPrefix => converter.encode_with_length_prefix(&mut allocator, value),
    };
    if let Err(err) = result {
        panic!("Failed to encode in {mode:?} mode.\n\nValue: {value:?}\n\nOptions: {options:?}\n\nError: {err:?}");
    }

    match allocator.into_bytes() {
        Ok(bytes) => bytes.to_vec(),
        Err(err) => panic!("Encoding in {mode:?} mode left anchors open.\n\nValue: {value:?}\n\nError: {err:?}"),
    }
}

/// Encoding and then decoding `value` yields `value` again, in every framing mode and under every anchor policy.
///
/// Auto and WithLengthPrefix decoding must additionally consume exactly the bytes that were written, leaving anything after them untouched. Constant-width converters must produce exactly [`length`](Converter::length) bytes in Direct and Auto mode.
pub fn assert_roundtrip_all_modes<T, C>(converter: &C, value: &T)
where
    T: Debug + PartialEq,
    C: Converter<T> + ?Sized,
{
    for policy in POLICIES {
        let options = AllocatorOptions::default().with_anchor_policy(policy);

        for mode in MODES {
            let encoded = encode_in(converter, value, mode, &options);

            let length = converter.length();
            if length > 0 && mode != Mode::WithLengthPrefix && encoded.len() != length {
                panic!("A constant-width converter produced an encoding of the wrong width.\n\nValue: {value:?}\n\nMode: {mode:?}\n\nDeclared width: {length}\n\nEncoding: {encoded:?}");
            }

            let decoded = match mode {
                Mode::Direct => converter.decode(&encoded),
                Mode::Auto | Mode::WithLengthPrefix => {
                    let mut followed = encoded.clone();
                    followed.extend_from_slice(TRAILER);
                    let mut cursor = &followed[..];
                    let decoded = if mode == Mode::Auto {
                        converter.decode_auto(&mut cursor)
                    } else {
                        converter.decode_with_length_prefix(&mut cursor)
                    };
                    if decoded.is_ok() && cursor != TRAILER {
                        panic!("Decoding in {mode:?} mode did not stop at the end of the value.\n\nValue: {value:?}\n\nEncoding: {encoded:?}\n\nLeft over: {cursor:?}");
                    }
                    decoded
                }
            };

            match decoded {
                Ok(decoded) if &decoded == value => {}
                Ok(decoded) => panic!("Decoding in {mode:?} mode produced a different value.\n\nValue: {value:?}\n\nDecoded: {decoded:?}\n\nEncoding: {encoded:?}\n\nPolicy: {policy:?}"),
                Err(err) => panic!("Failed to decode in {mode:?} mode.\n\nValue: {value:?}\n\nEncoding: {encoded:?}\n\nPolicy: {policy:?}\n\nError: {err:?}"),
            }
        }
    }
}

/// Two Auto encodings written back to back can be read back one after the other.
pub fn assert_auto_is_self_delimiting<T, C>(converter: &C, value: &T)
where
    T: Debug + PartialEq,
    C: Converter<T> + ?Sized,
{
    let mut allocator = Allocator::new();
    for _ in 0..2 {
        if let Err(err) = converter.encode_auto(&mut allocator, value) {
            panic!("Failed to encode in Auto mode.\n\nValue: {value:?}\n\nError: {err:?}");
        }
    }
    let encoded = allocator.as_slice().to_vec();

    let mut cursor = &encoded[..];
    for round in 0..2 {
        match converter.decode_auto(&mut cursor) {
            Ok(decoded) if &decoded == value => {}
            Ok(decoded) => panic!("Auto decoding number {round} produced a different value.\n\nValue: {value:?}\n\nDecoded: {decoded:?}\n\nEncoding: {encoded:?}"),
            Err(err) => panic!("Auto decoding number {round} failed.\n\nValue: {value:?}\n\nEncoding: {encoded:?}\n\nError: {err:?}"),
        }
    }

    if !cursor.is_empty() {
        panic!("Auto decoding left bytes unconsumed.\n\nValue: {value:?}\n\nEncoding: {encoded:?}\n\nLeft over: {cursor:?}");
    }
}

/// The bytes produced in every mode do not depend on the initial capacity of the allocator.
pub fn assert_growth_independent<T, C>(converter: &C, value: &T)
where
    T: Debug,
    C: Converter<T> + ?Sized,
{
    let tiny = AllocatorOptions::default().with_initial_capacity(1);
    let huge = AllocatorOptions::default().with_initial_capacity(1 << 20);

    for mode in MODES {
        let small = encode_in(converter, value, mode, &tiny);
        let large = encode_in(converter, value, mode, &huge);
        assert_eq!(
            small, large,
            "Encoding in {mode:?} mode depends on the initial capacity.\n\nValue: {value:?}"
        );
    }
}

/// A macro for fuzz targets that check the converter a [`Generator`](crate::Generator) resolves for a type against every invariant of this module. Usage:
///
/// ```ignore
/// #![no_main]
///
/// wirebin::fuzz_resolve_roundtrip!(Vec<Option<String>>);
/// ```
///
/// Assumes that `libfuzzer_sys` is available and that the type implements `Arbitrary`.
#[macro_export]
macro_rules! fuzz_resolve_roundtrip {
    ($t:ty) => {
        use libfuzzer_sys::fuzz_target;

        fuzz_target!(|value: $t| {
            let generator = $crate::Generator::new();
            let converter = match generator.get::<$t>() {
                Ok(converter) => converter,
                Err(err) => panic!("Failed to build a converter: {err:?}"),
            };

            $crate::invariants::assert_roundtrip_all_modes(converter.as_ref(), &value);
            $crate::invariants::assert_auto_is_self_delimiting(converter.as_ref(), &value);
            $crate::invariants::assert_growth_independent(converter.as_ref(), &value);
        });
    };
}
