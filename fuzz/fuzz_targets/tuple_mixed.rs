#![no_main]

wirebin::fuzz_resolve_roundtrip!((bool, String, u128, Option<char>, Vec<String>));
