#![no_main]

wirebin::fuzz_resolve_roundtrip!(Vec<Option<String>>);
