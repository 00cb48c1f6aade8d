#![no_main]

wirebin::fuzz_resolve_roundtrip!(wirebin_fuzz::Sample);
