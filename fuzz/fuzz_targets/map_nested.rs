#![no_main]

use std::collections::BTreeMap;

wirebin::fuzz_resolve_roundtrip!(BTreeMap<String, Vec<i16>>);
