#![no_main]

use libfuzzer_sys::fuzz_target;
use wirebin::AnchorPolicy;
use wirebin_fuzz::{replay_anchors, AnchorOp};

fuzz_target!(|data: (AnchorPolicy, u8, Vec<AnchorOp>)| {
    let (policy, initial_capacity, ops) = data;
    let (encoded, expected) = replay_anchors(policy, initial_capacity, &ops);
    assert_eq!(expected, encoded);
});
