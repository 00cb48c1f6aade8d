//! Byte-exact framing rules shared by all converters.

use std::collections::BTreeMap;

use wirebin::{
    Allocator, AllocatorOptions, AnchorPolicy, Converter, DecodeError, EncodeError, Error,
    Generator,
};

#[test]
fn count_prefix_widths() {
    for (count, width) in [(0, 1), (127, 1), (128, 4), (compact_count::MAX_COUNT, 4)] {
        let mut allocator = Allocator::new();
        allocator.append_count(count).unwrap();
        assert_eq!(width, allocator.len(), "count {count}");

        let mut cursor = allocator.as_slice();
        assert_eq!(count, compact_count::decode(&mut cursor).unwrap());
        assert!(cursor.is_empty());
    }

    let mut allocator = Allocator::new();
    assert_eq!(
        Err(EncodeError::CountTooLarge(compact_count::MAX_COUNT + 1)),
        allocator.append_count(compact_count::MAX_COUNT + 1)
    );
}

#[test]
fn constant_width_sequences_are_exact() {
    let generator = Generator::new();

    for count in [0usize, 1, 7, 300] {
        let items: Vec<u64> = (0..count as u64).map(|n| n * 0x0101_0101).collect();
        let bytes = generator.encode(&items).unwrap();
        assert_eq!(count * 8, bytes.len());
        assert_eq!(items, generator.decode::<Vec<u64>>(&bytes).unwrap());

        let mut longer = bytes.to_vec();
        longer.push(0);
        assert_eq!(
            Err(Error::Decode(DecodeError::NonExactFraming {
                length: count * 8 + 1,
                width: 8
            })),
            generator.decode::<Vec<u64>>(&longer)
        );
    }
}

#[test]
fn bool_sequences_use_the_element_loop() {
    let generator = Generator::new();
    let bytes = generator.encode(&vec![true, false, true]).unwrap();
    assert_eq!(&[1, 0, 1], &bytes[..]);
    assert_eq!(
        Err(Error::Decode(DecodeError::InvalidValue("bool"))),
        generator.decode::<Vec<bool>>(&[1, 2])
    );
}

#[test]
fn positional_last_field_is_one_prefix_shorter() {
    let generator = Generator::new();
    let first = "first".to_string();
    let last = "last".to_string();

    let positional = generator.encode(&(first.clone(), last.clone())).unwrap();

    let mut all_auto = Allocator::new();
    let converter = generator.get::<String>().unwrap();
    converter.encode_auto(&mut all_auto, &first).unwrap();
    converter.encode_auto(&mut all_auto, &last).unwrap();

    assert_eq!(all_auto.len(), positional.len() + 1);
    assert_eq!(&all_auto.as_slice()[..6], &positional[..6]);
}

#[test]
fn anchors_finish_in_lifo_order() {
    let mut allocator = Allocator::new();
    let outer = allocator.anchor().unwrap();
    allocator.append(b"a").unwrap();
    let inner = allocator.anchor().unwrap();
    allocator.append(b"bc").unwrap();

    assert_eq!(
        Err(EncodeError::AnchorOrder { depth: 0, open: 2 }),
        allocator.finish(outer)
    );
    assert_eq!(
        Err(EncodeError::UnfinishedAnchors(2)),
        allocator.split_bytes()
    );

    allocator.finish(inner).unwrap();
    let outer = allocator.anchor().unwrap();
    allocator.finish(outer).unwrap();
    assert_eq!(1, allocator.open_anchors());
}

#[test]
fn nested_anchors_under_both_policies() {
    for policy in [AnchorPolicy::Reducing, AnchorPolicy::Pessimistic] {
        let options = AllocatorOptions::default().with_anchor_policy(policy);
        let mut allocator = Allocator::with_options(&options);

        let outer = allocator.anchor().unwrap();
        allocator.append(b"a").unwrap();
        let inner = allocator.anchor().unwrap();
        allocator.append(&[7; 100]).unwrap();
        allocator.finish(inner).unwrap();
        allocator.finish(outer).unwrap();

        let bytes = allocator.into_bytes().unwrap();
        let mut cursor = &bytes[..];
        let outer_body = wirebin::take_prefixed(&mut cursor).unwrap();
        assert!(cursor.is_empty());
        assert_eq!(b'a', outer_body[0]);

        let mut cursor = &outer_body[1..];
        let inner_body = wirebin::take_prefixed(&mut cursor).unwrap();
        assert_eq!(&[7; 100][..], inner_body);

        let expected_len = match policy {
            AnchorPolicy::Reducing => 1 + 1 + 1 + 100,
            AnchorPolicy::Pessimistic => 4 + 1 + 4 + 100,
        };
        assert_eq!(expected_len, bytes.len());
    }
}

#[test]
fn reducing_shrinks_small_payloads() {
    let value: Vec<Option<u8>> = vec![Some(1), None];
    let reducing = Generator::new().encode(&value).unwrap();
    let pessimistic = Generator::with_options(
        AllocatorOptions::default().with_anchor_policy(AnchorPolicy::Pessimistic),
    )
    .encode(&value)
    .unwrap();

    assert_eq!(b"\x02\x01\x01\x01\x00", &reducing[..]);
    assert_eq!(
        b"\x82\x00\x00\x00\x01\x01\x81\x00\x00\x00\x00",
        &pessimistic[..]
    );

    let generator = Generator::new();
    assert_eq!(value, generator.decode::<Vec<Option<u8>>>(&reducing).unwrap());
    assert_eq!(
        value,
        generator.decode::<Vec<Option<u8>>>(&pessimistic).unwrap()
    );
}

#[test]
fn growth_does_not_change_the_encoding() {
    let value: BTreeMap<String, Vec<String>> = (0..50)
        .map(|n| (format!("key{n}"), vec!["v".repeat(n * 7); n % 4]))
        .collect();

    let tiny = Generator::with_options(AllocatorOptions::default().with_initial_capacity(1));
    let huge = Generator::with_options(AllocatorOptions::default().with_initial_capacity(1 << 20));

    let small = tiny.encode(&value).unwrap();
    let large = huge.encode(&value).unwrap();
    assert_eq!(small, large);
    assert_eq!(value, tiny.decode::<BTreeMap<String, Vec<String>>>(&small).unwrap());
}

#[test]
fn capacity_limit_is_enforced() {
    let generator = Generator::with_options(
        AllocatorOptions::default()
            .with_initial_capacity(0)
            .with_max_capacity(64),
    );
    assert!(generator.encode(&vec![0u8; 64]).is_ok());
    assert_eq!(
        Err(Error::Encode(EncodeError::CapacityExceeded {
            requested: 65,
            max: 64
        })),
        generator.encode(&vec![0u8; 65])
    );
}

#[test]
fn split_bytes_reuses_the_allocator() {
    let generator = Generator::new();
    let mut allocator = Allocator::new();

    generator.encode_with(&mut allocator, &"one".to_string()).unwrap();
    let first = allocator.split_bytes().unwrap();
    generator.encode_with(&mut allocator, &"two".to_string()).unwrap();
    let second = allocator.split_bytes().unwrap();

    assert_eq!(b"one", &first[..]);
    assert_eq!(b"two", &second[..]);
}
