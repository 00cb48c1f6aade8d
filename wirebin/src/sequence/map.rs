use core::marker::PhantomData;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use crate::allocator::Allocator;
use crate::converter::Converter;
use crate::error::{DecodeError, EncodeError, GeneratorError};
use crate::generator::{Generator, Resolve};

use super::{exact_count, MemoryBuffer};

/// Converts a dictionary as a sequence of `(key, value)` pairs, each side Auto-framed.
///
/// When both keys and values are constant-width, every pair occupies exactly the sum of both widths, and a payload that is not a multiple of it fails with [`DecodeError::NonExactFraming`].
///
/// ```
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use wirebin::{Allocator, Converter, LittleEndianConverter, MapConverter, StringConverter};
///
/// let converter = MapConverter::<BTreeMap<String, u8>, String, u8>::new(
///     Arc::new(StringConverter),
///     Arc::new(LittleEndianConverter::<u8>::new()),
/// );
///
/// let map = BTreeMap::from([("a".to_string(), 1), ("bc".to_string(), 2)]);
/// let mut allocator = Allocator::new();
/// converter.encode(&mut allocator, &map)?;
/// assert_eq!(b"\x01a\x01\x02bc\x02", allocator.as_slice());
/// assert_eq!(map, converter.decode(allocator.as_slice()).unwrap());
/// # Ok::<(), wirebin::EncodeError>(())
/// ```
pub struct MapConverter<M, K, V> {
    key: Arc<dyn Converter<K>>,
    value: Arc<dyn Converter<V>>,
    pair_width: Option<usize>,
    phantom: PhantomData<fn() -> M>,
}

impl<M, K, V> MapConverter<M, K, V> {
    /// Creates a converter from the key and value converters.
    pub fn new(key: Arc<dyn Converter<K>>, value: Arc<dyn Converter<V>>) -> Self {
        let pair_width = match (key.length(), value.length()) {
            (0, _) | (_, 0) => None,
            (key_width, value_width) => key_width.checked_add(value_width),
        };

        MapConverter {
            key,
            value,
            pair_width,
            phantom: PhantomData,
        }
    }

    /// The width of one pair, if both sides are constant-width.
    pub fn pair_width(&self) -> Option<usize> {
        self.pair_width
    }
}

impl<M, K, V> Converter<M> for MapConverter<M, K, V>
where
    M: FromIterator<(K, V)>,
    for<'a> &'a M: IntoIterator<Item = (&'a K, &'a V)>,
{
    fn length(&self) -> usize {
        0
    }

    fn encode(&self, allocator: &mut Allocator, item: &M) -> Result<(), EncodeError> {
        for (key, value) in item {
            self.key.encode_auto(allocator, key)?;
            self.value.encode_auto(allocator, value)?;
        }

        Ok(())
    }

    fn decode(&self, span: &[u8]) -> Result<M, DecodeError> {
        if let Some(width) = self.pair_width {
            exact_count(span.len(), width)?;
        }

        let mut pairs = MemoryBuffer::new();
        let mut cursor = span;
        while !cursor.is_empty() {
            let key = self.key.decode_auto(&mut cursor)?;
            let value = self.value.decode_auto(&mut cursor)?;
            pairs.push((key, value))?;
        }

        Ok(pairs.into_vec().into_iter().collect())
    }
}

impl<K, V> Resolve for HashMap<K, V>
where
    K: Resolve + Eq + Hash,
    V: Resolve,
{
    fn resolve(generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        Ok(Arc::new(MapConverter::<Self, K, V>::new(
            generator.get::<K>()?,
            generator.get::<V>()?,
        )))
    }
}

impl<K, V> Resolve for BTreeMap<K, V>
where
    K: Resolve + Ord,
    V: Resolve,
{
    fn resolve(generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        Ok(Arc::new(MapConverter::<Self, K, V>::new(
            generator.get::<K>()?,
            generator.get::<V>()?,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::{assert_auto_is_self_delimiting, assert_roundtrip_all_modes};
    use crate::primitives::LittleEndianConverter;
    use crate::text::StringConverter;

    #[test]
    fn constant_pairs_are_exact() {
        let converter = MapConverter::<HashMap<u16, u32>, u16, u32>::new(
            Arc::new(LittleEndianConverter::<u16>::new()),
            Arc::new(LittleEndianConverter::<u32>::new()),
        );
        assert_eq!(Some(6), converter.pair_width());

        let map: HashMap<u16, u32> = (0..4).map(|n| (n, u32::from(n) * 1000)).collect();
        let mut allocator = Allocator::new();
        converter.encode(&mut allocator, &map).unwrap();
        assert_eq!(24, allocator.len());

        let mut bytes = allocator.as_slice().to_vec();
        assert_eq!(map, converter.decode(&bytes).unwrap());

        bytes.push(0);
        assert_eq!(
            Err(DecodeError::NonExactFraming {
                length: 25,
                width: 6
            }),
            converter.decode(&bytes)
        );
    }

    #[test]
    fn variable_pairs_roundtrip() {
        let converter = MapConverter::<BTreeMap<String, String>, String, String>::new(
            Arc::new(StringConverter),
            Arc::new(StringConverter),
        );
        let map = BTreeMap::from([
            (String::new(), "empty".to_string()),
            ("key".to_string(), "x".repeat(200)),
        ]);

        assert_eq!(None, converter.pair_width());
        assert_roundtrip_all_modes(&converter, &map);
        assert_auto_is_self_delimiting(&converter, &map);
    }

    #[test]
    fn truncated_pair_fails() {
        let converter = MapConverter::<BTreeMap<String, u8>, String, u8>::new(
            Arc::new(StringConverter),
            Arc::new(LittleEndianConverter::<u8>::new()),
        );
        assert_eq!(
            Err(DecodeError::NotEnoughBytes {
                needed: 1,
                available: 0
            }),
            converter.decode(b"\x01a")
        );
    }
}
