//! Resolving and caching converters per type.

use core::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use tracing::debug;

use crate::allocator::Allocator;
use crate::converter::Converter;
use crate::error::{Error, GeneratorError};
use crate::options::AllocatorOptions;
use crate::sequence::NativeCopy;

/// A type whose converter can be built by a [`Generator`].
///
/// Implementations exist for numbers, `bool`, `char`, `String`, [`Bytes`], `Option`, tuples of up to eight elements, and the standard sequence, set, and map collections. Keyed records implement it through [`resolve_keyed`](crate::record::resolve_keyed).
pub trait Resolve: Sized + 'static {
    /// Builds the converter for `Self`, obtaining the converters of constituent types from `generator`.
    fn resolve(generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError>;

    /// Bulk-copy routines for sequences of `Self`, if its encoding equals its in-memory layout.
    fn native_copy() -> Option<NativeCopy<Self>> {
        None
    }
}

thread_local! {
    static RESOLVING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// Marks a type as being resolved on the current thread until dropped.
struct ResolvingGuard;

impl ResolvingGuard {
    fn enter<T: 'static>() -> Result<Self, GeneratorError> {
        RESOLVING.with(|resolving| {
            let mut resolving = resolving.borrow_mut();
            let id = TypeId::of::<T>();
            if resolving.contains(&id) {
                return Err(GeneratorError::Recursive(core::any::type_name::<T>()));
            }
            resolving.push(id);
            Ok(ResolvingGuard)
        })
    }
}

impl Drop for ResolvingGuard {
    fn drop(&mut self) {
        RESOLVING.with(|resolving| {
            resolving.borrow_mut().pop();
        });
    }
}

/// A registry of converters, built on first use and shared afterwards.
///
/// ```
/// use std::collections::BTreeMap;
/// use wirebin::Generator;
///
/// let generator = Generator::new();
/// let value: BTreeMap<String, Vec<u32>> = BTreeMap::from([("primes".to_string(), vec![2, 3, 5])]);
///
/// let bytes = generator.encode(&value)?;
/// assert_eq!(b"\x06primes\x0c\x02\x00\x00\x00\x03\x00\x00\x00\x05\x00\x00\x00", &bytes[..]);
/// assert_eq!(value, generator.decode::<BTreeMap<String, Vec<u32>>>(&bytes)?);
/// # Ok::<(), wirebin::Error>(())
/// ```
pub struct Generator {
    converters: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    options: AllocatorOptions,
}

impl Default for Generator {
    fn default() -> Self {
        Generator::new()
    }
}

impl core::fmt::Debug for Generator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let cached = self
            .converters
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len();
        f.debug_struct("Generator")
            .field("cached", &cached)
            .field("options", &self.options)
            .finish()
    }
}

impl Generator {
    /// Creates a generator whose [`encode`](Generator::encode) uses default allocator options.
    pub fn new() -> Self {
        Generator::with_options(AllocatorOptions::default())
    }

    /// Creates a generator whose [`encode`](Generator::encode) uses the given allocator options.
    pub fn with_options(options: AllocatorOptions) -> Self {
        Generator {
            converters: RwLock::new(HashMap::new()),
            options,
        }
    }

    /// The allocator options used by [`encode`](Generator::encode).
    pub fn options(&self) -> &AllocatorOptions {
        &self.options
    }

    /// Uses `converter` for `T` from now on, replacing any cached converter. Converters that were already built from the previous one keep using it.
    pub fn register<T: 'static>(&self, converter: Arc<dyn Converter<T>>) {
        self.converters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(TypeId::of::<T>(), Box::new(converter));
    }

    /// The cached converter for `T`, if one was registered or built before.
    pub fn cached<T: 'static>(&self) -> Option<Arc<dyn Converter<T>>> {
        self.converters
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&TypeId::of::<T>())
            .and_then(|converter| converter.downcast_ref::<Arc<dyn Converter<T>>>())
            .cloned()
    }

    /// The converter for `T`, built and cached on first request.
    pub fn get<T: Resolve>(&self) -> Result<Arc<dyn Converter<T>>, GeneratorError> {
        if let Some(converter) = self.cached::<T>() {
            return Ok(converter);
        }

        let built = {
            let _guard = ResolvingGuard::enter::<T>()?;
            T::resolve(self)?
        };
        debug!(
            type_name = core::any::type_name::<T>(),
            length = built.length(),
            "built converter"
        );

        let mut converters = self
            .converters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another thread may have finished first, in which case its converter wins.
        let entry = converters
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(built.clone()));
        Ok(entry
            .downcast_ref::<Arc<dyn Converter<T>>>()
            .cloned()
            .unwrap_or(built))
    }

    /// Encodes `item` Direct into a fresh buffer.
    pub fn encode<T: Resolve>(&self, item: &T) -> Result<Bytes, Error> {
        let mut allocator = Allocator::with_options(&self.options);
        self.encode_with(&mut allocator, item)?;
        Ok(allocator.into_bytes()?)
    }

    /// Encodes `item` Direct, appending to `allocator`.
    pub fn encode_with<T: Resolve>(&self, allocator: &mut Allocator, item: &T) -> Result<(), Error> {
        let converter = self.get::<T>()?;
        converter.encode(allocator, item)?;
        Ok(())
    }

    /// Decodes a `T` from the entire span.
    pub fn decode<T: Resolve>(&self, span: &[u8]) -> Result<T, Error> {
        let converter = self.get::<T>()?;
        Ok(converter.decode(span)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};

    use crate::error::DecodeError;
    use crate::options::AnchorPolicy;
    use crate::record::{
        resolve_keyed, FieldDescriptor, KeyedReader, KeyedRecord, KeyedWriter,
    };
    use crate::EncodeError;

    #[test]
    fn caches_converters() {
        let generator = Generator::new();
        assert!(generator.cached::<Vec<u8>>().is_none());

        let first = generator.get::<Vec<u8>>().unwrap();
        let second = generator.get::<Vec<u8>>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(generator.cached::<u8>().is_some());
    }

    #[test]
    fn registered_converters_take_precedence() {
        struct Inverted;

        impl Converter<bool> for Inverted {
            fn length(&self) -> usize {
                1
            }

            fn encode(&self, allocator: &mut Allocator, item: &bool) -> Result<(), EncodeError> {
                allocator.append(&[!*item as u8])
            }

            fn decode(&self, span: &[u8]) -> Result<bool, DecodeError> {
                Ok(crate::converter::expect_width(span, 1)?[0] == 0)
            }
        }

        let generator = Generator::new();
        generator.register::<bool>(Arc::new(Inverted));

        assert_eq!(&[0, 1][..], &generator.encode(&vec![true, false]).unwrap()[..]);
        assert_eq!(
            vec![true, false],
            generator.decode::<Vec<bool>>(&[0, 1]).unwrap()
        );
    }

    #[test]
    fn nested_collections() {
        let generator = Generator::new();
        let value: HashMap<u16, VecDeque<Option<String>>> = HashMap::from([
            (1, VecDeque::from([None, Some("one".to_string())])),
            (2, VecDeque::new()),
        ]);

        let bytes = generator.encode(&value).unwrap();
        assert_eq!(
            value,
            generator
                .decode::<HashMap<u16, VecDeque<Option<String>>>>(&bytes)
                .unwrap()
        );
    }

    #[test]
    fn encode_respects_options() {
        let generator = Generator::with_options(
            AllocatorOptions::default()
                .with_anchor_policy(AnchorPolicy::Pessimistic)
                .with_initial_capacity(1),
        );
        let value = ("ab".to_string(), 1u8);
        let bytes = generator.encode(&value).unwrap();
        // Strings write their prefix directly, so the policy does not show here.
        assert_eq!(b"\x02ab\x01", &bytes[..]);

        let generator = Generator::with_options(AllocatorOptions::default().with_max_capacity(2));
        assert_eq!(
            Err(Error::Encode(EncodeError::CapacityExceeded {
                requested: 3,
                max: 2
            })),
            generator.encode(&"abc".to_string())
        );
    }

    #[test]
    fn decode_errors_surface() {
        let generator = Generator::new();
        assert_eq!(
            Err(Error::Decode(DecodeError::NonExactFraming {
                length: 3,
                width: 2
            })),
            generator.decode::<Vec<u16>>(&[1, 2, 3])
        );
    }

    #[derive(Debug, PartialEq)]
    struct Node {
        children: Vec<Node>,
    }

    impl KeyedRecord for Node {
        type Fields = Arc<dyn Converter<Vec<Node>>>;

        const FIELDS: &'static [FieldDescriptor] = &[FieldDescriptor::required("children")];

        fn resolve_fields(generator: &Generator) -> Result<Self::Fields, GeneratorError> {
            generator.get()
        }

        fn encode_fields(
            &self,
            fields: &Self::Fields,
            writer: &mut KeyedWriter<'_>,
        ) -> Result<(), EncodeError> {
            writer.write(0, fields.as_ref(), &self.children)
        }

        fn decode_fields(
            fields: &Self::Fields,
            reader: &KeyedReader<'_>,
        ) -> Result<Self, DecodeError> {
            Ok(Node {
                children: reader.read(0, fields.as_ref())?,
            })
        }
    }

    impl Resolve for Node {
        fn resolve(generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
            resolve_keyed::<Node>(generator)
        }
    }

    #[test]
    fn rejects_self_referential_types() {
        let generator = Generator::new();
        assert_eq!(
            Err(GeneratorError::Recursive(core::any::type_name::<Node>())),
            generator.get::<Node>().map(|_| ())
        );
        // The failed attempt leaves nothing behind.
        assert!(generator.cached::<Node>().is_none());
        assert!(generator.get::<Vec<u8>>().is_ok());
    }
}
