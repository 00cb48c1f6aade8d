//! Records whose fields are identified by name.
//!
//! A keyed record is encoded as a sequence of `count(key length) ++ key ++ count(value length) ++ value` pairs, running until the end of the span. Values are always written WithLengthPrefix, so a reader can step over fields it does not know. Fields may appear in any order, but no field may appear twice.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::allocator::Allocator;
use crate::converter::{take_prefixed, Converter};
use crate::error::{DecodeError, EncodeError, GeneratorError};
use crate::generator::Generator;

use super::trie::ByteTrie;

/// Declared fields up to this count are tracked without a heap allocation during decoding.
const INLINE_FIELDS: usize = 16;

/// The name of a declared field, and whether it may be absent from an encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    name: &'static str,
    optional: bool,
}

impl FieldDescriptor {
    /// A field that every encoding must contain.
    pub const fn required(name: &'static str) -> Self {
        FieldDescriptor {
            name,
            optional: false,
        }
    }

    /// A field that may be missing, in which case decoding substitutes a default.
    pub const fn optional(name: &'static str) -> Self {
        FieldDescriptor {
            name,
            optional: true,
        }
    }

    /// The key under which the field is encoded.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the field may be absent.
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// A type that is encoded as a keyed record.
///
/// Field indices used with [`KeyedWriter`] and [`KeyedReader`] are positions in [`FIELDS`](KeyedRecord::FIELDS).
///
/// ```
/// use std::sync::Arc;
/// use wirebin::record::{FieldDescriptor, KeyedReader, KeyedRecord, KeyedRecordConverter, KeyedWriter};
/// use wirebin::{Converter, DecodeError, EncodeError, Generator, GeneratorError};
///
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
///     label: Option<String>,
/// }
///
/// impl KeyedRecord for Point {
///     type Fields = (Arc<dyn Converter<i32>>, Arc<dyn Converter<String>>);
///
///     const FIELDS: &'static [FieldDescriptor] = &[
///         FieldDescriptor::required("x"),
///         FieldDescriptor::required("y"),
///         FieldDescriptor::optional("label"),
///     ];
///
///     fn resolve_fields(generator: &Generator) -> Result<Self::Fields, GeneratorError> {
///         Ok((generator.get()?, generator.get()?))
///     }
///
///     fn encode_fields(&self, fields: &Self::Fields, writer: &mut KeyedWriter<'_>) -> Result<(), EncodeError> {
///         writer.write(0, fields.0.as_ref(), &self.x)?;
///         writer.write(1, fields.0.as_ref(), &self.y)?;
///         writer.write_optional(2, fields.1.as_ref(), &self.label)
///     }
///
///     fn decode_fields(fields: &Self::Fields, reader: &KeyedReader<'_>) -> Result<Self, DecodeError> {
///         Ok(Point {
///             x: reader.read(0, fields.0.as_ref())?,
///             y: reader.read(1, fields.0.as_ref())?,
///             label: reader.read_optional(2, fields.1.as_ref())?,
///         })
///     }
/// }
///
/// let converter = KeyedRecordConverter::<Point>::resolve(&Generator::new())?;
/// let point = Point { x: 3, y: -1, label: None };
///
/// let mut allocator = wirebin::Allocator::new();
/// converter.encode(&mut allocator, &point).unwrap();
/// assert_eq!(
///     b"\x01x\x04\x03\x00\x00\x00\x01y\x04\xff\xff\xff\xff",
///     allocator.as_slice()
/// );
/// assert_eq!(point, converter.decode(allocator.as_slice()).unwrap());
/// # Ok::<(), GeneratorError>(())
/// ```
pub trait KeyedRecord: Sized + 'static {
    /// The converters of the field values, resolved once per record type.
    type Fields: Send + Sync;

    /// The declared fields. Names must be unique.
    const FIELDS: &'static [FieldDescriptor];

    /// Resolves the field converters.
    fn resolve_fields(generator: &Generator) -> Result<Self::Fields, GeneratorError>;

    /// Writes the fields of `self`.
    fn encode_fields(
        &self,
        fields: &Self::Fields,
        writer: &mut KeyedWriter<'_>,
    ) -> Result<(), EncodeError>;

    /// Materialises a record from located field values.
    fn decode_fields(fields: &Self::Fields, reader: &KeyedReader<'_>) -> Result<Self, DecodeError>;
}

/// Writes the fields of one keyed record.
pub struct KeyedWriter<'a> {
    allocator: &'a mut Allocator,
    keys: &'a [Box<[u8]>],
}

impl KeyedWriter<'_> {
    /// Writes the field at position `index` of the declared fields.
    pub fn write<F>(
        &mut self,
        index: usize,
        converter: &dyn Converter<F>,
        value: &F,
    ) -> Result<(), EncodeError> {
        let key = self.keys.get(index).ok_or(EncodeError::FieldIndex {
            index,
            count: self.keys.len(),
        })?;
        self.allocator.append(key)?;
        converter.encode_with_length_prefix(self.allocator, value)
    }

    /// Writes the field at position `index` if `value` is `Some`, omits it otherwise.
    pub fn write_optional<F>(
        &mut self,
        index: usize,
        converter: &dyn Converter<F>,
        value: &Option<F>,
    ) -> Result<(), EncodeError> {
        match value {
            Some(value) => self.write(index, converter, value),
            None => Ok(()),
        }
    }
}

/// Where the value of a field was found in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    offset: usize,
    length: usize,
}

/// Gives access to the located values of one keyed record.
pub struct KeyedReader<'a> {
    span: &'a [u8],
    slots: &'a [Option<Slot>],
    descriptors: &'static [FieldDescriptor],
}

impl<'a> KeyedReader<'a> {
    /// The raw value bytes of the field at position `index`, if the field was present.
    pub fn value_bytes(&self, index: usize) -> Option<&'a [u8]> {
        let slot = (*self.slots.get(index)?)?;
        self.span.get(slot.offset..slot.offset + slot.length)
    }

    /// Decodes a field that must be present.
    pub fn read<F>(&self, index: usize, converter: &dyn Converter<F>) -> Result<F, DecodeError> {
        match self.read_optional(index, converter)? {
            Some(value) => Ok(value),
            None => Err(DecodeError::MissingField {
                name: self.name(index)?.to_owned(),
            }),
        }
    }

    /// Decodes a field, or returns `None` if it is absent.
    pub fn read_optional<F>(
        &self,
        index: usize,
        converter: &dyn Converter<F>,
    ) -> Result<Option<F>, DecodeError> {
        self.name(index)?;
        self.value_bytes(index)
            .map(|bytes| converter.decode(bytes))
            .transpose()
    }

    /// Decodes a field, or returns `default` if it is absent.
    pub fn read_or<F>(
        &self,
        index: usize,
        converter: &dyn Converter<F>,
        default: F,
    ) -> Result<F, DecodeError> {
        Ok(self.read_optional(index, converter)?.unwrap_or(default))
    }

    /// Decodes a field, or returns `F::default()` if it is absent.
    pub fn read_or_default<F: Default>(
        &self,
        index: usize,
        converter: &dyn Converter<F>,
    ) -> Result<F, DecodeError> {
        Ok(self.read_optional(index, converter)?.unwrap_or_default())
    }

    fn name(&self, index: usize) -> Result<&'static str, DecodeError> {
        self.descriptors
            .get(index)
            .map(FieldDescriptor::name)
            .ok_or(DecodeError::InvalidValue("field index"))
    }
}

/// Converts a [`KeyedRecord`].
///
/// Decoding makes a single pass over the input: every key is looked up in a [`ByteTrie`] built from the declared names, known values are recorded in a slot per field, unknown ones are skipped. Afterwards every required field must have been seen.
pub struct KeyedRecordConverter<T: KeyedRecord> {
    fields: T::Fields,
    keys: Vec<Box<[u8]>>,
    trie: ByteTrie,
}

impl<T: KeyedRecord> KeyedRecordConverter<T> {
    /// Creates the converter from already resolved field converters. Fails if two declared fields share a name.
    pub fn new(fields: T::Fields) -> Result<Self, GeneratorError> {
        let type_name = core::any::type_name::<T>();

        let trie = ByteTrie::build(T::FIELDS.iter().map(|field| field.name.as_bytes()))
            .map_err(|err| GeneratorError::DuplicateField {
                type_name,
                name: T::FIELDS[err.index].name.to_owned(),
            })?;

        let mut keys = Vec::with_capacity(T::FIELDS.len());
        for field in T::FIELDS {
            let name = field.name.as_bytes();
            let (prefix, width) = compact_count::encode_to_array(name.len())
                .map_err(|_| GeneratorError::Overflow(type_name))?;
            let mut key = Vec::with_capacity(width + name.len());
            key.extend_from_slice(&prefix[..width]);
            key.extend_from_slice(name);
            keys.push(key.into_boxed_slice());
        }

        debug!(
            record = type_name,
            fields = T::FIELDS.len(),
            nodes = trie.node_count(),
            "built field index"
        );

        Ok(KeyedRecordConverter { fields, keys, trie })
    }

    /// Resolves the field converters through `generator`, then creates the converter.
    pub fn resolve(generator: &Generator) -> Result<Self, GeneratorError> {
        KeyedRecordConverter::new(T::resolve_fields(generator)?)
    }

    /// Turns this into a converter for `Option<T>` that encodes `None` as zero bytes.
    pub fn nullable(self) -> NullableRecordConverter<T> {
        NullableRecordConverter { inner: self }
    }

    /// The index over the declared field names.
    pub fn trie(&self) -> &ByteTrie {
        &self.trie
    }

    fn locate(&self, span: &[u8]) -> Result<SmallVec<[Option<Slot>; INLINE_FIELDS]>, DecodeError> {
        let mut slots: SmallVec<[Option<Slot>; INLINE_FIELDS]> =
            SmallVec::from_elem(None, T::FIELDS.len());

        let mut cursor = span;
        while !cursor.is_empty() {
            let key = take_prefixed(&mut cursor)?;
            let value = take_prefixed(&mut cursor)?;

            let Some(index) = self.trie.lookup(key) else {
                trace!(
                    record = core::any::type_name::<T>(),
                    key_length = key.len(),
                    value_length = value.len(),
                    "skipped unknown field"
                );
                continue;
            };

            let slot = &mut slots[index];
            if slot.is_some() {
                let name = T::FIELDS[index].name;
                debug!(record = core::any::type_name::<T>(), field = name, "duplicate field");
                return Err(DecodeError::DuplicateField {
                    name: name.to_owned(),
                });
            }

            *slot = Some(Slot {
                offset: span.len() - cursor.len() - value.len(),
                length: value.len(),
            });
        }

        for (field, slot) in T::FIELDS.iter().zip(slots.iter()) {
            if slot.is_none() && !field.optional {
                debug!(record = core::any::type_name::<T>(), field = field.name, "missing field");
                return Err(DecodeError::MissingField {
                    name: field.name.to_owned(),
                });
            }
        }

        Ok(slots)
    }
}

impl<T: KeyedRecord> Converter<T> for KeyedRecordConverter<T> {
    fn length(&self) -> usize {
        0
    }

    fn encode(&self, allocator: &mut Allocator, item: &T) -> Result<(), EncodeError> {
        let mut writer = KeyedWriter {
            allocator,
            keys: &self.keys,
        };
        item.encode_fields(&self.fields, &mut writer)
    }

    fn decode(&self, span: &[u8]) -> Result<T, DecodeError> {
        if span.is_empty() && T::FIELDS.iter().any(|field| !field.optional) {
            return Err(DecodeError::EmptyInput {
                type_name: core::any::type_name::<T>(),
            });
        }

        let slots = self.locate(span)?;
        let reader = KeyedReader {
            span,
            slots: &slots,
            descriptors: T::FIELDS,
        };
        T::decode_fields(&self.fields, &reader)
    }
}

/// Converts an `Option<T>` of a keyed record, encoding `None` as a zero-length span.
///
/// A `Some` record that writes no fields at all fails to encode with [`EncodeError::EmptyRecord`].
pub struct NullableRecordConverter<T: KeyedRecord> {
    inner: KeyedRecordConverter<T>,
}

impl<T: KeyedRecord> Converter<Option<T>> for NullableRecordConverter<T> {
    fn length(&self) -> usize {
        0
    }

    fn encode(&self, allocator: &mut Allocator, item: &Option<T>) -> Result<(), EncodeError> {
        match item {
            Some(record) => {
                let start = allocator.len();
                self.inner.encode(allocator, record)?;
                if allocator.len() == start {
                    return Err(EncodeError::EmptyRecord {
                        type_name: core::any::type_name::<T>(),
                    });
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn decode(&self, span: &[u8]) -> Result<Option<T>, DecodeError> {
        if span.is_empty() {
            Ok(None)
        } else {
            self.inner.decode(span).map(Some)
        }
    }
}

/// Resolves the converter of a keyed record, for use in [`Resolve`](crate::Resolve) implementations.
pub fn resolve_keyed<T: KeyedRecord>(
    generator: &Generator,
) -> Result<Arc<dyn Converter<T>>, GeneratorError> {
    Ok(Arc::new(KeyedRecordConverter::<T>::resolve(generator)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::{assert_auto_is_self_delimiting, assert_roundtrip_all_modes};

    #[derive(Debug, Clone, PartialEq)]
    struct Account {
        id: u64,
        owner: String,
        tags: Vec<String>,
        note: Option<String>,
    }

    impl KeyedRecord for Account {
        type Fields = (
            Arc<dyn Converter<u64>>,
            Arc<dyn Converter<String>>,
            Arc<dyn Converter<Vec<String>>>,
        );

        const FIELDS: &'static [FieldDescriptor] = &[
            FieldDescriptor::required("id"),
            FieldDescriptor::required("owner"),
            FieldDescriptor::optional("tags"),
            FieldDescriptor::optional("note"),
        ];

        fn resolve_fields(generator: &Generator) -> Result<Self::Fields, GeneratorError> {
            Ok((generator.get()?, generator.get()?, generator.get()?))
        }

        fn encode_fields(
            &self,
            fields: &Self::Fields,
            writer: &mut KeyedWriter<'_>,
        ) -> Result<(), EncodeError> {
            writer.write(0, fields.0.as_ref(), &self.id)?;
            writer.write(1, fields.1.as_ref(), &self.owner)?;
            writer.write(2, fields.2.as_ref(), &self.tags)?;
            writer.write_optional(3, fields.1.as_ref(), &self.note)
        }

        fn decode_fields(
            fields: &Self::Fields,
            reader: &KeyedReader<'_>,
        ) -> Result<Self, DecodeError> {
            Ok(Account {
                id: reader.read(0, fields.0.as_ref())?,
                owner: reader.read(1, fields.1.as_ref())?,
                tags: reader.read_or_default(2, fields.2.as_ref())?,
                note: reader.read_optional(3, fields.1.as_ref())?,
            })
        }
    }

    fn converter() -> KeyedRecordConverter<Account> {
        KeyedRecordConverter::resolve(&Generator::new()).unwrap()
    }

    fn account() -> Account {
        Account {
            id: 7,
            owner: "ada".to_string(),
            tags: vec!["admin".to_string(), "x".repeat(150)],
            note: Some("first".to_string()),
        }
    }

    fn pair(key: &[u8], value: &[u8]) -> Vec<u8> {
        let mut allocator = Allocator::new();
        allocator.append_count(key.len()).unwrap();
        allocator.append(key).unwrap();
        allocator.append_count(value.len()).unwrap();
        allocator.append(value).unwrap();
        allocator.as_slice().to_vec()
    }

    #[test]
    fn records_roundtrip() {
        let converter = converter();
        assert_roundtrip_all_modes(&converter, &account());
        assert_auto_is_self_delimiting(&converter, &account());

        let sparse = Account {
            tags: vec![],
            note: None,
            ..account()
        };
        assert_roundtrip_all_modes(&converter, &sparse);
    }

    #[test]
    fn field_order_does_not_matter() {
        let mut bytes = pair(b"owner", b"bob");
        bytes.extend(pair(b"id", &9u64.to_le_bytes()));

        let decoded = converter().decode(&bytes).unwrap();
        assert_eq!(9, decoded.id);
        assert_eq!("bob", decoded.owner);
        assert!(decoded.tags.is_empty());
        assert_eq!(None, decoded.note);
    }

    #[test]
    fn skips_unknown_fields() {
        let mut bytes = pair(b"id", &1u64.to_le_bytes());
        bytes.extend(pair(b"unknown_field_with_long_name", &[1, 2, 3]));
        bytes.extend(pair(b"owner", b""));
        bytes.extend(pair(b"", b"empty key"));

        let decoded = converter().decode(&bytes).unwrap();
        assert_eq!(1, decoded.id);
        assert_eq!("", decoded.owner);
    }

    #[test]
    fn rejects_duplicate_fields() {
        let mut bytes = pair(b"id", &1u64.to_le_bytes());
        bytes.extend(pair(b"owner", b"a"));
        bytes.extend(pair(b"id", &2u64.to_le_bytes()));

        assert_eq!(
            Err(DecodeError::DuplicateField {
                name: "id".to_string()
            }),
            converter().decode(&bytes)
        );
    }

    #[test]
    fn rejects_missing_required_fields() {
        let bytes = pair(b"id", &1u64.to_le_bytes());
        assert_eq!(
            Err(DecodeError::MissingField {
                name: "owner".to_string()
            }),
            converter().decode(&bytes)
        );
    }

    #[test]
    fn rejects_empty_span() {
        assert_eq!(
            Err(DecodeError::EmptyInput {
                type_name: core::any::type_name::<Account>()
            }),
            converter().decode(&[])
        );
    }

    #[test]
    fn rejects_truncated_pairs() {
        let mut bytes = pair(b"id", &1u64.to_le_bytes());
        bytes.truncate(bytes.len() - 1);
        assert_eq!(
            Err(DecodeError::NotEnoughBytes {
                needed: 8,
                available: 7
            }),
            converter().decode(&bytes)
        );
    }

    #[test]
    fn nullable_records() {
        let converter = converter().nullable();
        assert_roundtrip_all_modes(&converter, &None);
        assert_roundtrip_all_modes(&converter, &Some(account()));

        let mut allocator = Allocator::new();
        converter.encode_auto(&mut allocator, &None).unwrap();
        assert_eq!(&[0], allocator.as_slice());
    }

    #[test]
    fn writer_rejects_undeclared_index() {
        let converter = converter();
        let mut allocator = Allocator::new();
        let mut writer = KeyedWriter {
            allocator: &mut allocator,
            keys: &converter.keys,
        };
        assert_eq!(
            Err(EncodeError::FieldIndex { index: 4, count: 4 }),
            writer.write(4, &crate::primitives::BoolConverter, &true)
        );
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Preferences {
        theme: Option<String>,
        volume: Option<u8>,
    }

    impl KeyedRecord for Preferences {
        type Fields = (Arc<dyn Converter<String>>, Arc<dyn Converter<u8>>);

        const FIELDS: &'static [FieldDescriptor] = &[
            FieldDescriptor::optional("theme"),
            FieldDescriptor::optional("volume"),
        ];

        fn resolve_fields(generator: &Generator) -> Result<Self::Fields, GeneratorError> {
            Ok((generator.get()?, generator.get()?))
        }

        fn encode_fields(
            &self,
            fields: &Self::Fields,
            writer: &mut KeyedWriter<'_>,
        ) -> Result<(), EncodeError> {
            writer.write_optional(0, fields.0.as_ref(), &self.theme)?;
            writer.write_optional(1, fields.1.as_ref(), &self.volume)
        }

        fn decode_fields(
            fields: &Self::Fields,
            reader: &KeyedReader<'_>,
        ) -> Result<Self, DecodeError> {
            Ok(Preferences {
                theme: reader.read_optional(0, fields.0.as_ref())?,
                volume: reader.read_optional(1, fields.1.as_ref())?,
            })
        }
    }

    #[test]
    fn all_optional_records_roundtrip_when_empty() {
        let converter = KeyedRecordConverter::<Preferences>::resolve(&Generator::new()).unwrap();
        let empty = Preferences {
            theme: None,
            volume: None,
        };

        let mut allocator = Allocator::new();
        converter.encode(&mut allocator, &empty).unwrap();
        assert!(allocator.is_empty());
        assert_eq!(empty, converter.decode(&[]).unwrap());
        assert_roundtrip_all_modes(&converter, &empty);
        assert_roundtrip_all_modes(
            &converter,
            &Preferences {
                theme: Some("dark".to_string()),
                volume: None,
            },
        );
    }

    #[test]
    fn nullable_rejects_records_without_fields() {
        let converter = KeyedRecordConverter::<Preferences>::resolve(&Generator::new())
            .unwrap()
            .nullable();
        let empty = Preferences {
            theme: None,
            volume: None,
        };

        let mut allocator = Allocator::new();
        assert_eq!(
            Err(EncodeError::EmptyRecord {
                type_name: core::any::type_name::<Preferences>()
            }),
            converter.encode(&mut allocator, &Some(empty))
        );

        let loud = Some(Preferences {
            theme: None,
            volume: Some(11),
        });
        assert_roundtrip_all_modes(&converter, &loud);
    }

    struct Twice;

    impl KeyedRecord for Twice {
        type Fields = ();

        const FIELDS: &'static [FieldDescriptor] = &[
            FieldDescriptor::required("same"),
            FieldDescriptor::optional("same"),
        ];

        fn resolve_fields(_generator: &Generator) -> Result<(), GeneratorError> {
            Ok(())
        }

        fn encode_fields(&self, _: &(), _: &mut KeyedWriter<'_>) -> Result<(), EncodeError> {
            Ok(())
        }

        fn decode_fields(_: &(), _: &KeyedReader<'_>) -> Result<Self, DecodeError> {
            Ok(Twice)
        }
    }

    #[test]
    fn rejects_duplicate_declarations() {
        assert!(matches!(
            KeyedRecordConverter::<Twice>::new(()),
            Err(GeneratorError::DuplicateField { ref name, .. }) if name == "same"
        ));
    }
}
