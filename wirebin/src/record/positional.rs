//! Records whose fields are identified by their order: `Auto(f0) ++ Auto(f1) ++ … ++ Direct(f_last)`.

use std::sync::Arc;

use crate::allocator::Allocator;
use crate::converter::Converter;
use crate::error::{DecodeError, EncodeError, GeneratorError};
use crate::generator::{Generator, Resolve};

/// Writes the fields of a positional record in declared order: every field but the last Auto-framed, the last one Direct.
///
/// ```
/// use wirebin::record::PositionalWriter;
/// use wirebin::{Allocator, StringConverter};
///
/// let mut allocator = Allocator::new();
/// let mut writer = PositionalWriter::new(&mut allocator, 2);
/// writer.write(&StringConverter, &"ab".to_string())?;
/// writer.write(&StringConverter, &"cd".to_string())?;
/// assert_eq!(b"\x02abcd", allocator.as_slice());
/// # Ok::<(), wirebin::EncodeError>(())
/// ```
pub struct PositionalWriter<'a> {
    allocator: &'a mut Allocator,
    count: usize,
    written: usize,
}

impl<'a> PositionalWriter<'a> {
    /// Prepares writing `count` fields.
    pub fn new(allocator: &'a mut Allocator, count: usize) -> Self {
        PositionalWriter {
            allocator,
            count,
            written: 0,
        }
    }

    /// Writes the next field.
    pub fn write<F>(&mut self, converter: &dyn Converter<F>, value: &F) -> Result<(), EncodeError> {
        let index = self.written;
        if index >= self.count {
            return Err(EncodeError::FieldIndex {
                index,
                count: self.count,
            });
        }

        self.written += 1;
        if self.written == self.count {
            converter.encode(self.allocator, value)
        } else {
            converter.encode_auto(self.allocator, value)
        }
    }
}

/// Reads the fields of a positional record in declared order, mirroring [`PositionalWriter`].
pub struct PositionalReader<'a> {
    cursor: &'a [u8],
    count: usize,
    read: usize,
}

impl<'a> PositionalReader<'a> {
    /// Prepares reading `count` fields from `span`.
    pub fn new(span: &'a [u8], count: usize) -> Self {
        PositionalReader {
            cursor: span,
            count,
            read: 0,
        }
    }

    /// Reads the next field. The last field gets all remaining bytes.
    pub fn read<F>(&mut self, converter: &dyn Converter<F>) -> Result<F, DecodeError> {
        if self.read >= self.count {
            return Err(DecodeError::InvalidValue("field index"));
        }

        self.read += 1;
        if self.read == self.count {
            let rest = core::mem::take(&mut self.cursor);
            converter.decode(rest)
        } else {
            converter.decode_auto(&mut self.cursor)
        }
    }
}

/// The combined width of fields with the given widths: zero if any of them is variable-width, `None` on overflow.
fn combined_width(lengths: &[usize]) -> Option<usize> {
    if lengths.contains(&0) {
        return Some(0);
    }

    lengths
        .iter()
        .try_fold(0usize, |total, length| total.checked_add(*length))
}

/// Converts a tuple as a positional record. `C` is the tuple of the element converters.
///
/// A tuple whose elements are all constant-width is itself constant-width.
///
/// ```
/// use std::sync::Arc;
/// use wirebin::record::TupleConverter;
/// use wirebin::{Allocator, Converter, LittleEndianConverter, StringConverter};
///
/// let converter = TupleConverter::<(Arc<dyn Converter<String>>, Arc<dyn Converter<u16>>)>::new((
///     Arc::new(StringConverter),
///     Arc::new(LittleEndianConverter::<u16>::new()),
/// ))
/// .unwrap();
///
/// let mut allocator = Allocator::new();
/// converter.encode(&mut allocator, &("hi".to_string(), 1))?;
/// assert_eq!(b"\x02hi\x01\x00", allocator.as_slice());
/// # Ok::<(), wirebin::EncodeError>(())
/// ```
pub struct TupleConverter<C> {
    converters: C,
    length: usize,
}

macro_rules! tuples {
    ($(($count:expr; $($name:ident $index:tt),+)),+ $(,)?) => {
        $(
            impl<$($name),+> TupleConverter<($(Arc<dyn Converter<$name>>,)+)> {
                /// Creates the converter from the element converters.
                pub fn new(converters: ($(Arc<dyn Converter<$name>>,)+)) -> Result<Self, GeneratorError> {
                    let length = combined_width(&[$(converters.$index.length()),+])
                        .ok_or(GeneratorError::Overflow(core::any::type_name::<($($name,)+)>()))?;
                    Ok(TupleConverter { converters, length })
                }
            }

            impl<$($name),+> Converter<($($name,)+)> for TupleConverter<($(Arc<dyn Converter<$name>>,)+)> {
                fn length(&self) -> usize {
                    self.length
                }

                fn encode(&self, allocator: &mut Allocator, item: &($($name,)+)) -> Result<(), EncodeError> {
                    let mut writer = PositionalWriter::new(allocator, $count);
                    $(writer.write(self.converters.$index.as_ref(), &item.$index)?;)+
                    Ok(())
                }

                fn decode(&self, span: &[u8]) -> Result<($($name,)+), DecodeError> {
                    let mut reader = PositionalReader::new(span, $count);
                    Ok(($(reader.read(self.converters.$index.as_ref())?,)+))
                }
            }

            impl<$($name: Resolve),+> Resolve for ($($name,)+) {
                fn resolve(generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
                    let converters = ($(generator.get::<$name>()?,)+);
                    Ok(Arc::new(TupleConverter::<($(Arc<dyn Converter<$name>>,)+)>::new(converters)?))
                }
            }
        )+
    };
}

tuples!(
    (1; A 0),
    (2; A 0, B 1),
    (3; A 0, B 1, C 2),
    (4; A 0, B 1, C 2, D 3),
    (5; A 0, B 1, C 2, D 3, E 4),
    (6; A 0, B 1, C 2, D 3, E 4, F 5),
    (7; A 0, B 1, C 2, D 3, E 4, F 5, G 6),
    (8; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7),
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::{assert_auto_is_self_delimiting, assert_roundtrip_all_modes};
    use crate::primitives::{BoolConverter, LittleEndianConverter};
    use crate::text::StringConverter;

    type Pair = (String, String);

    fn pair() -> TupleConverter<(Arc<dyn Converter<String>>, Arc<dyn Converter<String>>)> {
        TupleConverter::<(Arc<dyn Converter<String>>, Arc<dyn Converter<String>>)>::new((
            Arc::new(StringConverter),
            Arc::new(StringConverter),
        ))
        .unwrap()
    }

    #[test]
    fn last_field_saves_one_prefix() {
        let value: Pair = ("left".to_string(), "right".to_string());

        let mut positional = Allocator::new();
        pair().encode(&mut positional, &value).unwrap();

        let mut all_auto = Allocator::new();
        StringConverter.encode_auto(&mut all_auto, &value.0).unwrap();
        StringConverter.encode_auto(&mut all_auto, &value.1).unwrap();

        assert_eq!(all_auto.len(), positional.len() + 1);
        assert_eq!(b"\x04leftright", positional.as_slice());
    }

    #[test]
    fn tuples_roundtrip() {
        assert_roundtrip_all_modes(&pair(), &(String::new(), "x".repeat(200)));
        assert_auto_is_self_delimiting(&pair(), &("a".to_string(), "b".to_string()));
    }

    #[test]
    fn constant_tuples_have_constant_width() {
        let converter = TupleConverter::<(
            Arc<dyn Converter<u32>>,
            Arc<dyn Converter<bool>>,
            Arc<dyn Converter<i16>>,
        )>::new((
            Arc::new(LittleEndianConverter::<u32>::new()),
            Arc::new(BoolConverter),
            Arc::new(LittleEndianConverter::<i16>::new()),
        ))
        .unwrap();
        assert_eq!(7, converter.length());

        let value = (0xdead_beef, true, -2);
        let mut allocator = Allocator::new();
        converter.encode_auto(&mut allocator, &value).unwrap();
        assert_eq!(
            &[0xef, 0xbe, 0xad, 0xde, 1, 0xfe, 0xff],
            allocator.as_slice()
        );
        assert_roundtrip_all_modes(&converter, &value);
    }

    #[test]
    fn mixed_tuples_are_variable_width() {
        let converter = TupleConverter::<(Arc<dyn Converter<u8>>, Arc<dyn Converter<String>>)>::new(
            (
                Arc::new(LittleEndianConverter::<u8>::new()),
                Arc::new(StringConverter),
            ),
        )
        .unwrap();
        assert_eq!(0, converter.length());
        assert_roundtrip_all_modes(&converter, &(9, "nine".to_string()));
    }

    #[test]
    fn combined_width_detects_overflow() {
        assert_eq!(Some(0), combined_width(&[4, 0, usize::MAX]));
        assert_eq!(Some(12), combined_width(&[4, 8]));
        assert_eq!(None, combined_width(&[usize::MAX, 1]));
    }

    #[test]
    fn writer_rejects_extra_fields() {
        let mut allocator = Allocator::new();
        let mut writer = PositionalWriter::new(&mut allocator, 1);
        writer.write(&BoolConverter, &true).unwrap();
        assert_eq!(
            Err(EncodeError::FieldIndex { index: 1, count: 1 }),
            writer.write(&BoolConverter, &false)
        );
    }

    #[test]
    fn truncated_tuple_fails() {
        assert_eq!(
            Err(DecodeError::NotEnoughBytes {
                needed: 5,
                available: 2
            }),
            pair().decode(b"\x05ab")
        );
    }
}
