//! `Option<T>`, framed with a count-codec discriminant tag.

use std::sync::Arc;

use crate::allocator::Allocator;
use crate::converter::Converter;
use crate::error::{DecodeError, EncodeError, GeneratorError};
use crate::generator::{Generator, Resolve};

const NONE_TAG: usize = 0;
const SOME_TAG: usize = 1;

/// Encodes `None` as the tag `0` and `Some(value)` as the tag `1` followed by the Direct encoding of the value. A `None` tag must be the whole span.
///
/// ```
/// use std::sync::Arc;
/// use wirebin::{Allocator, Converter, LittleEndianConverter, OptionConverter};
///
/// let converter = OptionConverter::<u16>::new(Arc::new(LittleEndianConverter::<u16>::new()));
///
/// let mut allocator = Allocator::new();
/// converter.encode(&mut allocator, &Some(7))?;
/// assert_eq!(&[1, 7, 0], allocator.as_slice());
/// assert_eq!(None, converter.decode(&[0]).unwrap());
/// # Ok::<(), wirebin::EncodeError>(())
/// ```
pub struct OptionConverter<T> {
    inner: Arc<dyn Converter<T>>,
}

impl<T> OptionConverter<T> {
    /// Wraps the converter for the inner value.
    pub fn new(inner: Arc<dyn Converter<T>>) -> Self {
        OptionConverter { inner }
    }
}

impl<T> Converter<Option<T>> for OptionConverter<T> {
    fn length(&self) -> usize {
        0
    }

    fn encode(&self, allocator: &mut Allocator, item: &Option<T>) -> Result<(), EncodeError> {
        match item {
            None => allocator.append_count(NONE_TAG),
            Some(value) => {
                allocator.append_count(SOME_TAG)?;
                self.inner.encode(allocator, value)
            }
        }
    }

    fn decode(&self, span: &[u8]) -> Result<Option<T>, DecodeError> {
        if span.is_empty() {
            return Err(DecodeError::EmptyInput {
                type_name: core::any::type_name::<Option<T>>(),
            });
        }

        let mut cursor = span;
        match compact_count::decode(&mut cursor)? {
            NONE_TAG if cursor.is_empty() => Ok(None),
            SOME_TAG => Ok(Some(self.inner.decode(cursor)?)),
            _ => Err(DecodeError::InvalidValue("option tag")),
        }
    }
}

impl<T: Resolve> Resolve for Option<T> {
    fn resolve(generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        Ok(Arc::new(OptionConverter::new(generator.get::<T>()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::{assert_auto_is_self_delimiting, assert_roundtrip_all_modes};
    use crate::primitives::LittleEndianConverter;
    use crate::text::StringConverter;

    #[test]
    fn options_roundtrip() {
        let numbers = OptionConverter::<u32>::new(Arc::new(LittleEndianConverter::<u32>::new()));
        assert_roundtrip_all_modes(&numbers, &None);
        assert_roundtrip_all_modes(&numbers, &Some(42));

        let strings = OptionConverter::<String>::new(Arc::new(StringConverter));
        assert_roundtrip_all_modes(&strings, &Some(String::new()));
        assert_auto_is_self_delimiting(&strings, &Some("abc".to_string()));
    }

    #[test]
    fn rejects_unknown_tag_and_empty_span() {
        let converter = OptionConverter::<u8>::new(Arc::new(LittleEndianConverter::<u8>::new()));
        assert_eq!(
            Err(DecodeError::InvalidValue("option tag")),
            converter.decode(&[2, 0])
        );
        assert!(matches!(
            converter.decode(&[]),
            Err(DecodeError::EmptyInput { .. })
        ));
    }

    #[test]
    fn none_must_fill_the_span() {
        let converter = OptionConverter::<u8>::new(Arc::new(LittleEndianConverter::<u8>::new()));
        assert_eq!(Ok(None), converter.decode(&[0]));
        assert_eq!(
            Err(DecodeError::InvalidValue("option tag")),
            converter.decode(&[0, 9, 9, 9])
        );

        let mut cursor = &[2, 0, 0xff, 1][..];
        assert_eq!(
            Err(DecodeError::InvalidValue("option tag")),
            converter.decode_auto(&mut cursor)
        );
    }
}
