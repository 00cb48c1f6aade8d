//! Variable-width converters for strings and raw bytes.

use std::sync::Arc;

use bytes::Bytes;

use crate::allocator::Allocator;
use crate::converter::Converter;
use crate::error::{DecodeError, EncodeError, GeneratorError};
use crate::generator::{Generator, Resolve};

/// Encodes a `String` as its UTF-8 bytes. Since the byte length is known before writing, the length-prefixed modes write the prefix directly instead of going through an anchor.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Converter<String> for StringConverter {
    fn length(&self) -> usize {
        0
    }

    fn encode(&self, allocator: &mut Allocator, item: &String) -> Result<(), EncodeError> {
        allocator.append(item.as_bytes())
    }

    fn decode(&self, span: &[u8]) -> Result<String, DecodeError> {
        match core::str::from_utf8(span) {
            Ok(text) => Ok(text.to_owned()),
            Err(_) => Err(DecodeError::InvalidValue("utf-8")),
        }
    }

    fn encode_with_length_prefix(
        &self,
        allocator: &mut Allocator,
        item: &String,
    ) -> Result<(), EncodeError> {
        allocator.append_count(item.len())?;
        allocator.append(item.as_bytes())
    }
}

impl Resolve for String {
    fn resolve(_generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        Ok(Arc::new(StringConverter))
    }
}

/// Encodes [`Bytes`] verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesConverter;

impl Converter<Bytes> for BytesConverter {
    fn length(&self) -> usize {
        0
    }

    fn encode(&self, allocator: &mut Allocator, item: &Bytes) -> Result<(), EncodeError> {
        allocator.append(item)
    }

    fn decode(&self, span: &[u8]) -> Result<Bytes, DecodeError> {
        Ok(Bytes::copy_from_slice(span))
    }

    fn encode_with_length_prefix(
        &self,
        allocator: &mut Allocator,
        item: &Bytes,
    ) -> Result<(), EncodeError> {
        allocator.append_count(item.len())?;
        allocator.append(item)
    }
}

impl Resolve for Bytes {
    fn resolve(_generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        Ok(Arc::new(BytesConverter))
    }
}
