//! The contract every value codec satisfies.

use crate::allocator::Allocator;
use crate::error::{DecodeError, EncodeError};

/// Encoding and decoding of values of type `T`, in three framing modes.
///
/// - **Direct** ([`encode`](Converter::encode), [`decode`](Converter::decode)): the value is the last thing in its buffer. No marker is written and decoding consumes the whole span.
/// - **Auto** ([`encode_auto`](Converter::encode_auto), [`decode_auto`](Converter::decode_auto)): more data follows. Constant-width values are written exactly as in Direct mode, variable-width values get a count prefix holding their byte length.
/// - **WithLengthPrefix** ([`encode_with_length_prefix`](Converter::encode_with_length_prefix), [`decode_with_length_prefix`](Converter::decode_with_length_prefix)): the value is embedded where its width is not known to the reader. A count prefix is always written.
///
/// Only the Direct operations and [`length`](Converter::length) must be implemented, the other modes derive from them. Composite converters use Direct for the last part they write, Auto for every other part, and WithLengthPrefix only at type-erased boundaries.
///
/// Converters are built once and shared, so they must not carry per-call mutable state.
pub trait Converter<T>: Send + Sync {
    /// Zero for variable-width values, otherwise the exact number of bytes every encoding occupies.
    fn length(&self) -> usize;

    /// Writes the raw payload of `item`.
    fn encode(&self, allocator: &mut Allocator, item: &T) -> Result<(), EncodeError>;

    /// Decodes a value from the entire span.
    fn decode(&self, span: &[u8]) -> Result<T, DecodeError>;

    /// Writes `item` so that a reader can find where it ends without a surrounding length.
    fn encode_auto(&self, allocator: &mut Allocator, item: &T) -> Result<(), EncodeError> {
        if self.length() > 0 {
            self.encode(allocator, item)
        } else {
            self.encode_with_length_prefix(allocator, item)
        }
    }

    /// Decodes an Auto-framed value from the start of `span` and advances `span` past it.
    fn decode_auto(&self, span: &mut &[u8]) -> Result<T, DecodeError> {
        let length = self.length();
        if length > 0 {
            let body = take(span, length)?;
            self.decode(body)
        } else {
            self.decode_with_length_prefix(span)
        }
    }

    /// Writes a count prefix holding the payload length, followed by the payload.
    fn encode_with_length_prefix(
        &self,
        allocator: &mut Allocator,
        item: &T,
    ) -> Result<(), EncodeError> {
        let anchor = allocator.anchor()?;
        self.encode(allocator, item)?;
        allocator.finish(anchor)
    }

    /// Decodes a length-prefixed value from the start of `span` and advances `span` past it.
    fn decode_with_length_prefix(&self, span: &mut &[u8]) -> Result<T, DecodeError> {
        let body = take_prefixed(span)?;
        self.decode(body)
    }
}

/// Splits `length` bytes off the front of `span`.
pub fn take<'a>(span: &mut &'a [u8], length: usize) -> Result<&'a [u8], DecodeError> {
    if span.len() < length {
        return Err(DecodeError::NotEnoughBytes {
            needed: length,
            available: span.len(),
        });
    }

    let (head, tail) = span.split_at(length);
    *span = tail;
    Ok(head)
}

/// Reads a count prefix from the front of `span`, then splits that many bytes off. On error, `span` is left untouched.
pub fn take_prefixed<'a>(span: &mut &'a [u8]) -> Result<&'a [u8], DecodeError> {
    let mut cursor = *span;
    let length = compact_count::decode(&mut cursor)?;
    let body = take(&mut cursor, length)?;
    *span = cursor;
    Ok(body)
}

/// Checks that `span` holds at least `length` bytes and returns the first `length` of them.
pub fn expect_width(span: &[u8], length: usize) -> Result<&[u8], DecodeError> {
    span.get(..length).ok_or(DecodeError::NotEnoughBytes {
        needed: length,
        available: span.len(),
    })
}
