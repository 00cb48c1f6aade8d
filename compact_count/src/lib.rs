#![no_std]

//! # Compact Count
//!
//! A variable-width encoding for the non-negative integers that frame binary data: length prefixes, element counts, and discriminant tags. The general idea is the following:
//!
//! - A count between `0` and `127` (inclusive) is encoded as a single byte whose most significant bit is zero.
//! - Any other count up to `2^31 - 1` is encoded in four bytes. The most significant bit of the first byte is set to mark this long form. The remaining seven bits of the first byte hold the seven least significant bits of the count, and the following three bytes hold the remaining 24 bits in little-endian order.
//!
//! Put differently, reading the four bytes of a long encoding as a little-endian `u32` yields `0x80 | (n & 0x7f) | ((n >> 7) << 8)`.
//!
//! A decoder only ever inspects the top bit of the first byte to learn whether one or four bytes belong to the count. Long-form encodings of counts below `128` are valid input: writers that reserve a four-byte slot before they know the final count (see `wirebin::Allocator::anchor`) produce them.
//!
//! The free functions [`len_of_encoding`], [`encode_into`], [`encode_long_into`], [`decode`], and [`decode_from_slice`] work on plain `usize`s. The [`CompactCount`] type wraps a count for use with `arbitrary` when the `dev` feature is enabled.

#[cfg(feature = "std")]
extern crate std;

use core::fmt::Display;

#[cfg(feature = "dev")]
use arbitrary::Arbitrary;

/// The greatest count that fits the one-byte short form.
pub const MAX_SHORT: usize = 0x7f;

/// The greatest count that can be encoded at all.
pub const MAX_COUNT: usize = 0x7fff_ffff;

/// Width in bytes of the short form.
pub const SHORT_WIDTH: usize = 1;

/// Width in bytes of the long form.
pub const LONG_WIDTH: usize = 4;

const LONG_MARKER: u8 = 0x80;

/// Everything that can go wrong when encoding or decoding a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountError {
    /// There was not a single byte to decode from.
    Empty,
    /// The first byte announced the long form, but fewer than four bytes were available.
    Truncated {
        /// Bytes the long form needs.
        needed: usize,
        /// Bytes that were actually available.
        available: usize,
    },
    /// The count exceeds [`MAX_COUNT`] and has no encoding.
    TooLarge(usize),
    /// The output slice is too short for the encoding.
    NoRoom {
        /// Bytes the encoding needs.
        needed: usize,
        /// Bytes the output slice offers.
        available: usize,
    },
}

impl Display for CountError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CountError::Empty => write!(f, "Expected a count, but the input was empty."),
            CountError::Truncated { needed, available } => write!(
                f,
                "A long-form count needs {} bytes, but only {} were available.",
                needed, available
            ),
            CountError::TooLarge(n) => write!(
                f,
                "The count {} exceeds the maximal encodable count {}.",
                n, MAX_COUNT
            ),
            CountError::NoRoom { needed, available } => write!(
                f,
                "Encoding a count needs {} bytes, but the output only has room for {}.",
                needed, available
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CountError {}

/// Returns whether the given first byte of an encoding announces the four-byte long form.
///
/// ```
/// use compact_count::*;
///
/// assert!(!is_long_form(0x7f));
/// assert!(is_long_form(0x80));
/// ```
pub const fn is_long_form(first: u8) -> bool {
    first & LONG_MARKER == LONG_MARKER
}

/// Returns the number of bytes the minimal encoding of `n` occupies. Counts above [`MAX_COUNT`] report the long width; [`encode_into`] rejects them.
///
/// ```
/// use compact_count::*;
///
/// assert_eq!(1, len_of_encoding(0));
/// assert_eq!(1, len_of_encoding(127));
/// assert_eq!(4, len_of_encoding(128));
/// assert_eq!(4, len_of_encoding(MAX_COUNT));
/// ```
pub const fn len_of_encoding(n: usize) -> usize {
    if n <= MAX_SHORT {
        SHORT_WIDTH
    } else {
        LONG_WIDTH
    }
}

/// Returns the four bytes of the long form of `n`, which must not exceed [`MAX_COUNT`].
const fn long_form(n: usize) -> [u8; LONG_WIDTH] {
    let n = n as u32;
    let word = (LONG_MARKER as u32) | (n & 0x7f) | ((n >> 7) << 8);
    word.to_le_bytes()
}

/// Writes the minimal encoding of `n` to the start of `out` and returns the number of bytes written.
///
/// ```
/// use compact_count::*;
///
/// let mut out = [0u8; 4];
/// assert_eq!(Ok(1), encode_into(5, &mut out));
/// assert_eq!(5, out[0]);
///
/// assert_eq!(Ok(4), encode_into(128, &mut out));
/// assert_eq!([0x80, 0x01, 0x00, 0x00], out);
///
/// assert_eq!(Err(CountError::TooLarge(MAX_COUNT + 1)), encode_into(MAX_COUNT + 1, &mut out));
/// ```
pub fn encode_into(n: usize, out: &mut [u8]) -> Result<usize, CountError> {
    if n > MAX_COUNT {
        return Err(CountError::TooLarge(n));
    }

    let width = len_of_encoding(n);
    if out.len() < width {
        return Err(CountError::NoRoom {
            needed: width,
            available: out.len(),
        });
    }

    if width == SHORT_WIDTH {
        out[0] = n as u8;
    } else {
        out[..LONG_WIDTH].copy_from_slice(&long_form(n));
    }

    Ok(width)
}

/// Writes the four-byte long form of `n`, even if `n` would fit the short form.
///
/// ```
/// use compact_count::*;
///
/// let mut out = [0u8; 4];
/// encode_long_into(3, &mut out).unwrap();
/// assert_eq!([0x83, 0, 0, 0], out);
/// assert_eq!(Ok((3, 4)), decode_from_slice(&out));
/// ```
pub fn encode_long_into(n: usize, out: &mut [u8; LONG_WIDTH]) -> Result<(), CountError> {
    if n > MAX_COUNT {
        return Err(CountError::TooLarge(n));
    }

    *out = long_form(n);
    Ok(())
}

/// Returns the minimal encoding of `n` in a fixed-size array, together with the number of meaningful leading bytes.
pub fn encode_to_array(n: usize) -> Result<([u8; LONG_WIDTH], usize), CountError> {
    let mut out = [0u8; LONG_WIDTH];
    let width = encode_into(n, &mut out)?;
    Ok((out, width))
}

/// Decodes a count from the start of `span`, returning it together with the number of bytes it occupied.
///
/// ```
/// use compact_count::*;
///
/// assert_eq!(Ok((127, 1)), decode_from_slice(&[0x7f, 0xff]));
/// assert_eq!(Ok((128, 4)), decode_from_slice(&[0x80, 0x01, 0x00, 0x00]));
/// assert_eq!(Err(CountError::Empty), decode_from_slice(&[]));
/// assert_eq!(
///     Err(CountError::Truncated { needed: 4, available: 2 }),
///     decode_from_slice(&[0x80, 0x01]),
/// );
/// ```
pub fn decode_from_slice(span: &[u8]) -> Result<(usize, usize), CountError> {
    let first = match span.first() {
        Some(first) => *first,
        None => return Err(CountError::Empty),
    };

    if !is_long_form(first) {
        return Ok((first as usize, SHORT_WIDTH));
    }

    if span.len() < LONG_WIDTH {
        return Err(CountError::Truncated {
            needed: LONG_WIDTH,
            available: span.len(),
        });
    }

    let word = u32::from_le_bytes([span[0], span[1], span[2], span[3]]);
    let n = (word & 0x7f) | ((word >> 8) << 7);

    Ok((n as usize, LONG_WIDTH))
}

/// Decodes a count from the start of `cursor` and advances `cursor` past it. On error, `cursor` is left untouched.
///
/// ```
/// use compact_count::*;
///
/// let bytes = [2, 0x80, 0x01, 0, 0, 9];
/// let mut cursor = &bytes[..];
/// assert_eq!(Ok(2), decode(&mut cursor));
/// assert_eq!(Ok(128), decode(&mut cursor));
/// assert_eq!(&[9], cursor);
/// ```
pub fn decode(cursor: &mut &[u8]) -> Result<usize, CountError> {
    let (n, width) = decode_from_slice(cursor)?;
    *cursor = &cursor[width..];
    Ok(n)
}

/// A thin wrapper around `usize` that is guaranteed not to exceed [`MAX_COUNT`].
///
/// ```
/// use compact_count::*;
///
/// let count = CompactCount::new(300).unwrap();
/// assert_eq!(4, count.len_of_encoding());
///
/// let mut out = [0u8; 4];
/// assert_eq!(4, count.encode_into(&mut out).unwrap());
/// assert_eq!(count, CompactCount::decode(&mut &out[..]).unwrap());
///
/// assert_eq!(None, CompactCount::new(MAX_COUNT + 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompactCount(usize);

impl CompactCount {
    /// Wraps `n`, returning `None` if it exceeds [`MAX_COUNT`].
    pub const fn new(n: usize) -> Option<Self> {
        if n <= MAX_COUNT {
            Some(CompactCount(n))
        } else {
            None
        }
    }

    /// Retrieves the wrapped count.
    pub const fn get(&self) -> usize {
        self.0
    }

    /// The number of bytes of the minimal encoding.
    pub const fn len_of_encoding(&self) -> usize {
        len_of_encoding(self.0)
    }

    /// Writes the minimal encoding to the start of `out`.
    pub fn encode_into(&self, out: &mut [u8]) -> Result<usize, CountError> {
        encode_into(self.0, out)
    }

    /// Decodes a count and advances the cursor past it.
    pub fn decode(cursor: &mut &[u8]) -> Result<Self, CountError> {
        decode(cursor).map(CompactCount)
    }
}

impl From<CompactCount> for usize {
    fn from(value: CompactCount) -> Self {
        value.0
    }
}

impl TryFrom<usize> for CompactCount {
    type Error = CountError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        CompactCount::new(value).ok_or(CountError::TooLarge(value))
    }
}

#[cfg(feature = "dev")]
impl<'a> Arbitrary<'a> for CompactCount {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> Result<Self, arbitrary::Error> {
        // Bias towards the interesting region around the short/long boundary.
        let n = if bool::arbitrary(u)? {
            u.int_in_range(0..=(2 * MAX_SHORT + 2))?
        } else {
            u.int_in_range(0..=MAX_COUNT)?
        };
        Ok(CompactCount(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(n: usize) -> usize {
        let (bytes, width) = encode_to_array(n).unwrap();
        assert_eq!(width, len_of_encoding(n));
        let (decoded, consumed) = decode_from_slice(&bytes[..width]).unwrap();
        assert_eq!(n, decoded);
        assert_eq!(width, consumed);
        width
    }

    #[test]
    fn boundary_widths() {
        assert_eq!(roundtrip(0), 1);
        assert_eq!(roundtrip(127), 1);
        assert_eq!(roundtrip(128), 4);
        assert_eq!(roundtrip(MAX_COUNT), 4);
    }

    #[test]
    fn long_form_layout() {
        let (bytes, _) = encode_to_array(MAX_COUNT).unwrap();
        assert_eq!([0xff, 0xff, 0xff, 0xff], bytes);

        let (bytes, _) = encode_to_array(0x1234_5678).unwrap();
        assert!(is_long_form(bytes[0]));
        assert_eq!(0x78 & 0x7f, bytes[0] & 0x7f);
    }

    #[test]
    fn long_form_of_small_counts_decodes() {
        for n in [0, 1, 64, 127] {
            let mut out = [0u8; LONG_WIDTH];
            encode_long_into(n, &mut out).unwrap();
            assert_eq!(Ok((n, LONG_WIDTH)), decode_from_slice(&out));
        }
    }

    #[test]
    fn rejects_too_large() {
        let mut out = [0u8; LONG_WIDTH];
        assert_eq!(
            Err(CountError::TooLarge(MAX_COUNT + 1)),
            encode_long_into(MAX_COUNT + 1, &mut out)
        );
    }

    #[test]
    fn reports_missing_room() {
        let mut out = [0u8; 2];
        assert_eq!(
            Err(CountError::NoRoom {
                needed: 4,
                available: 2
            }),
            encode_into(1000, &mut out)
        );
    }

    #[test]
    fn failed_decode_leaves_cursor() {
        let bytes = [0x81, 0x00];
        let mut cursor = &bytes[..];
        assert!(decode(&mut cursor).is_err());
        assert_eq!(2, cursor.len());
    }

    #[test]
    fn every_short_value_is_its_own_byte() {
        for n in 0..=MAX_SHORT {
            let (bytes, width) = encode_to_array(n).unwrap();
            assert_eq!(1, width);
            assert_eq!(n as u8, bytes[0]);
        }
    }
}
