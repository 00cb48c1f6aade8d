//! Constant-width converters for numbers, booleans, and chars.

use core::marker::PhantomData;
use std::sync::Arc;

use crate::allocator::Allocator;
use crate::converter::{expect_width, Converter};
use crate::error::{DecodeError, EncodeError, GeneratorError};
use crate::generator::{Generator, Resolve};
use crate::sequence::NativeCopy;

/// A number with a fixed little-endian byte representation.
pub trait LittleEndian: Copy + Send + Sync + 'static {
    /// Number of bytes of the representation.
    const WIDTH: usize;

    /// Writes the little-endian bytes into `out`, which is exactly [`WIDTH`](LittleEndian::WIDTH) bytes long.
    fn write_le(self, out: &mut [u8]);

    /// Reads a value from exactly [`WIDTH`](LittleEndian::WIDTH) little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! little_endian {
    ($($num:ident),+) => {
        $(
            impl LittleEndian for $num {
                const WIDTH: usize = core::mem::size_of::<$num>();

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut array = [0u8; core::mem::size_of::<$num>()];
                    array.copy_from_slice(bytes);
                    $num::from_le_bytes(array)
                }
            }

            impl Resolve for $num {
                fn resolve(_generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
                    Ok(Arc::new(LittleEndianConverter::<$num>::new()))
                }

                fn native_copy() -> Option<NativeCopy<Self>> {
                    NativeCopy::new()
                }
            }
        )+
    };
}

little_endian!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

/// Converts numbers to and from their little-endian bytes.
///
/// ```
/// use wirebin::{Allocator, Converter, LittleEndianConverter};
///
/// let converter = LittleEndianConverter::<u16>::new();
/// assert_eq!(2, converter.length());
///
/// let mut allocator = Allocator::new();
/// converter.encode(&mut allocator, &0x12cd)?;
/// assert_eq!(&[0xcd, 0x12], allocator.as_slice());
/// assert_eq!(0x12cd, converter.decode(&[0xcd, 0x12]).unwrap());
/// # Ok::<(), wirebin::EncodeError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LittleEndianConverter<T> {
    phantom: PhantomData<fn() -> T>,
}

impl<T> LittleEndianConverter<T> {
    /// Creates the converter.
    pub const fn new() -> Self {
        LittleEndianConverter {
            phantom: PhantomData,
        }
    }
}

impl<T: LittleEndian> Converter<T> for LittleEndianConverter<T> {
    fn length(&self) -> usize {
        T::WIDTH
    }

    fn encode(&self, allocator: &mut Allocator, item: &T) -> Result<(), EncodeError> {
        item.write_le(allocator.assign(T::WIDTH)?);
        Ok(())
    }

    fn decode(&self, span: &[u8]) -> Result<T, DecodeError> {
        Ok(T::read_le(expect_width(span, T::WIDTH)?))
    }
}

/// Encodes `false` as `0` and `true` as `1` in a single byte. Any other byte fails to decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConverter;

impl Converter<bool> for BoolConverter {
    fn length(&self) -> usize {
        1
    }

    fn encode(&self, allocator: &mut Allocator, item: &bool) -> Result<(), EncodeError> {
        allocator.append(&[*item as u8])
    }

    fn decode(&self, span: &[u8]) -> Result<bool, DecodeError> {
        match expect_width(span, 1)? {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(DecodeError::InvalidValue("bool")),
        }
    }
}

impl Resolve for bool {
    fn resolve(_generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        Ok(Arc::new(BoolConverter))
    }
}

/// Encodes a `char` as its scalar value in four little-endian bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharConverter;

impl Converter<char> for CharConverter {
    fn length(&self) -> usize {
        4
    }

    fn encode(&self, allocator: &mut Allocator, item: &char) -> Result<(), EncodeError> {
        allocator.append(&u32::from(*item).to_le_bytes())
    }

    fn decode(&self, span: &[u8]) -> Result<char, DecodeError> {
        let scalar = u32::read_le(expect_width(span, 4)?);
        char::from_u32(scalar).ok_or(DecodeError::InvalidValue("char"))
    }
}

impl Resolve for char {
    fn resolve(_generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        Ok(Arc::new(CharConverter))
    }
}
