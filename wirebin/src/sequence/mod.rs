//! Homogeneous sequences and collections.
//!
//! Elements of constant width `L` are written back to back, and the element count is the payload length divided by `L`. Elements of variable width are each written with their own Auto framing, and decoding repeats Auto decodes until the span is exhausted. Primitive numbers on little-endian targets skip the per-element loop entirely and are copied in bulk.

mod map;
mod memory_buffer;

pub use map::MapConverter;
pub use memory_buffer::MemoryBuffer;

use core::marker::PhantomData;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

use bytemuck::Pod;
use tracing::debug;

use crate::allocator::Allocator;
use crate::converter::Converter;
use crate::error::{DecodeError, EncodeError, GeneratorError};
use crate::generator::{Generator, Resolve};
use crate::primitives::LittleEndian;

/// Bulk-copy routines for element types whose in-memory layout equals their little-endian encoding.
pub struct NativeCopy<E> {
    width: usize,
    encode: fn(&[E], &mut Allocator) -> Result<(), EncodeError>,
    decode: fn(&[u8]) -> Result<Vec<E>, DecodeError>,
}

impl<E> Clone for NativeCopy<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for NativeCopy<E> {}

impl<E> core::fmt::Debug for NativeCopy<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NativeCopy")
            .field("width", &self.width)
            .finish()
    }
}

impl<E: Pod + LittleEndian> NativeCopy<E> {
    /// Returns the bulk-copy routines, or `None` on big-endian targets, where the in-memory layout does not match the wire format.
    pub fn new() -> Option<Self> {
        if cfg!(target_endian = "little") && core::mem::size_of::<E>() == E::WIDTH {
            Some(NativeCopy {
                width: E::WIDTH,
                encode: encode_native::<E>,
                decode: decode_native::<E>,
            })
        } else {
            None
        }
    }
}

impl<E> NativeCopy<E> {
    /// Width of one element.
    pub fn width(&self) -> usize {
        self.width
    }
}

fn encode_native<E: Pod>(items: &[E], allocator: &mut Allocator) -> Result<(), EncodeError> {
    allocator.append(bytemuck::cast_slice(items))
}

fn decode_native<E: Pod>(span: &[u8]) -> Result<Vec<E>, DecodeError> {
    let count = exact_count(span.len(), core::mem::size_of::<E>())?;
    let mut items = vec![<E as bytemuck::Zeroable>::zeroed(); count];
    bytemuck::cast_slice_mut::<E, u8>(&mut items).copy_from_slice(span);
    Ok(items)
}

/// Returns `length / width`, failing if `length` is not a multiple of `width`.
pub fn exact_count(length: usize, width: usize) -> Result<usize, DecodeError> {
    if width == 0 || length % width != 0 {
        return Err(DecodeError::NonExactFraming { length, width });
    }

    Ok(length / width)
}

/// How the elements of a sequence are delimited. Chosen once, when the converter is built.
pub enum SequenceFraming<E> {
    /// Every element occupies exactly this many bytes.
    Constant(usize),
    /// Every element is Auto-framed.
    Variable,
    /// Constant width, copied in bulk.
    NativeCopy(NativeCopy<E>),
}

impl<E> Clone for SequenceFraming<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for SequenceFraming<E> {}

impl<E> core::fmt::Debug for SequenceFraming<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SequenceFraming::Constant(width) => f.debug_tuple("Constant").field(width).finish(),
            SequenceFraming::Variable => f.write_str("Variable"),
            SequenceFraming::NativeCopy(native) => {
                f.debug_tuple("NativeCopy").field(native).finish()
            }
        }
    }
}

impl<E> SequenceFraming<E> {
    /// Picks the framing for elements encoded by `element`, preferring `native` when it agrees with the element width.
    pub fn select(element: &dyn Converter<E>, native: Option<NativeCopy<E>>) -> Self {
        let length = element.length();
        match native {
            Some(native) if native.width == length => SequenceFraming::NativeCopy(native),
            _ if length > 0 => SequenceFraming::Constant(length),
            _ => SequenceFraming::Variable,
        }
    }

    /// The element width for constant framings.
    pub fn element_width(&self) -> Option<usize> {
        match self {
            SequenceFraming::Constant(width) => Some(*width),
            SequenceFraming::NativeCopy(native) => Some(native.width),
            SequenceFraming::Variable => None,
        }
    }
}

/// Element-level encoding and decoding shared by all sequence-shaped converters.
struct Elements<E> {
    element: Arc<dyn Converter<E>>,
    framing: SequenceFraming<E>,
}

impl<E> Elements<E> {
    fn encode<'a, I>(
        &self,
        allocator: &mut Allocator,
        items: I,
    ) -> Result<(), EncodeError>
    where
        I: Iterator<Item = &'a E>,
        E: 'a,
    {
        match self.framing.element_width() {
            Some(width) => {
                let total = items
                    .size_hint()
                    .0
                    .checked_mul(width)
                    .ok_or(EncodeError::Overflow)?;
                allocator.reserve(total)?;
                for item in items {
                    self.element.encode(allocator, item)?;
                }
            }
            None => {
                for item in items {
                    self.element.encode_auto(allocator, item)?;
                }
            }
        }

        Ok(())
    }

    fn decode(&self, span: &[u8]) -> Result<Vec<E>, DecodeError> {
        match &self.framing {
            SequenceFraming::NativeCopy(native) => (native.decode)(span),
            SequenceFraming::Constant(width) => {
                let count = exact_count(span.len(), *width)?;
                let mut items = Vec::with_capacity(count);
                for chunk in span.chunks_exact(*width) {
                    items.push(self.element.decode(chunk)?);
                }
                Ok(items)
            }
            SequenceFraming::Variable => {
                let mut buffer = MemoryBuffer::new();
                let mut cursor = span;
                while !cursor.is_empty() {
                    buffer.push(self.element.decode_auto(&mut cursor)?)?;
                }
                Ok(buffer.into_vec())
            }
        }
    }
}

/// Converts a `Vec<E>`.
///
/// ```
/// use std::sync::Arc;
/// use wirebin::{Allocator, Converter, LittleEndianConverter, SequenceConverter, StringConverter};
///
/// let numbers = SequenceConverter::<u16>::new(Arc::new(LittleEndianConverter::<u16>::new()), None);
/// let mut allocator = Allocator::new();
/// numbers.encode(&mut allocator, &vec![1, 2])?;
/// assert_eq!(&[1, 0, 2, 0], allocator.as_slice());
///
/// let strings = SequenceConverter::<String>::new(Arc::new(StringConverter), None);
/// let mut allocator = Allocator::new();
/// strings.encode(&mut allocator, &vec!["ab".to_string(), "c".to_string()])?;
/// assert_eq!(b"\x02ab\x01c", allocator.as_slice());
/// # Ok::<(), wirebin::EncodeError>(())
/// ```
pub struct SequenceConverter<E> {
    elements: Elements<E>,
}

impl<E> SequenceConverter<E> {
    /// Creates a converter from the element converter and, if available, bulk-copy routines for the element type.
    pub fn new(element: Arc<dyn Converter<E>>, native: Option<NativeCopy<E>>) -> Self {
        let framing = SequenceFraming::select(element.as_ref(), native);
        debug!(
            element = core::any::type_name::<E>(),
            ?framing,
            "built sequence converter"
        );
        SequenceConverter {
            elements: Elements { element, framing },
        }
    }

    /// The framing chosen for the elements.
    pub fn framing(&self) -> &SequenceFraming<E> {
        &self.elements.framing
    }
}

impl<E> Converter<Vec<E>> for SequenceConverter<E> {
    fn length(&self) -> usize {
        0
    }

    fn encode(&self, allocator: &mut Allocator, item: &Vec<E>) -> Result<(), EncodeError> {
        match &self.elements.framing {
            SequenceFraming::NativeCopy(native) => (native.encode)(item, allocator),
            _ => self.elements.encode(allocator, item.iter()),
        }
    }

    fn decode(&self, span: &[u8]) -> Result<Vec<E>, DecodeError> {
        self.elements.decode(span)
    }

    fn encode_with_length_prefix(
        &self,
        allocator: &mut Allocator,
        item: &Vec<E>,
    ) -> Result<(), EncodeError> {
        match self.elements.framing.element_width() {
            Some(width) => {
                let length = item.len().checked_mul(width).ok_or(EncodeError::Overflow)?;
                allocator.append_count(length)?;
                self.encode(allocator, item)
            }
            None => {
                let anchor = allocator.anchor()?;
                self.encode(allocator, item)?;
                allocator.finish(anchor)
            }
        }
    }
}

/// Converts any collection that can be iterated by reference and collected from its elements, such as `VecDeque`, `HashSet`, or `BTreeSet`. Uses the same wire format as [`SequenceConverter`].
pub struct CollectionConverter<C, E> {
    elements: Elements<E>,
    phantom: PhantomData<fn() -> C>,
}

impl<C, E> CollectionConverter<C, E> {
    /// Creates a converter from the element converter.
    pub fn new(element: Arc<dyn Converter<E>>) -> Self {
        let framing = SequenceFraming::select(element.as_ref(), None);
        CollectionConverter {
            elements: Elements { element, framing },
            phantom: PhantomData,
        }
    }
}

impl<C, E> Converter<C> for CollectionConverter<C, E>
where
    C: FromIterator<E>,
    for<'a> &'a C: IntoIterator<Item = &'a E>,
{
    fn length(&self) -> usize {
        0
    }

    fn encode(&self, allocator: &mut Allocator, item: &C) -> Result<(), EncodeError> {
        self.elements.encode(allocator, item.into_iter())
    }

    fn decode(&self, span: &[u8]) -> Result<C, DecodeError> {
        Ok(self.elements.decode(span)?.into_iter().collect())
    }
}

impl<E: Resolve> Resolve for Vec<E> {
    fn resolve(generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        Ok(Arc::new(SequenceConverter::new(
            generator.get::<E>()?,
            E::native_copy(),
        )))
    }
}

impl<E: Resolve> Resolve for VecDeque<E> {
    fn resolve(generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        Ok(Arc::new(CollectionConverter::<Self, E>::new(
            generator.get::<E>()?,
        )))
    }
}

impl<E: Resolve + Eq + Hash> Resolve for HashSet<E> {
    fn resolve(generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        Ok(Arc::new(CollectionConverter::<Self, E>::new(
            generator.get::<E>()?,
        )))
    }
}

impl<E: Resolve + Ord> Resolve for BTreeSet<E> {
    fn resolve(generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        Ok(Arc::new(CollectionConverter::<Self, E>::new(
            generator.get::<E>()?,
        )))
    }
}
