//! # Wirebin
//!
//! Compact binary encodings for values of arbitrary shape: numbers, strings, options, tuples, keyed records, sequences, sets, and maps, nested in any combination.
//!
//! ## Framing modes
//!
//! Every value type is described by a [`Converter`], which can write a value in three ways:
//!
//! - **Direct**: the value is the last thing in its buffer, so no length marker is needed.
//! - **Auto**: more data follows. Constant-width values are written as in Direct mode, variable-width values get a [`compact_count`] length prefix.
//! - **WithLengthPrefix**: the value is embedded where the reader cannot know its width, so the prefix is always written.
//!
//! Composite converters use Direct for their last part and Auto for all others, which is what lets values nest without knowing each other's layout.
//!
//! ## Writing
//!
//! All encoders write into an [`Allocator`], a growable buffer that can reserve a length prefix before the length is known (an [`Anchor`]) and fill it in afterwards. How that reservation is filled is configured through [`AllocatorOptions`].
//!
//! ## Resolving converters
//!
//! The [`Generator`] builds the converter of a type from the converters of its parts, through the [`Resolve`] trait, and caches the result:
//!
//! ```
//! use wirebin::Generator;
//!
//! let generator = Generator::new();
//! let bytes = generator.encode(&(7u16, Some("seven".to_string())))?;
//! assert_eq!(b"\x07\x00\x01seven", &bytes[..]);
//!
//! let decoded: (u16, Option<String>) = generator.decode(&bytes)?;
//! assert_eq!((7, Some("seven".to_string())), decoded);
//! # Ok::<(), wirebin::Error>(())
//! ```
//!
//! Records with named, optional, and reorderable fields implement [`record::KeyedRecord`].
//!
//! ## Features
//!
//! The `dev` feature enables [`Arbitrary`](https://docs.rs/arbitrary) implementations and the [`invariants`] module for property tests and fuzzing.

mod allocator;
pub use allocator::{Allocator, Anchor};

mod converter;
pub use converter::{expect_width, take, take_prefixed, Converter};

mod error;
pub use error::{DecodeError, EncodeError, Error, GeneratorError};

mod generator;
pub use generator::{Generator, Resolve};

mod options;
pub use options::{AllocatorOptions, AnchorPolicy, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY};

mod option;
pub use option::OptionConverter;

mod primitives;
pub use primitives::{BoolConverter, CharConverter, LittleEndian, LittleEndianConverter};

pub mod record;

mod sequence;
pub use sequence::{
    exact_count, CollectionConverter, MapConverter, MemoryBuffer, NativeCopy, SequenceConverter,
    SequenceFraming,
};

mod text;
pub use text::{BytesConverter, StringConverter};

#[cfg(any(test, feature = "dev"))]
pub mod invariants;
