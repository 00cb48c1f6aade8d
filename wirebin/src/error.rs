use compact_count::CountError;
use thiserror::Error;

/// Everything that can go wrong when decoding a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes remain than a constant width, a count prefix, or an element width requires.
    #[error("not enough bytes: needed {needed}, but only {available} remain")]
    NotEnoughBytes {
        /// Bytes the decoder needed.
        needed: usize,
        /// Bytes that remained in the span.
        available: usize,
    },
    /// A long-form count prefix extends past the end of the span.
    #[error("malformed count prefix")]
    MalformedCount,
    /// A constant-width sequence whose byte length is not a multiple of the element width.
    #[error("{length} bytes do not hold a whole number of {width}-byte elements")]
    NonExactFraming {
        /// Byte length of the sequence payload.
        length: usize,
        /// Width of a single element.
        width: usize,
    },
    /// A keyed record contained the same field twice.
    #[error("duplicate field `{name}`")]
    DuplicateField {
        /// Declared name of the repeated field.
        name: String,
    },
    /// A keyed record lacked a required field.
    #[error("missing field `{name}`")]
    MissingField {
        /// Declared name of the first missing field.
        name: String,
    },
    /// Arithmetic on widths or counts exceeded `usize`.
    #[error("arithmetic overflow while decoding")]
    Overflow,
    /// The bytes do not form a valid value of the expected type.
    #[error("invalid {0}")]
    InvalidValue(&'static str),
    /// A zero-length span cannot be decoded into a non-nullable value.
    #[error("cannot decode `{type_name}` from an empty span")]
    EmptyInput {
        /// Name of the expected type.
        type_name: &'static str,
    },
}

impl From<CountError> for DecodeError {
    fn from(err: CountError) -> Self {
        match err {
            CountError::Empty => DecodeError::NotEnoughBytes {
                needed: 1,
                available: 0,
            },
            CountError::Truncated { .. } => DecodeError::MalformedCount,
            CountError::TooLarge(_) | CountError::NoRoom { .. } => DecodeError::Overflow,
        }
    }
}

/// Everything that can go wrong when encoding a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The allocator would have to grow beyond its configured maximum capacity.
    #[error("encoding needs {requested} bytes, but the allocator is limited to {max}")]
    CapacityExceeded {
        /// Total bytes that would have been needed.
        requested: usize,
        /// The configured maximum capacity.
        max: usize,
    },
    /// Arithmetic on widths, counts, or buffer sizes exceeded `usize`.
    #[error("arithmetic overflow while encoding")]
    Overflow,
    /// A length or count exceeds the greatest value the count codec can represent.
    #[error("count {0} is too large to encode")]
    CountTooLarge(usize),
    /// An anchor was finished while an anchor created after it was still open.
    #[error("anchor finished out of order: {open} anchors open, finishing depth {depth}")]
    AnchorOrder {
        /// Nesting depth of the anchor being finished.
        depth: usize,
        /// Number of anchors currently open.
        open: usize,
    },
    /// An anchor was handed to an allocator other than the one that created it.
    #[error("anchor belongs to a different allocator")]
    ForeignAnchor,
    /// A nullable keyed record encoded to zero bytes, which would decode as `None`.
    #[error("`{type_name}` encodes to an empty span and cannot be told apart from null")]
    EmptyRecord {
        /// The record type.
        type_name: &'static str,
    },
    /// The encoded bytes were requested while anchors were still open.
    #[error("{0} anchors are still open")]
    UnfinishedAnchors(usize),
    /// A keyed record tried to write a field index it never declared.
    #[error("field index {index} is out of range for a record of {count} fields")]
    FieldIndex {
        /// The offending index.
        index: usize,
        /// Number of declared fields.
        count: usize,
    },
}

impl From<CountError> for EncodeError {
    fn from(err: CountError) -> Self {
        match err {
            CountError::TooLarge(n) => EncodeError::CountTooLarge(n),
            _ => EncodeError::Overflow,
        }
    }
}

/// Everything that can go wrong when building a converter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// Two declared fields of a keyed record share a name.
    #[error("field `{name}` of `{type_name}` is declared twice")]
    DuplicateField {
        /// The record type.
        type_name: &'static str,
        /// The repeated field name.
        name: String,
    },
    /// The combined constant width of a composite type overflows `usize`.
    #[error("the encoded width of `{0}` overflows")]
    Overflow(&'static str),
    /// Building the converter for a type requires the converter for that same type.
    #[error("the converter for `{0}` depends on itself")]
    Recursive(&'static str),
}

/// The union of all errors surfaced by the [`Generator`](crate::Generator) entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Encoding failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Decoding failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// No converter could be built for the requested type.
    #[error(transparent)]
    Generator(#[from] GeneratorError),
}
