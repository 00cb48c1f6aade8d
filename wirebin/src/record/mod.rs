//! Composite records: keyed (fields found by name) and positional (fields found by order).

mod keyed;
mod positional;
mod trie;

pub use keyed::{
    resolve_keyed, FieldDescriptor, KeyedReader, KeyedRecord, KeyedRecordConverter, KeyedWriter,
    NullableRecordConverter,
};
pub use positional::{PositionalReader, PositionalWriter, TupleConverter};
pub use trie::{ByteTrie, DuplicateKey};
