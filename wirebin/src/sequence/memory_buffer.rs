use crate::error::DecodeError;

/// Number of slots allocated by the first push.
pub const INITIAL_CAPACITY: usize = 8;

/// An accumulator for decoded elements whose final count is not known up front.
///
/// Starts at [`INITIAL_CAPACITY`] slots and doubles whenever it is full. Its logical length ([`len`](MemoryBuffer::len)) is tracked separately from the allocated [`capacity`](MemoryBuffer::capacity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBuffer<T> {
    items: Vec<T>,
}

impl<T> Default for MemoryBuffer<T> {
    fn default() -> Self {
        MemoryBuffer::new()
    }
}

impl<T> MemoryBuffer<T> {
    /// Creates an empty buffer without allocating.
    pub fn new() -> Self {
        MemoryBuffer { items: Vec::new() }
    }

    /// Appends an item, doubling the capacity first if the buffer is full.
    pub fn push(&mut self, item: T) -> Result<(), DecodeError> {
        let capacity = self.items.capacity();
        if self.items.len() == capacity {
            let additional = if capacity == 0 {
                INITIAL_CAPACITY
            } else {
                capacity
            };
            self.items
                .try_reserve_exact(additional)
                .map_err(|_| DecodeError::Overflow)?;
        }

        self.items.push(item);
        Ok(())
    }

    /// Number of items pushed so far.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing was pushed so far.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// The items pushed so far.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Returns the items, dropping unused capacity.
    pub fn into_vec(mut self) -> Vec<T> {
        self.items.shrink_to_fit();
        self.items
    }
}
