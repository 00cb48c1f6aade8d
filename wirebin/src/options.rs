//! Configuration of the [`Allocator`](crate::Allocator).

/// How [`Allocator::finish`](crate::Allocator::finish) fills the four bytes reserved by an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "dev", derive(arbitrary::Arbitrary))]
pub enum AnchorPolicy {
    /// Always keep the four-byte reservation and write the long form of the count, even when the short form would fit. Never moves bytes.
    Pessimistic,
    /// Write the one-byte short form whenever the count fits it, shifting the bytes written since the anchor three positions to the left.
    #[default]
    Reducing,
}

/// Limits and policies for a single [`Allocator`](crate::Allocator).
///
/// ```
/// use wirebin::{AllocatorOptions, AnchorPolicy};
///
/// let options = AllocatorOptions::default()
///     .with_initial_capacity(1)
///     .with_max_capacity(1024)
///     .with_anchor_policy(AnchorPolicy::Pessimistic);
///
/// assert_eq!(1024, options.max_capacity);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocatorOptions {
    /// Bytes allocated up front. Zero defers allocation to the first write.
    pub initial_capacity: usize,
    /// Hard upper bound on the number of bytes a single allocator may hold.
    pub max_capacity: usize,
    /// Policy for finishing anchors.
    pub anchor_policy: AnchorPolicy,
}

/// Default upper bound on the size of one encoding.
pub const DEFAULT_MAX_CAPACITY: usize = compact_count::MAX_COUNT;

/// Default number of bytes allocated up front.
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

impl Default for AllocatorOptions {
    fn default() -> Self {
        AllocatorOptions {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
            anchor_policy: AnchorPolicy::default(),
        }
    }
}

impl AllocatorOptions {
    /// Replaces the initial capacity.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Replaces the maximum capacity.
    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Replaces the anchor policy.
    pub fn with_anchor_policy(mut self, anchor_policy: AnchorPolicy) -> Self {
        self.anchor_policy = anchor_policy;
        self
    }
}
