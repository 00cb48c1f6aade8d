//! The growable output buffer every encoder writes into.

use core::sync::atomic::{AtomicU64, Ordering};

use bytes::{Bytes, BytesMut};
use compact_count::{LONG_WIDTH, MAX_SHORT};
use tracing::trace;

use crate::error::EncodeError;
use crate::options::{AllocatorOptions, AnchorPolicy};

/// A reserved, not yet filled length prefix inside an [`Allocator`].
///
/// Obtained from [`Allocator::anchor`] and consumed by [`Allocator::finish`], so every anchor is finished at most once. Anchors must be finished in the reverse order of their creation, by the allocator that created them.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an anchor must be finished, otherwise the allocator cannot hand out its bytes"]
pub struct Anchor {
    allocator: u64,
    offset: usize,
    depth: usize,
}

/// Source of allocator identities, so that anchors can be traced back to their allocator.
static NEXT_ALLOCATOR_ID: AtomicU64 = AtomicU64::new(0);

impl Anchor {
    /// Offset of the reserved bytes within the allocator.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// An owned, growable byte buffer with a write cursor.
///
/// Capacity at least doubles whenever it grows, and never exceeds the configured maximum. All writes go through [`assign`](Allocator::assign), whose returned slice mutably borrows the allocator, so no slice obtained from it can be used across a later write.
///
/// ```
/// use wirebin::Allocator;
///
/// let mut allocator = Allocator::new();
/// allocator.append(b"head")?;
///
/// let anchor = allocator.anchor()?;
/// allocator.append(b"payload")?;
/// allocator.finish(anchor)?;
///
/// assert_eq!(b"head\x07payload", &allocator.into_bytes()?[..]);
/// # Ok::<(), wirebin::EncodeError>(())
/// ```
#[derive(Debug)]
pub struct Allocator {
    id: u64,
    buffer: BytesMut,
    max_capacity: usize,
    anchor_policy: AnchorPolicy,
    open_anchors: usize,
}

impl Default for Allocator {
    fn default() -> Self {
        Allocator::new()
    }
}

impl Allocator {
    /// Creates an allocator with [`AllocatorOptions::default`].
    pub fn new() -> Self {
        Allocator::with_options(&AllocatorOptions::default())
    }

    /// Creates an allocator with the given options.
    pub fn with_options(options: &AllocatorOptions) -> Self {
        let initial = options.initial_capacity.min(options.max_capacity);
        Allocator::from_buffer(BytesMut::with_capacity(initial), options)
    }

    /// Creates an allocator that writes into externally supplied storage. Any bytes already in `buffer` are discarded, its capacity is kept.
    pub fn from_buffer(mut buffer: BytesMut, options: &AllocatorOptions) -> Self {
        buffer.clear();
        Allocator {
            id: NEXT_ALLOCATOR_ID.fetch_add(1, Ordering::Relaxed),
            buffer,
            max_capacity: options.max_capacity,
            anchor_policy: options.anchor_policy,
            open_anchors: 0,
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written so far.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of bytes that can be held without growing.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// The configured upper bound on [`len`](Allocator::len).
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// The policy used by [`finish`](Allocator::finish).
    pub fn anchor_policy(&self) -> AnchorPolicy {
        self.anchor_policy
    }

    /// Number of anchors created but not yet finished.
    pub fn open_anchors(&self) -> usize {
        self.open_anchors
    }

    /// The bytes written so far, including any unfinished anchor reservations.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..]
    }

    /// Makes sure that `additional` more bytes can be written without growing again.
    pub fn reserve(&mut self, additional: usize) -> Result<(), EncodeError> {
        let len = self.buffer.len();
        let required = len.checked_add(additional).ok_or(EncodeError::Overflow)?;

        if required > self.max_capacity {
            return Err(EncodeError::CapacityExceeded {
                requested: required,
                max: self.max_capacity,
            });
        }

        let capacity = self.buffer.capacity();
        if required <= capacity {
            return Ok(());
        }

        let target = capacity
            .saturating_mul(2)
            .max(required)
            .min(self.max_capacity);
        trace!(from = capacity, to = target, "growing allocator");
        self.buffer.reserve(target - len);

        Ok(())
    }

    /// Advances the cursor by `length` bytes and returns them, zeroed, for the caller to fill.
    pub fn assign(&mut self, length: usize) -> Result<&mut [u8], EncodeError> {
        self.reserve(length)?;
        let start = self.buffer.len();
        self.buffer.resize(start + length, 0);
        Ok(&mut self.buffer[start..])
    }

    /// Appends the given bytes.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.reserve(bytes.len())?;
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Appends the minimal count encoding of `n`.
    pub fn append_count(&mut self, n: usize) -> Result<(), EncodeError> {
        let (bytes, width) = compact_count::encode_to_array(n)?;
        self.append(&bytes[..width])
    }

    /// Reserves four bytes for a length prefix whose value is not known yet. Everything written until the matching [`finish`](Allocator::finish) counts towards that length.
    pub fn anchor(&mut self) -> Result<Anchor, EncodeError> {
        let offset = self.buffer.len();
        self.assign(LONG_WIDTH)?;

        let depth = self.open_anchors;
        self.open_anchors += 1;

        Ok(Anchor {
            allocator: self.id,
            offset,
            depth,
        })
    }

    /// Writes the number of bytes appended since `anchor` was created into its reservation, according to the configured [`AnchorPolicy`].
    ///
    /// Fails with [`EncodeError::ForeignAnchor`] if `anchor` was created by another allocator, and with [`EncodeError::AnchorOrder`] unless it is the most recently created open anchor.
    pub fn finish(&mut self, anchor: Anchor) -> Result<(), EncodeError> {
        if anchor.allocator != self.id {
            return Err(EncodeError::ForeignAnchor);
        }

        let payload_start = anchor.offset + LONG_WIDTH;
        let len = self.buffer.len();

        if anchor.depth + 1 != self.open_anchors || payload_start > len {
            return Err(EncodeError::AnchorOrder {
                depth: anchor.depth,
                open: self.open_anchors,
            });
        }

        let written = len - payload_start;

        match self.anchor_policy {
            AnchorPolicy::Reducing if written <= MAX_SHORT => {
                trace!(written, "reducing anchor to the short form");
                self.buffer[anchor.offset] = written as u8;
                self.buffer
                    .copy_within(payload_start..len, anchor.offset + 1);
                self.buffer.truncate(len - (LONG_WIDTH - 1));
            }
            _ => {
                let mut prefix = [0u8; LONG_WIDTH];
                compact_count::encode_long_into(written, &mut prefix)?;
                self.buffer[anchor.offset..payload_start].copy_from_slice(&prefix);
            }
        }

        self.open_anchors -= 1;
        Ok(())
    }

    /// Takes the bytes written so far, leaving the allocator empty but keeping its remaining capacity for reuse.
    pub fn split_bytes(&mut self) -> Result<Bytes, EncodeError> {
        if self.open_anchors != 0 {
            return Err(EncodeError::UnfinishedAnchors(self.open_anchors));
        }

        Ok(self.buffer.split().freeze())
    }

    /// Consumes the allocator and returns the bytes written.
    pub fn into_bytes(mut self) -> Result<Bytes, EncodeError> {
        self.split_bytes()
    }

    /// Consumes the allocator and returns its storage, written bytes included.
    pub fn into_buffer(self) -> BytesMut {
        self.buffer
    }
}
