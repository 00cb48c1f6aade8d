//! A trie over 8-byte chunks of field names.

use thiserror::Error;

const CHUNK_WIDTH: usize = 8;

/// One step of a descent: up to eight key bytes, zero-padded into a little-endian word, together with how many of them are significant.
///
/// Keeping the length apart from the padded word is what distinguishes `"ab"` from `"ab\0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Chunk {
    word: u64,
    len: u8,
}

impl Chunk {
    fn new(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= CHUNK_WIDTH);
        let mut padded = [0u8; CHUNK_WIDTH];
        padded[..bytes.len()].copy_from_slice(bytes);
        Chunk {
            word: u64::from_le_bytes(padded),
            len: bytes.len() as u8,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Node {
    /// Sorted by chunk.
    children: Vec<(Chunk, usize)>,
    terminal: Option<usize>,
}

impl Node {
    fn child(&self, chunk: &Chunk) -> Option<usize> {
        self.children
            .binary_search_by(|(probe, _)| probe.cmp(chunk))
            .ok()
            .map(|position| self.children[position].1)
    }
}

/// Two keys given to [`ByteTrie::build`] are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("key {index} repeats an earlier key")]
pub struct DuplicateKey {
    /// Position of the second occurrence.
    pub index: usize,
}

/// Maps byte-string keys to their position in the list the trie was built from.
///
/// A lookup walks one node per eight key bytes, comparing whole words instead of single bytes. The trie is immutable once built.
///
/// ```
/// use wirebin::record::ByteTrie;
///
/// let trie = ByteTrie::build([&b"id"[..], b"name", b"created_at_timestamp"])?;
/// assert_eq!(Some(1), trie.lookup(b"name"));
/// assert_eq!(Some(2), trie.lookup(b"created_at_timestamp"));
/// assert_eq!(None, trie.lookup(b"nam"));
/// assert_eq!(None, trie.lookup(b"id\0"));
/// # Ok::<(), wirebin::record::DuplicateKey>(())
/// ```
#[derive(Debug, Clone)]
pub struct ByteTrie {
    nodes: Vec<Node>,
    keys: usize,
}

impl ByteTrie {
    /// Builds the trie. The value associated with each key is its position in `keys`.
    pub fn build<'a, I>(keys: I) -> Result<Self, DuplicateKey>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut nodes = vec![Node::default()];
        let mut count = 0;

        for (index, key) in keys.into_iter().enumerate() {
            let mut current = 0;
            for bytes in key.chunks(CHUNK_WIDTH) {
                let chunk = Chunk::new(bytes);
                current = match nodes[current]
                    .children
                    .binary_search_by(|(probe, _)| probe.cmp(&chunk))
                {
                    Ok(position) => nodes[current].children[position].1,
                    Err(position) => {
                        let fresh = nodes.len();
                        nodes.push(Node::default());
                        nodes[current].children.insert(position, (chunk, fresh));
                        fresh
                    }
                };
            }

            if nodes[current].terminal.is_some() {
                return Err(DuplicateKey { index });
            }
            nodes[current].terminal = Some(index);
            count = index + 1;
        }

        Ok(ByteTrie { nodes, keys: count })
    }

    /// Returns the position of `key`, or `None` if it was not among the keys the trie was built from.
    pub fn lookup(&self, key: &[u8]) -> Option<usize> {
        let mut current = &self.nodes[0];
        for bytes in key.chunks(CHUNK_WIDTH) {
            current = &self.nodes[current.child(&Chunk::new(bytes))?];
        }
        current.terminal
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys
    }

    /// Whether the trie was built from no keys at all.
    pub fn is_empty(&self) -> bool {
        self.keys == 0
    }

    /// Number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
