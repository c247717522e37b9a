//! Chunking and block layout.

use crate::dag::{DagRecord, Link};
use crate::multihash::Multihash;
use crate::{Error, Result};
use bytes::Bytes;
use std::fmt;
use std::ops::Range;

/// An encoded block together with its address.
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    /// The block address (computed from data).
    pub hash: Multihash,
    /// The encoded dag-pb bytes.
    pub data: Bytes,
}

impl Block {
    /// Wrap encoded bytes, computing the address.
    pub fn new(data: Bytes) -> Self {
        let hash = Multihash::compute(&data);
        Self { hash, data }
    }

    /// Encode a record into a block.
    pub fn from_record(record: &DagRecord) -> Result<Self> {
        Ok(Self::new(Bytes::from(record.encode()?)))
    }

    /// Verify that the data matches the expected address.
    pub fn verify(&self, expected: &Multihash) -> Result<()> {
        if &self.hash != expected {
            return Err(Error::HashMismatch {
                expected: expected.to_base58(),
                actual: self.hash.to_base58(),
            });
        }
        Ok(())
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("hash", &self.hash)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Split `len` bytes into consecutive ranges of at most `chunk_size` bytes.
///
/// Empty input yields no ranges.
pub fn chunk_ranges(len: usize, chunk_size: usize) -> Result<Vec<Range<usize>>> {
    if chunk_size == 0 {
        return Err(Error::InvalidConfig("chunk size must be positive".to_string()));
    }
    Ok((0..len)
        .step_by(chunk_size)
        .map(|start| start..len.min(start + chunk_size))
        .collect())
}

/// The blocks a payload is stored as.
#[derive(Clone, Debug)]
pub struct DagLayout {
    /// One leaf block per chunk, in payload order.
    pub leaves: Vec<Block>,
    /// Root block linking the leaves; absent when there is a single chunk.
    pub root: Option<Block>,
}

impl DagLayout {
    /// Chunk and encode `data` without touching the network.
    ///
    /// Root links record each leaf's encoded size, which is what a write
    /// endpoint reports back for the block.
    pub fn build(data: &[u8], chunk_size: usize) -> Result<Self> {
        let ranges = chunk_ranges(data.len(), chunk_size)?;
        if ranges.is_empty() {
            return Err(Error::FormatViolation("missing data".to_string()));
        }

        let leaves = ranges
            .into_iter()
            .map(|range| {
                Block::from_record(&DagRecord::Leaf(Bytes::copy_from_slice(&data[range])))
            })
            .collect::<Result<Vec<_>>>()?;

        let root = if leaves.len() > 1 {
            let links = leaves
                .iter()
                .map(|leaf| Link::new(leaf.hash, leaf.size()))
                .collect();
            Some(Block::from_record(&DagRecord::Internal(links))?)
        } else {
            None
        };

        Ok(Self { leaves, root })
    }

    /// Address of the whole payload.
    pub fn address(&self) -> Multihash {
        match &self.root {
            Some(root) => root.hash,
            None => self.leaves[0].hash,
        }
    }
}
