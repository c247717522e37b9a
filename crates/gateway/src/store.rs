//! Chunked payload storage over untrusted gateways.
//!
//! `put` splits a payload into leaf blocks, stores them concurrently and, if
//! there is more than one, stores a root block linking them in order. `get`
//! fetches a block, verifies it against its address and reassembles linked
//! children in link order.
//!
//! Block requests fan out at most `concurrency` at a time per node. A block
//! that fails verification puts its endpoint in cooldown and is fetched again
//! from another endpoint; mismatching bytes are never returned.

use crate::error::{GatewayError, GatewayResult};
use crate::registry::{GatewayRegistry, GatewayRole};
use crate::retry::RetryPolicy;
use crate::transport::{BlockTransport, HttpTransport};
use bytes::{Bytes, BytesMut};
use canopy_core::{
    Block, DagRecord, GatewayConfig, Link, Multihash, chunk_ranges, parse_node,
};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, TryStreamExt, stream};
use std::sync::Arc;

/// Maximum number of block levels followed by `get`, root included.
pub const MAX_DAG_DEPTH: usize = 32;

/// Outcome of storing a block or payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutResult {
    /// Address of the stored block.
    pub address: Multihash,
    /// Block size reported by the write endpoint.
    pub size: u64,
}

/// Stores and retrieves payloads as chunked dag-pb blocks.
#[derive(Clone)]
pub struct ChunkedStore {
    registry: Arc<GatewayRegistry>,
    transport: Arc<dyn BlockTransport>,
    chunk_size: usize,
    concurrency: usize,
    retry: RetryPolicy,
}

impl ChunkedStore {
    pub fn new(registry: Arc<GatewayRegistry>, transport: Arc<dyn BlockTransport>) -> Self {
        Self {
            registry,
            transport,
            chunk_size: canopy_core::DEFAULT_CHUNK_SIZE,
            concurrency: canopy_core::DEFAULT_MAX_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }

    /// Build a store with an HTTP transport from configuration.
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        config.validate()?;
        let registry = Arc::new(GatewayRegistry::from_config(config)?);
        let transport = Arc::new(HttpTransport::new(config.request_timeout())?);
        Ok(Self::new(registry, transport)
            .with_chunk_size(config.chunk_size)
            .with_concurrency(config.max_concurrency)
            .with_retry(RetryPolicy::from(&config.retry)))
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Limit in-flight block requests per fan-out (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn registry(&self) -> &Arc<GatewayRegistry> {
        &self.registry
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Store a payload and return its address.
    #[tracing::instrument(skip(self, data), fields(len = data.len()))]
    pub async fn put(&self, data: &[u8]) -> GatewayResult<PutResult> {
        let ranges = chunk_ranges(data.len(), self.chunk_size)?;
        if ranges.is_empty() {
            return Err(canopy_core::Error::FormatViolation("missing data".to_string()).into());
        }

        let leaves = ranges
            .into_iter()
            .map(|range| {
                Block::from_record(&DagRecord::Leaf(Bytes::copy_from_slice(&data[range])))
            })
            .collect::<canopy_core::Result<Vec<_>>>()?;

        let stored: Vec<PutResult> = stream::iter(leaves.into_iter().map(|leaf| self.put_block(leaf)))
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        if let [single] = stored.as_slice() {
            return Ok(single.clone());
        }

        let links = stored
            .iter()
            .map(|leaf| Link::new(leaf.address, leaf.size))
            .collect();
        let root = Block::from_record(&DagRecord::Internal(links))?;
        tracing::debug!(chunks = stored.len(), root = %root.hash, "Storing root block");
        self.put_block(root).await
    }

    /// Store one encoded block, failing over between write endpoints.
    ///
    /// An endpoint that echoes a different address is treated like a failed
    /// request. If no endpoint stores the block faithfully, the last address
    /// mismatch is returned.
    pub async fn put_block(&self, block: Block) -> GatewayResult<PutResult> {
        let expected = block.hash.to_base58();
        let mut last_error = None;
        let mut mismatch = None;

        for attempt in 1..=self.retry.max_attempts {
            let endpoint = match self.registry.select(GatewayRole::Write) {
                Ok(endpoint) => endpoint,
                Err(e) => return Err(mismatch.unwrap_or(e)),
            };

            match self.transport.put_block(&endpoint, block.data.clone()).await {
                Ok(response) if response.key != expected => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        expected = %expected,
                        actual = %response.key,
                        attempt,
                        "Write endpoint returned a different address"
                    );
                    mismatch = Some(GatewayError::from(canopy_core::Error::HashMismatch {
                        expected: expected.clone(),
                        actual: response.key,
                    }));
                }
                Ok(response) => {
                    tracing::debug!(address = %expected, endpoint = %endpoint, size = response.size, "Block stored");
                    return Ok(PutResult {
                        address: block.hash,
                        size: response.size,
                    });
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt,
                        error = %e,
                        "Block put failed"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            self.registry.mark_failure(GatewayRole::Write, &endpoint);
            if attempt < self.retry.max_attempts {
                tokio::time::sleep(self.retry.backoff(attempt)).await;
            }
        }

        Err(mismatch.unwrap_or_else(|| exhausted(self.retry.max_attempts, last_error)))
    }

    /// Fetch and reassemble the payload stored under `address`.
    pub async fn get(&self, address: &Multihash) -> GatewayResult<Bytes> {
        self.get_at_depth(address, 0).await
    }

    fn get_at_depth<'a>(
        &'a self,
        address: &'a Multihash,
        depth: usize,
    ) -> BoxFuture<'a, GatewayResult<Bytes>> {
        async move {
            if depth >= MAX_DAG_DEPTH {
                return Err(canopy_core::Error::FormatViolation(format!(
                    "dag deeper than {MAX_DAG_DEPTH} levels"
                ))
                .into());
            }

            let block = self.fetch_block(address).await?;
            match parse_node(&block)? {
                DagRecord::Leaf(payload) => Ok(payload),
                DagRecord::Internal(links) => {
                    tracing::debug!(address = %address, links = links.len(), "Fetching linked blocks");
                    let fetches: Vec<BoxFuture<'_, GatewayResult<Bytes>>> = links
                        .iter()
                        .map(|link| self.get_at_depth(&link.hash, depth + 1))
                        .collect();
                    let parts: Vec<Bytes> = stream::iter(fetches)
                    .buffered(self.concurrency)
                    .try_collect()
                    .await?;

                    let mut out = BytesMut::with_capacity(parts.iter().map(Bytes::len).sum());
                    for part in &parts {
                        out.extend_from_slice(part);
                    }
                    Ok(out.freeze())
                }
            }
        }
        .boxed()
    }

    /// Fetch one raw block and verify it against its address.
    ///
    /// A block that does not hash to `address` puts its endpoint in cooldown
    /// and the fetch moves on to another endpoint. If every attempt fails and
    /// at least one endpoint served mismatching bytes, that mismatch is the
    /// error returned.
    pub async fn fetch_block(&self, address: &Multihash) -> GatewayResult<Bytes> {
        let mut last_error = None;
        let mut mismatch = None;

        for attempt in 1..=self.retry.max_attempts {
            let endpoint = match self.registry.select(GatewayRole::Read) {
                Ok(endpoint) => endpoint,
                Err(e) => return Err(mismatch.unwrap_or(e)),
            };

            match self.transport.get_block(&endpoint, address).await {
                Ok(block) => match address.verify(&block) {
                    Ok(()) => {
                        tracing::debug!(address = %address, endpoint = %endpoint, size = block.len(), "Block fetched");
                        return Ok(block);
                    }
                    Err(e) => {
                        tracing::warn!(
                            endpoint = %endpoint,
                            address = %address,
                            attempt,
                            "Read endpoint served a block that does not match its address"
                        );
                        mismatch = Some(GatewayError::from(e));
                    }
                },
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        address = %address,
                        attempt,
                        error = %e,
                        "Block get failed"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            self.registry.mark_failure(GatewayRole::Read, &endpoint);
            if attempt < self.retry.max_attempts {
                tokio::time::sleep(self.retry.backoff(attempt)).await;
            }
        }

        Err(mismatch.unwrap_or_else(|| exhausted(self.retry.max_attempts, last_error)))
    }
}

fn exhausted(attempts: u32, last_error: Option<GatewayError>) -> GatewayError {
    GatewayError::RetriesExhausted {
        attempts,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".to_string()),
    }
}
