use async_trait::async_trait;
use bytes::Bytes;
use canopy_core::Multihash;
use canopy_gateway::{BlockTransport, GatewayError, GatewayResult, PutResponse};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How an in-memory endpoint responds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Behavior {
    /// Serves and stores blocks faithfully.
    Healthy,
    /// Answers every request with 503.
    Failing,
    /// Serves blocks with one byte flipped.
    Tamper,
    /// Stores blocks but reports the address of different content.
    WrongKey,
}

/// A set of gateways sharing one block map.
#[allow(dead_code)]
pub struct MemoryTransport {
    blocks: Mutex<HashMap<Multihash, Bytes>>,
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: Mutex<HashMap<String, usize>>,
    puts: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    max_jitter_ms: u64,
}

/// Counts one request as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[allow(dead_code)]
impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            blocks: Mutex::new(HashMap::new()),
            behaviors: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            puts: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            max_jitter_ms: 0,
        }
    }

    /// Delay each request by a random 0..=max_ms so completions reorder.
    pub fn with_jitter(mut self, max_ms: u64) -> Self {
        self.max_jitter_ms = max_ms;
        self
    }

    pub fn set_behavior(&self, endpoint: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), behavior);
    }

    pub fn insert_block(&self, data: Bytes) -> Multihash {
        let hash = Multihash::compute(&data);
        self.blocks.lock().unwrap().insert(hash, data);
        hash
    }

    pub fn block(&self, hash: &Multihash) -> Option<Bytes> {
        self.blocks.lock().unwrap().get(hash).cloned()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.lock().unwrap().len()
    }

    /// Successful puts across all endpoints.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Highest number of requests observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.in_flight)
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    fn behavior(&self, endpoint: &str) -> Behavior {
        *self.calls.lock().unwrap().entry(endpoint.to_string()).or_default() += 1;
        self.behaviors
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(Behavior::Healthy)
    }

    async fn jitter(&self) {
        if self.max_jitter_ms > 0 {
            let ms = rand::rng().random_range(0..=self.max_jitter_ms);
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

fn unavailable() -> GatewayError {
    GatewayError::Status {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

#[async_trait]
impl BlockTransport for MemoryTransport {
    async fn get_block(&self, endpoint: &str, address: &Multihash) -> GatewayResult<Bytes> {
        let _guard = self.enter();
        let behavior = self.behavior(endpoint);
        self.jitter().await;

        match behavior {
            Behavior::Failing => Err(unavailable()),
            Behavior::Healthy | Behavior::WrongKey => {
                self.block(address).ok_or_else(|| GatewayError::Status {
                    status: 404,
                    body: format!("block {address} not found"),
                })
            }
            Behavior::Tamper => {
                let block = self.block(address).ok_or_else(unavailable)?;
                let mut tampered = block.to_vec();
                tampered[0] ^= 0x01;
                Ok(Bytes::from(tampered))
            }
        }
    }

    async fn put_block(&self, endpoint: &str, block: Bytes) -> GatewayResult<PutResponse> {
        let _guard = self.enter();
        let behavior = self.behavior(endpoint);
        self.jitter().await;

        match behavior {
            Behavior::Failing => Err(unavailable()),
            Behavior::Healthy | Behavior::Tamper => {
                let size = block.len() as u64;
                let key = self.insert_block(block).to_base58();
                self.puts.fetch_add(1, Ordering::SeqCst);
                Ok(PutResponse { key, size })
            }
            Behavior::WrongKey => {
                let size = block.len() as u64;
                self.insert_block(block);
                Ok(PutResponse {
                    key: Multihash::compute(b"something else").to_base58(),
                    size,
                })
            }
        }
    }
}
