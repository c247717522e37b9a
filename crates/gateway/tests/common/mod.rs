pub mod memory;

#[allow(unused_imports)]
pub use memory::{Behavior, MemoryTransport};

use canopy_gateway::{GatewayRegistry, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Registry over the given read and write endpoints with a 30 minute cooldown.
#[allow(dead_code)]
pub fn registry(read: &[&str], write: &[&str]) -> Arc<GatewayRegistry> {
    let to_vec = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    Arc::new(
        GatewayRegistry::new(
            &to_vec(read),
            &to_vec(&["http://trusted.test"]),
            &to_vec(write),
            Duration::from_secs(30 * 60),
        )
        .unwrap(),
    )
}

/// Retry policy without sleeps.
#[allow(dead_code)]
pub fn fast_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy::immediate(attempts)
}
