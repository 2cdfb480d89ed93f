//! Network layer: the transport seam and a hyper-based implementation

mod client;
mod transport;

pub use client::HyperTransport;
pub use transport::Transport;

/// How long an idle pooled connection is kept
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Maximum idle connections kept per host
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;
