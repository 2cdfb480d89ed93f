//! vcrcache - record-once, replay-forever HTTP cache for deterministic tests
//!
//! A [`ReplayHandler`] sits in front of a [`Transport`]. Requests whose
//! fingerprint is already in the cache are answered from it; others go to
//! the network and the response is recorded to a `.vcr` file that later
//! runs replay without touching the network.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod error;
pub mod exchange;
pub mod fingerprint;
pub mod network;
pub mod proxy;
pub mod replay;
pub mod storage;

pub use config::{CachePaths, Config, SettingsProvider};
pub use error::{BoxError, Result, VcrError};
pub use exchange::{Headers, Request, Response};
pub use fingerprint::Fingerprint;
pub use network::{HyperTransport, Transport};
pub use proxy::{Behaviors, ReplayHandler};
pub use replay::{CacheRegistry, CacheStore};
