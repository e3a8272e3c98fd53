// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod consumer;
pub mod digest;
pub mod error;
pub mod generate;
pub mod metrics;
pub mod producer;
pub mod render;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::consumer::Consumer;
pub use crate::digest::{Digest, Story};
pub use crate::error::{ConsumerError, FetchError, GenerateError, ProducerError};
pub use crate::producer::{Producer, RunOutcome};
