//! Lagline pipeline - staged propagation with randomized lag
//!
//! This crate wires four in-process stages into an eventually-consistent
//! pipeline:
//!
//! ```text
//! SourceFeed --> DelayStage --> Accumulator --> Poller --> viewers
//!                                    |
//!                                    +--> ModeStore (BOOT -> LIVE)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lagline_pipeline::{Pipeline, PipelineConfigBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PipelineConfigBuilder::new()
//!         .feed_interval(1_000)
//!         .max_lag(5_000)
//!         .poll_interval(1_000)
//!         .build();
//!     let pipeline = Pipeline::start(config);
//!
//!     let mut fetched = pipeline.subscribe_data_fetched();
//!     while let Ok(event) = fetched.recv().await {
//!         println!("tick {} saw {} records", event.tick(), event.snapshot().len());
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`source`] - Cumulative snapshot producer
//! - [`delay`] - Per-delivery randomized lag
//! - [`accumulator`] - Replace-on-arrival buffer and first-load gate
//! - [`poller`] - Periodic republisher of the accumulated view
//! - [`mode`] - Shared `BOOT`/`LIVE` flag
//! - [`topic`] - Lossless fan-out between stages
//! - [`lag`] - Lag samplers
//! - [`config`] - Timing configuration
//! - [`pipeline`] - Wiring
//! - [`error`] - Error types

pub mod accumulator;
pub mod config;
pub mod delay;
pub mod error;
pub mod lag;
pub mod mode;
pub mod pipeline;
pub mod poller;
pub mod source;
pub mod topic;

// Re-exports for convenience
pub use accumulator::{Accumulator, AccumulatorEvent, AccumulatorState, ApplyOutcome};
pub use config::{LagStrategy, PipelineConfig, PipelineConfigBuilder};
pub use delay::DelayStage;
pub use error::{PipelineError, Result};
pub use lag::{LagSampler, ScriptedLag, UniformLag};
pub use mode::ModeStore;
pub use pipeline::Pipeline;
pub use poller::{Poller, PollerEvent, SnapshotSource};
pub use source::SourceFeed;
pub use topic::{SnapshotFeed, Topic};

pub use lagline_core::{CoreError, Millis, Mode, RecordId, Snapshot};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::accumulator::{Accumulator, ApplyOutcome};
    pub use crate::config::{PipelineConfig, PipelineConfigBuilder};
    pub use crate::error::PipelineError;
    pub use crate::mode::ModeStore;
    pub use crate::pipeline::Pipeline;
    pub use crate::poller::PollerEvent;
    pub use lagline_core::{Mode, Snapshot};
}
