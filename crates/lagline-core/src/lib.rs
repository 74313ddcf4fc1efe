// File: `crates/lagline-core/src/lib.rs`
pub mod error;
pub mod mode;
pub mod record;
pub mod snapshot;

pub use error::{CoreError, Result};
pub use mode::Mode;
pub use record::{Millis, RecordId, RecordIdGenerator};
pub use snapshot::Snapshot;
