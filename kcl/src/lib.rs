//! Configuration for a Kinesis-style stream consumer.
//!
//! The crate builds the value that a consumer worker, its lease manager and
//! its metrics publisher read their settings from: failover timing, batch
//! sizes, lease and shard-sync cadence, checkpoint validation and worker
//! concurrency. It does no I/O of its own.
//!
//! # Usage
//!
//! ```rust
//! use kcl::KclConfig;
//!
//! // Only the application name, the stream name and the worker id are
//! // required; an empty worker id is replaced by a generated one.
//! let mut config = KclConfig::new("billing", "payments", "")?;
//! config
//!     .with_region_name("eu-west-3")?
//!     .with_max_records(500)?
//!     .with_call_process_records_even_for_empty_record_list(true);
//!
//! assert_eq!(config.max_records(), 500);
//! # Ok::<(), kcl::ConfigError>(())
//! ```
//!
//! Invalid overrides are rejected with [`ConfigError::InvalidArgument`] and
//! leave the configuration untouched.
//!
//! # Modules
//!
//! - [`config`] - [`KclConfig`] and the `DEFAULT_*` values
//! - [`position`] - initial position in the stream
//! - [`worker_id`] - worker identity generation

pub mod config;
pub mod position;
pub mod worker_id;

mod error;

pub use config::KclConfig;
pub use error::{ConfigError, Result};
pub use position::{InitialPositionInStream, InitialPositionInStreamExtended};
