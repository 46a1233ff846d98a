//! Client configuration: defaults, fluent overrides and their validation.
//!
//! A [`KclConfig`] is created once with [`KclConfig::new`], adjusted through
//! zero or more `with_*` calls, then handed to the worker, lease manager and
//! metrics publisher as a read-only value. Overrides take `&mut self`, so once
//! the configuration is shared behind `&` or an `Arc` it can no longer change.
//!
//! ```rust
//! use kcl::{InitialPositionInStream, KclConfig};
//!
//! let mut config = KclConfig::new("orders-app", "orders", "")?;
//! config
//!     .with_max_records(500)?
//!     .with_failover_time_millis(20_000)?
//!     .with_initial_position_in_stream(InitialPositionInStream::Latest)?;
//!
//! assert_eq!(config.table_name(), "orders-app");
//! assert!(!config.worker_id().is_empty());
//! # Ok::<(), kcl::ConfigError>(())
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::position::{InitialPositionInStream, InitialPositionInStreamExtended};
use crate::worker_id;

/// Where a worker starts when a shard has no checkpoint yet.
pub const DEFAULT_INITIAL_POSITION_IN_STREAM: InitialPositionInStream =
    InitialPositionInStream::TrimHorizon;

/// Time after which a lease that was not renewed is considered expired and
/// can be taken over by another worker.
pub const DEFAULT_FAILOVER_TIME_MILLIS: u64 = 10_000;

/// Maximum number of records fetched by a single `GetRecords` call.
pub const DEFAULT_MAX_RECORDS: u32 = 10_000;

/// Sleep between reads when the previous read returned no records.
pub const DEFAULT_IDLETIME_BETWEEN_READS_MILLIS: u64 = 1_000;

/// Empty reads do not reach the record processor.
pub const DEFAULT_DONT_CALL_PROCESS_RECORDS_FOR_EMPTY_RECORD_LIST: bool = false;

/// Interval at which a child shard checks whether its parents are done.
pub const DEFAULT_PARENT_SHARD_POLL_INTERVAL_MILLIS: u64 = 10_000;

/// Interval between shard discoveries.
pub const DEFAULT_SHARD_SYNC_INTERVAL_MILLIS: u64 = 60_000;

/// Leases of fully processed shards are removed before they expire.
pub const DEFAULT_CLEANUP_LEASES_UPON_SHARDS_COMPLETION: bool = true;

/// Backoff applied after a failed task before it is retried.
pub const DEFAULT_TASK_BACKOFF_TIME_MILLIS: u64 = 500;

/// Metrics are buffered at most this long before being published.
pub const DEFAULT_METRICS_BUFFER_TIME_MILLIS: u64 = 10_000;

/// Maximum number of metrics buffered before being published.
pub const DEFAULT_METRICS_MAX_QUEUE_SIZE: usize = 10_000;

/// Sequence numbers are checked against the stream before a checkpoint.
pub const DEFAULT_VALIDATE_SEQUENCE_NUMBER_BEFORE_CHECKPOINTING: bool = true;

/// Time a shutting down worker waits for its record processors.
pub const DEFAULT_SHUTDOWN_GRACE_MILLIS: u64 = 5_000;

/// Effectively unbounded; matches `i16::MAX`.
pub const DEFAULT_MAX_LEASES_FOR_WORKER: u32 = 32_767;

/// Number of leases a worker may take from others in one balancing round.
pub const DEFAULT_MAX_LEASES_TO_STEAL_AT_ONE_TIME: u32 = 1;

/// Read capacity of the lease table when it is created.
pub const DEFAULT_INITIAL_LEASE_TABLE_READ_CAPACITY: u64 = 10;

/// Write capacity of the lease table when it is created.
pub const DEFAULT_INITIAL_LEASE_TABLE_WRITE_CAPACITY: u64 = 10;

/// Shard discovery always runs when a worker starts.
pub const DEFAULT_SKIP_SHARD_SYNC_AT_STARTUP_IF_LEASES_EXIST: bool = false;

/// Record processors run one at a time per worker.
pub const DEFAULT_WORKER_THREAD_POOL_SIZE: usize = 1;

/// Configuration of a stream consumer worker.
///
/// Fields are private so the invariants established by [`KclConfig::new`]
/// and the `with_*` overrides hold for the lifetime of the value:
///
/// - application and stream names are never empty and cannot be changed,
/// - the worker id is never empty,
/// - every numeric setting is strictly positive,
/// - the initial position carries a timestamp if and only if it is
///   `AT_TIMESTAMP`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigRepr", into = "ConfigRepr")]
pub struct KclConfig {
    application_name: String,
    table_name: String,
    stream_name: String,
    worker_id: String,
    kinesis_endpoint: String,
    region_name: String,
    initial_position: InitialPositionInStreamExtended,
    failover_time_millis: u64,
    max_records: u32,
    idle_time_between_reads_in_millis: u64,
    call_process_records_even_for_empty_record_list: bool,
    parent_shard_poll_interval_millis: u64,
    shard_sync_interval_millis: u64,
    cleanup_terminated_shards_before_expiry: bool,
    task_backoff_time_millis: u64,
    metrics_buffer_time_millis: u64,
    metrics_max_queue_size: usize,
    validate_sequence_number_before_checkpointing: bool,
    shutdown_grace_millis: u64,
    max_leases_for_worker: u32,
    max_leases_to_steal_at_one_time: u32,
    initial_lease_table_read_capacity: u64,
    initial_lease_table_write_capacity: u64,
    skip_shard_sync_at_worker_initialization_if_leases_exist: bool,
    worker_thread_pool_size: usize,
}

impl KclConfig {
    /// Creates a configuration with every optional setting at its default.
    ///
    /// `application_name` and `stream_name` must not be empty. An empty
    /// `worker_id` is replaced by a freshly generated one. The lease table is
    /// named after the application.
    pub fn new(
        application_name: impl Into<String>,
        stream_name: impl Into<String>,
        worker_id: impl Into<String>,
    ) -> Result<Self> {
        let application_name = application_name.into();
        let stream_name = stream_name.into();
        let mut worker_id = worker_id.into();

        check_not_empty("ApplicationName", &application_name)?;
        check_not_empty("StreamName", &stream_name)?;

        if worker_id.is_empty() {
            worker_id = worker_id::generate();
            tracing::debug!(%worker_id, "no worker id given, generated one");
        }

        Ok(Self {
            table_name: application_name.clone(),
            application_name,
            stream_name,
            worker_id,
            kinesis_endpoint: String::new(),
            region_name: String::new(),
            initial_position: InitialPositionInStreamExtended::new(
                DEFAULT_INITIAL_POSITION_IN_STREAM,
            )?,
            failover_time_millis: DEFAULT_FAILOVER_TIME_MILLIS,
            max_records: DEFAULT_MAX_RECORDS,
            idle_time_between_reads_in_millis: DEFAULT_IDLETIME_BETWEEN_READS_MILLIS,
            call_process_records_even_for_empty_record_list:
                DEFAULT_DONT_CALL_PROCESS_RECORDS_FOR_EMPTY_RECORD_LIST,
            parent_shard_poll_interval_millis: DEFAULT_PARENT_SHARD_POLL_INTERVAL_MILLIS,
            shard_sync_interval_millis: DEFAULT_SHARD_SYNC_INTERVAL_MILLIS,
            cleanup_terminated_shards_before_expiry: DEFAULT_CLEANUP_LEASES_UPON_SHARDS_COMPLETION,
            task_backoff_time_millis: DEFAULT_TASK_BACKOFF_TIME_MILLIS,
            metrics_buffer_time_millis: DEFAULT_METRICS_BUFFER_TIME_MILLIS,
            metrics_max_queue_size: DEFAULT_METRICS_MAX_QUEUE_SIZE,
            validate_sequence_number_before_checkpointing:
                DEFAULT_VALIDATE_SEQUENCE_NUMBER_BEFORE_CHECKPOINTING,
            shutdown_grace_millis: DEFAULT_SHUTDOWN_GRACE_MILLIS,
            max_leases_for_worker: DEFAULT_MAX_LEASES_FOR_WORKER,
            max_leases_to_steal_at_one_time: DEFAULT_MAX_LEASES_TO_STEAL_AT_ONE_TIME,
            initial_lease_table_read_capacity: DEFAULT_INITIAL_LEASE_TABLE_READ_CAPACITY,
            initial_lease_table_write_capacity: DEFAULT_INITIAL_LEASE_TABLE_WRITE_CAPACITY,
            skip_shard_sync_at_worker_initialization_if_leases_exist:
                DEFAULT_SKIP_SHARD_SYNC_AT_STARTUP_IF_LEASES_EXIST,
            worker_thread_pool_size: DEFAULT_WORKER_THREAD_POOL_SIZE,
        })
    }

    /// Replaces the worker id, which identifies this worker as a lease owner.
    pub fn with_worker_id(&mut self, worker_id: impl Into<String>) -> Result<&mut Self> {
        let worker_id = worker_id.into();
        check_not_empty("WorkerID", &worker_id)?;
        self.worker_id = worker_id;
        Ok(self)
    }

    /// Uses an alternative lease table instead of the application name.
    pub fn with_table_name(&mut self, table_name: impl Into<String>) -> Result<&mut Self> {
        let table_name = table_name.into();
        check_not_empty("TableName", &table_name)?;
        self.table_name = table_name;
        Ok(self)
    }

    /// Points the stream client at a custom endpoint (e.g. a local emulator).
    pub fn with_kinesis_endpoint(&mut self, endpoint: impl Into<String>) -> Result<&mut Self> {
        let endpoint = endpoint.into();
        check_not_empty("KinesisEndpoint", &endpoint)?;
        self.kinesis_endpoint = endpoint;
        Ok(self)
    }

    /// Region of the stream and the lease table.
    pub fn with_region_name(&mut self, region_name: impl Into<String>) -> Result<&mut Self> {
        let region_name = region_name.into();
        check_not_empty("RegionName", &region_name)?;
        self.region_name = region_name;
        Ok(self)
    }

    /// Starts new shards at `TRIM_HORIZON` or `LATEST`.
    ///
    /// `AT_TIMESTAMP` is rejected since it needs a timestamp; use
    /// [`Self::with_timestamp_at_initial_position_in_stream`] instead.
    pub fn with_initial_position_in_stream(
        &mut self,
        position: InitialPositionInStream,
    ) -> Result<&mut Self> {
        self.initial_position = InitialPositionInStreamExtended::new(position)?;
        Ok(self)
    }

    /// Starts new shards at the first record at or after `timestamp`.
    ///
    /// Any timestamp is accepted. One in the future only logs a warning:
    /// reads return nothing until it has passed.
    pub fn with_timestamp_at_initial_position_in_stream(
        &mut self,
        timestamp: DateTime<Utc>,
    ) -> &mut Self {
        if timestamp > Utc::now() {
            tracing::warn!(
                %timestamp,
                "initial position timestamp is in the future, no records will be read before it"
            );
        }

        self.initial_position = InitialPositionInStreamExtended::at_timestamp(timestamp);
        self
    }

    /// Time after which a lease that was not renewed can be taken over.
    pub fn with_failover_time_millis(&mut self, millis: u64) -> Result<&mut Self> {
        self.failover_time_millis = check_positive("FailoverTimeMillis", millis)?;
        Ok(self)
    }

    /// Maximum number of records returned by one read.
    pub fn with_max_records(&mut self, max_records: u32) -> Result<&mut Self> {
        self.max_records = check_positive("MaxRecords", max_records)?;
        Ok(self)
    }

    /// How long to sleep when a read returned no records.
    ///
    /// Only used on empty reads; a non-empty read is followed immediately by
    /// the next one. A large value may keep the worker from catching up, in
    /// which case enabling
    /// [`Self::with_call_process_records_even_for_empty_record_list`] helps
    /// to observe how far behind the stream the processor is.
    pub fn with_idle_time_between_reads_in_millis(&mut self, millis: u64) -> Result<&mut Self> {
        self.idle_time_between_reads_in_millis =
            check_positive("IdleTimeBetweenReadsInMillis", millis)?;
        Ok(self)
    }

    /// Hands empty reads to the record processor too.
    pub fn with_call_process_records_even_for_empty_record_list(
        &mut self,
        call: bool,
    ) -> &mut Self {
        self.call_process_records_even_for_empty_record_list = call;
        self
    }

    /// How often a child shard checks whether its parents are finished.
    pub fn with_parent_shard_poll_interval_millis(&mut self, millis: u64) -> Result<&mut Self> {
        self.parent_shard_poll_interval_millis =
            check_positive("ParentShardPollIntervalMillis", millis)?;
        Ok(self)
    }

    /// Interval between shard discoveries.
    pub fn with_shard_sync_interval_millis(&mut self, millis: u64) -> Result<&mut Self> {
        self.shard_sync_interval_millis = check_positive("ShardSyncIntervalMillis", millis)?;
        Ok(self)
    }

    /// Removes leases of finished shards without waiting for them to expire.
    pub fn with_cleanup_terminated_shards_before_expiry(&mut self, cleanup: bool) -> &mut Self {
        self.cleanup_terminated_shards_before_expiry = cleanup;
        self
    }

    /// Wait before a failed task is retried.
    pub fn with_task_backoff_time_millis(&mut self, millis: u64) -> Result<&mut Self> {
        self.task_backoff_time_millis = check_positive("TaskBackoffTimeMillis", millis)?;
        Ok(self)
    }

    /// Metrics are buffered for at most this long before being published.
    pub fn with_metrics_buffer_time_millis(&mut self, millis: u64) -> Result<&mut Self> {
        self.metrics_buffer_time_millis = check_positive("MetricsBufferTimeMillis", millis)?;
        Ok(self)
    }

    /// Maximum number of metrics buffered before being published.
    pub fn with_metrics_max_queue_size(&mut self, size: usize) -> Result<&mut Self> {
        self.metrics_max_queue_size = check_positive("MetricsMaxQueueSize", size)?;
        Ok(self)
    }

    /// Checks a sequence number against the stream before checkpointing it.
    pub fn with_validate_sequence_number_before_checkpointing(
        &mut self,
        validate: bool,
    ) -> &mut Self {
        self.validate_sequence_number_before_checkpointing = validate;
        self
    }

    /// Time record processors get to finish when the worker shuts down.
    pub fn with_shutdown_grace_millis(&mut self, millis: u64) -> Result<&mut Self> {
        self.shutdown_grace_millis = check_positive("ShutdownGraceMillis", millis)?;
        Ok(self)
    }

    /// Upper bound on the leases one worker holds.
    pub fn with_max_leases_for_worker(&mut self, max: u32) -> Result<&mut Self> {
        self.max_leases_for_worker = check_positive("MaxLeasesForWorker", max)?;
        Ok(self)
    }

    /// Leases taken from other workers in one balancing round.
    pub fn with_max_leases_to_steal_at_one_time(&mut self, max: u32) -> Result<&mut Self> {
        self.max_leases_to_steal_at_one_time = check_positive("MaxLeasesToStealAtOneTime", max)?;
        Ok(self)
    }

    /// Read capacity used when the lease table is created.
    pub fn with_initial_lease_table_read_capacity(&mut self, capacity: u64) -> Result<&mut Self> {
        self.initial_lease_table_read_capacity =
            check_positive("InitialLeaseTableReadCapacity", capacity)?;
        Ok(self)
    }

    /// Write capacity used when the lease table is created.
    pub fn with_initial_lease_table_write_capacity(&mut self, capacity: u64) -> Result<&mut Self> {
        self.initial_lease_table_write_capacity =
            check_positive("InitialLeaseTableWriteCapacity", capacity)?;
        Ok(self)
    }

    /// Skips shard discovery at startup when the lease table already has leases.
    pub fn with_skip_shard_sync_at_worker_initialization_if_leases_exist(
        &mut self,
        skip: bool,
    ) -> &mut Self {
        self.skip_shard_sync_at_worker_initialization_if_leases_exist = skip;
        self
    }

    /// Number of record processors run concurrently by one worker.
    pub fn with_worker_thread_pool_size(&mut self, size: usize) -> Result<&mut Self> {
        self.worker_thread_pool_size = check_positive("WorkerThreadPoolSize", size)?;
        Ok(self)
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Empty means the default endpoint for the region.
    pub fn kinesis_endpoint(&self) -> &str {
        &self.kinesis_endpoint
    }

    /// Empty means the region is resolved by the client.
    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    pub fn initial_position_in_stream(&self) -> InitialPositionInStream {
        self.initial_position.position()
    }

    pub fn initial_position_in_stream_extended(&self) -> &InitialPositionInStreamExtended {
        &self.initial_position
    }

    pub fn failover_time_millis(&self) -> u64 {
        self.failover_time_millis
    }

    pub fn failover_time(&self) -> Duration {
        Duration::from_millis(self.failover_time_millis)
    }

    pub fn max_records(&self) -> u32 {
        self.max_records
    }

    pub fn idle_time_between_reads_in_millis(&self) -> u64 {
        self.idle_time_between_reads_in_millis
    }

    pub fn idle_time_between_reads(&self) -> Duration {
        Duration::from_millis(self.idle_time_between_reads_in_millis)
    }

    pub fn call_process_records_even_for_empty_record_list(&self) -> bool {
        self.call_process_records_even_for_empty_record_list
    }

    pub fn parent_shard_poll_interval_millis(&self) -> u64 {
        self.parent_shard_poll_interval_millis
    }

    pub fn parent_shard_poll_interval(&self) -> Duration {
        Duration::from_millis(self.parent_shard_poll_interval_millis)
    }

    pub fn shard_sync_interval_millis(&self) -> u64 {
        self.shard_sync_interval_millis
    }

    pub fn shard_sync_interval(&self) -> Duration {
        Duration::from_millis(self.shard_sync_interval_millis)
    }

    pub fn cleanup_terminated_shards_before_expiry(&self) -> bool {
        self.cleanup_terminated_shards_before_expiry
    }

    pub fn task_backoff_time_millis(&self) -> u64 {
        self.task_backoff_time_millis
    }

    pub fn task_backoff_time(&self) -> Duration {
        Duration::from_millis(self.task_backoff_time_millis)
    }

    pub fn metrics_buffer_time_millis(&self) -> u64 {
        self.metrics_buffer_time_millis
    }

    pub fn metrics_buffer_time(&self) -> Duration {
        Duration::from_millis(self.metrics_buffer_time_millis)
    }

    pub fn metrics_max_queue_size(&self) -> usize {
        self.metrics_max_queue_size
    }

    pub fn validate_sequence_number_before_checkpointing(&self) -> bool {
        self.validate_sequence_number_before_checkpointing
    }

    pub fn shutdown_grace_millis(&self) -> u64 {
        self.shutdown_grace_millis
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_millis)
    }

    pub fn max_leases_for_worker(&self) -> u32 {
        self.max_leases_for_worker
    }

    pub fn max_leases_to_steal_at_one_time(&self) -> u32 {
        self.max_leases_to_steal_at_one_time
    }

    pub fn initial_lease_table_read_capacity(&self) -> u64 {
        self.initial_lease_table_read_capacity
    }

    pub fn initial_lease_table_write_capacity(&self) -> u64 {
        self.initial_lease_table_write_capacity
    }

    pub fn skip_shard_sync_at_worker_initialization_if_leases_exist(&self) -> bool {
        self.skip_shard_sync_at_worker_initialization_if_leases_exist
    }

    pub fn worker_thread_pool_size(&self) -> usize {
        self.worker_thread_pool_size
    }
}

fn check_not_empty(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ConfigError::invalid_argument(field, "must not be empty"));
    }

    Ok(())
}

fn check_positive<T>(field: &'static str, value: T) -> Result<T>
where
    T: Copy + Default + PartialOrd + std::fmt::Display,
{
    if value <= T::default() {
        return Err(ConfigError::invalid_argument(
            field,
            format!("must be positive, got {value}"),
        ));
    }

    Ok(value)
}

/// Serialized form of [`KclConfig`].
///
/// Only the names are required and unknown keys are rejected. Deserialization replays the values through
/// [`KclConfig::new`] and the overrides, so a document cannot produce a
/// configuration the builder would have rejected.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigRepr {
    application_name: String,
    stream_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    worker_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kinesis_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    region_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    initial_position_in_stream: Option<InitialPositionInStream>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp_at_initial_position_in_stream: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failover_time_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_records: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    idle_time_between_reads_in_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    call_process_records_even_for_empty_record_list: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_shard_poll_interval_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shard_sync_interval_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cleanup_terminated_shards_before_expiry: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task_backoff_time_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metrics_buffer_time_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metrics_max_queue_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validate_sequence_number_before_checkpointing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shutdown_grace_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_leases_for_worker: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_leases_to_steal_at_one_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    initial_lease_table_read_capacity: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    initial_lease_table_write_capacity: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    skip_shard_sync_at_worker_initialization_if_leases_exist: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    worker_thread_pool_size: Option<usize>,
}

impl TryFrom<ConfigRepr> for KclConfig {
    type Error = ConfigError;

    fn try_from(repr: ConfigRepr) -> Result<Self> {
        let mut config = KclConfig::new(
            repr.application_name,
            repr.stream_name,
            repr.worker_id.unwrap_or_default(),
        )?;

        if let Some(table_name) = repr.table_name {
            config.with_table_name(table_name)?;
        }
        if let Some(endpoint) = repr.kinesis_endpoint {
            config.with_kinesis_endpoint(endpoint)?;
        }
        if let Some(region_name) = repr.region_name {
            config.with_region_name(region_name)?;
        }

        match (
            repr.initial_position_in_stream,
            repr.timestamp_at_initial_position_in_stream,
        ) {
            (Some(InitialPositionInStream::AtTimestamp), Some(timestamp)) => {
                config.with_timestamp_at_initial_position_in_stream(timestamp);
            }
            (_, Some(_)) => {
                return Err(ConfigError::invalid_argument(
                    "TimestampAtInitialPositionInStream",
                    "only allowed with AT_TIMESTAMP",
                ));
            }
            (Some(position), None) => {
                config.with_initial_position_in_stream(position)?;
            }
            (None, None) => {}
        }

        if let Some(v) = repr.failover_time_millis {
            config.with_failover_time_millis(v)?;
        }
        if let Some(v) = repr.max_records {
            config.with_max_records(v)?;
        }
        if let Some(v) = repr.idle_time_between_reads_in_millis {
            config.with_idle_time_between_reads_in_millis(v)?;
        }
        if let Some(v) = repr.call_process_records_even_for_empty_record_list {
            config.with_call_process_records_even_for_empty_record_list(v);
        }
        if let Some(v) = repr.parent_shard_poll_interval_millis {
            config.with_parent_shard_poll_interval_millis(v)?;
        }
        if let Some(v) = repr.shard_sync_interval_millis {
            config.with_shard_sync_interval_millis(v)?;
        }
        if let Some(v) = repr.cleanup_terminated_shards_before_expiry {
            config.with_cleanup_terminated_shards_before_expiry(v);
        }
        if let Some(v) = repr.task_backoff_time_millis {
            config.with_task_backoff_time_millis(v)?;
        }
        if let Some(v) = repr.metrics_buffer_time_millis {
            config.with_metrics_buffer_time_millis(v)?;
        }
        if let Some(v) = repr.metrics_max_queue_size {
            config.with_metrics_max_queue_size(v)?;
        }
        if let Some(v) = repr.validate_sequence_number_before_checkpointing {
            config.with_validate_sequence_number_before_checkpointing(v);
        }
        if let Some(v) = repr.shutdown_grace_millis {
            config.with_shutdown_grace_millis(v)?;
        }
        if let Some(v) = repr.max_leases_for_worker {
            config.with_max_leases_for_worker(v)?;
        }
        if let Some(v) = repr.max_leases_to_steal_at_one_time {
            config.with_max_leases_to_steal_at_one_time(v)?;
        }
        if let Some(v) = repr.initial_lease_table_read_capacity {
            config.with_initial_lease_table_read_capacity(v)?;
        }
        if let Some(v) = repr.initial_lease_table_write_capacity {
            config.with_initial_lease_table_write_capacity(v)?;
        }
        if let Some(v) = repr.skip_shard_sync_at_worker_initialization_if_leases_exist {
            config.with_skip_shard_sync_at_worker_initialization_if_leases_exist(v);
        }
        if let Some(v) = repr.worker_thread_pool_size {
            config.with_worker_thread_pool_size(v)?;
        }

        Ok(config)
    }
}

impl From<KclConfig> for ConfigRepr {
    fn from(config: KclConfig) -> Self {
        let non_empty = |s: String| (!s.is_empty()).then_some(s);

        Self {
            application_name: config.application_name,
            stream_name: config.stream_name,
            worker_id: Some(config.worker_id),
            table_name: Some(config.table_name),
            kinesis_endpoint: non_empty(config.kinesis_endpoint),
            region_name: non_empty(config.region_name),
            initial_position_in_stream: Some(config.initial_position.position()),
            timestamp_at_initial_position_in_stream: config.initial_position.timestamp(),
            failover_time_millis: Some(config.failover_time_millis),
            max_records: Some(config.max_records),
            idle_time_between_reads_in_millis: Some(config.idle_time_between_reads_in_millis),
            call_process_records_even_for_empty_record_list: Some(
                config.call_process_records_even_for_empty_record_list,
            ),
            parent_shard_poll_interval_millis: Some(config.parent_shard_poll_interval_millis),
            shard_sync_interval_millis: Some(config.shard_sync_interval_millis),
            cleanup_terminated_shards_before_expiry: Some(
                config.cleanup_terminated_shards_before_expiry,
            ),
            task_backoff_time_millis: Some(config.task_backoff_time_millis),
            metrics_buffer_time_millis: Some(config.metrics_buffer_time_millis),
            metrics_max_queue_size: Some(config.metrics_max_queue_size),
            validate_sequence_number_before_checkpointing: Some(
                config.validate_sequence_number_before_checkpointing,
            ),
            shutdown_grace_millis: Some(config.shutdown_grace_millis),
            max_leases_for_worker: Some(config.max_leases_for_worker),
            max_leases_to_steal_at_one_time: Some(config.max_leases_to_steal_at_one_time),
            initial_lease_table_read_capacity: Some(config.initial_lease_table_read_capacity),
            initial_lease_table_write_capacity: Some(config.initial_lease_table_write_capacity),
            skip_shard_sync_at_worker_initialization_if_leases_exist: Some(
                config.skip_shard_sync_at_worker_initialization_if_leases_exist,
            ),
            worker_thread_pool_size: Some(config.worker_thread_pool_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> KclConfig {
        KclConfig::new("app", "stream", "worker-1").unwrap()
    }

    #[test]
    fn test_new_populates_defaults() {
        let config = KclConfig::new("app", "stream", "").unwrap();

        assert_eq!(config.application_name(), "app");
        assert_eq!(config.stream_name(), "stream");
        assert_eq!(config.table_name(), "app");
        assert!(!config.worker_id().is_empty());
        assert_eq!(config.kinesis_endpoint(), "");
        assert_eq!(config.region_name(), "");
        assert_eq!(
            config.initial_position_in_stream(),
            InitialPositionInStream::TrimHorizon
        );
        assert_eq!(config.initial_position_in_stream_extended().timestamp(), None);
        assert_eq!(config.failover_time_millis(), 10_000);
        assert_eq!(config.max_records(), 10_000);
        assert_eq!(config.idle_time_between_reads_in_millis(), 1_000);
        assert!(!config.call_process_records_even_for_empty_record_list());
        assert_eq!(config.parent_shard_poll_interval_millis(), 10_000);
        assert_eq!(config.shard_sync_interval_millis(), 60_000);
        assert!(config.cleanup_terminated_shards_before_expiry());
        assert_eq!(config.task_backoff_time_millis(), 500);
        assert_eq!(config.metrics_buffer_time_millis(), 10_000);
        assert_eq!(config.metrics_max_queue_size(), 10_000);
        assert!(config.validate_sequence_number_before_checkpointing());
        assert_eq!(config.shutdown_grace_millis(), 5_000);
        assert_eq!(config.max_leases_for_worker(), 32_767);
        assert_eq!(config.max_leases_to_steal_at_one_time(), 1);
        assert_eq!(config.initial_lease_table_read_capacity(), 10);
        assert_eq!(config.initial_lease_table_write_capacity(), 10);
        assert!(!config.skip_shard_sync_at_worker_initialization_if_leases_exist());
        assert_eq!(config.worker_thread_pool_size(), 1);
    }

    #[test]
    fn test_new_keeps_given_worker_id() {
        assert_eq!(config().worker_id(), "worker-1");
    }

    #[test]
    fn test_new_rejects_empty_application_name() {
        let err = KclConfig::new("", "stream", "worker-1").unwrap_err();
        assert_eq!(err.field(), "ApplicationName");
    }

    #[test]
    fn test_new_rejects_empty_stream_name() {
        let err = KclConfig::new("app", "", "worker-1").unwrap_err();
        assert_eq!(err.field(), "StreamName");
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_generated_worker_ids_differ() {
        let a = KclConfig::new("app", "stream", "").unwrap();
        let b = KclConfig::new("app", "stream", "").unwrap();
        assert_ne!(a.worker_id(), b.worker_id());
    }

    #[test]
    fn test_numeric_overrides_reject_zero() {
        let mut config = config();
        let before = config.clone();

        let errors = [
            config.with_failover_time_millis(0).map(|_| ()).unwrap_err(),
            config.with_max_records(0).map(|_| ()).unwrap_err(),
            config.with_idle_time_between_reads_in_millis(0).map(|_| ()).unwrap_err(),
            config.with_parent_shard_poll_interval_millis(0).map(|_| ()).unwrap_err(),
            config.with_shard_sync_interval_millis(0).map(|_| ()).unwrap_err(),
            config.with_task_backoff_time_millis(0).map(|_| ()).unwrap_err(),
            config.with_metrics_buffer_time_millis(0).map(|_| ()).unwrap_err(),
            config.with_metrics_max_queue_size(0).map(|_| ()).unwrap_err(),
            config.with_shutdown_grace_millis(0).map(|_| ()).unwrap_err(),
            config.with_max_leases_for_worker(0).map(|_| ()).unwrap_err(),
            config.with_max_leases_to_steal_at_one_time(0).map(|_| ()).unwrap_err(),
            config.with_initial_lease_table_read_capacity(0).map(|_| ()).unwrap_err(),
            config.with_initial_lease_table_write_capacity(0).map(|_| ()).unwrap_err(),
            config.with_worker_thread_pool_size(0).map(|_| ()).unwrap_err(),
        ];

        for err in &errors {
            assert!(matches!(err, ConfigError::InvalidArgument { .. }));
            assert!(err.to_string().contains("must be positive, got 0"));
        }
        assert_eq!(config, before);
    }

    #[test]
    fn test_numeric_overrides_accept_one() {
        let mut config = config();
        config
            .with_failover_time_millis(1)
            .unwrap()
            .with_max_records(1)
            .unwrap()
            .with_max_leases_to_steal_at_one_time(1)
            .unwrap()
            .with_worker_thread_pool_size(1)
            .unwrap();

        assert_eq!(config.failover_time_millis(), 1);
        assert_eq!(config.max_records(), 1);
        assert_eq!(config.worker_thread_pool_size(), 1);
    }

    #[test]
    fn test_overrides_set_their_own_field() {
        let mut config = config();
        config
            .with_worker_id("worker-2")
            .unwrap()
            .with_failover_time_millis(11)
            .unwrap()
            .with_max_records(12)
            .unwrap()
            .with_idle_time_between_reads_in_millis(13)
            .unwrap()
            .with_call_process_records_even_for_empty_record_list(true)
            .with_parent_shard_poll_interval_millis(14)
            .unwrap()
            .with_shard_sync_interval_millis(15)
            .unwrap()
            .with_cleanup_terminated_shards_before_expiry(false)
            .with_task_backoff_time_millis(16)
            .unwrap()
            .with_metrics_buffer_time_millis(17)
            .unwrap()
            .with_metrics_max_queue_size(18)
            .unwrap()
            .with_validate_sequence_number_before_checkpointing(false)
            .with_shutdown_grace_millis(19)
            .unwrap()
            .with_max_leases_for_worker(20)
            .unwrap()
            .with_max_leases_to_steal_at_one_time(21)
            .unwrap()
            .with_initial_lease_table_read_capacity(22)
            .unwrap()
            .with_initial_lease_table_write_capacity(23)
            .unwrap()
            .with_skip_shard_sync_at_worker_initialization_if_leases_exist(true)
            .with_worker_thread_pool_size(24)
            .unwrap();

        assert_eq!(config.worker_id(), "worker-2");
        assert_eq!(config.failover_time_millis(), 11);
        assert_eq!(config.max_records(), 12);
        assert_eq!(config.idle_time_between_reads_in_millis(), 13);
        assert!(config.call_process_records_even_for_empty_record_list());
        assert_eq!(config.parent_shard_poll_interval_millis(), 14);
        assert_eq!(config.shard_sync_interval_millis(), 15);
        assert!(!config.cleanup_terminated_shards_before_expiry());
        assert_eq!(config.task_backoff_time_millis(), 16);
        assert_eq!(config.metrics_buffer_time_millis(), 17);
        assert_eq!(config.metrics_max_queue_size(), 18);
        assert!(!config.validate_sequence_number_before_checkpointing());
        assert_eq!(config.shutdown_grace_millis(), 19);
        assert_eq!(config.max_leases_for_worker(), 20);
        assert_eq!(config.max_leases_to_steal_at_one_time(), 21);
        assert_eq!(config.initial_lease_table_read_capacity(), 22);
        assert_eq!(config.initial_lease_table_write_capacity(), 23);
        assert!(config.skip_shard_sync_at_worker_initialization_if_leases_exist());
        assert_eq!(config.worker_thread_pool_size(), 24);
        assert_eq!(config.application_name(), "app");
        assert_eq!(config.stream_name(), "stream");
    }

    #[test]
    fn test_string_overrides_reject_empty() {
        let mut config = config();
        config.with_region_name("eu-west-3").unwrap();
        let before = config.clone();

        let err = config.with_worker_id("").map(|_| ()).unwrap_err();
        assert_eq!(err.field(), "WorkerID");
        let err = config.with_table_name("").map(|_| ()).unwrap_err();
        assert_eq!(err.field(), "TableName");
        let err = config.with_kinesis_endpoint("").map(|_| ()).unwrap_err();
        assert_eq!(err.field(), "KinesisEndpoint");
        let err = config.with_region_name("").map(|_| ()).unwrap_err();
        assert_eq!(err.field(), "RegionName");

        assert_eq!(config, before);
        assert_eq!(config.region_name(), "eu-west-3");
    }

    #[test]
    fn test_table_name_override_keeps_application_name() {
        let mut config = config();
        config.with_table_name("app-leases").unwrap();
        assert_eq!(config.table_name(), "app-leases");
        assert_eq!(config.application_name(), "app");
    }

    #[test]
    fn test_position_last_call_wins() {
        let mut config = config();
        let ts = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();

        config
            .with_initial_position_in_stream(InitialPositionInStream::Latest)
            .unwrap()
            .with_timestamp_at_initial_position_in_stream(ts);
        assert_eq!(config.initial_position_in_stream(), InitialPositionInStream::AtTimestamp);
        assert_eq!(config.initial_position_in_stream_extended().timestamp(), Some(ts));

        config
            .with_initial_position_in_stream(InitialPositionInStream::TrimHorizon)
            .unwrap();
        assert_eq!(config.initial_position_in_stream(), InitialPositionInStream::TrimHorizon);
        assert_eq!(config.initial_position_in_stream_extended().timestamp(), None);
    }

    #[test]
    fn test_position_override_rejects_at_timestamp() {
        let mut config = config();
        config
            .with_initial_position_in_stream(InitialPositionInStream::Latest)
            .unwrap();

        let result = config.with_initial_position_in_stream(InitialPositionInStream::AtTimestamp);
        assert!(result.is_err());
        assert_eq!(config.initial_position_in_stream(), InitialPositionInStream::Latest);
    }

    #[test]
    fn test_duration_accessors() {
        let mut config = config();
        config.with_task_backoff_time_millis(750).unwrap();

        assert_eq!(config.failover_time(), Duration::from_secs(10));
        assert_eq!(config.shard_sync_interval(), Duration::from_secs(60));
        assert_eq!(config.task_backoff_time(), Duration::from_millis(750));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(config.idle_time_between_reads(), Duration::from_secs(1));
        assert_eq!(config.parent_shard_poll_interval(), Duration::from_secs(10));
        assert_eq!(config.metrics_buffer_time(), Duration::from_secs(10));
    }
}
