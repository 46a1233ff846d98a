//! Where a worker starts reading a shard it has no checkpoint for.
//!
//! [`InitialPositionInStream`] is the bare mode. [`InitialPositionInStreamExtended`]
//! pairs the mode with the timestamp needed by `AT_TIMESTAMP`, and can only be
//! built in consistent combinations: a timestamp is present if and only if the
//! mode is [`InitialPositionInStream::AtTimestamp`].

use chrono::{DateTime, Utc};
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Starting point for reading a shard.
///
/// Displays and parses as the service's wire names (`TRIM_HORIZON`, `LATEST`,
/// `AT_TIMESTAMP`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr,
)]
#[display(style = "SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitialPositionInStream {
    /// Oldest record still available in the shard.
    TrimHorizon,
    /// Just after the most recent record; only new data is read.
    Latest,
    /// First record at or after an explicit timestamp.
    AtTimestamp,
}

/// Initial position together with the timestamp `AT_TIMESTAMP` needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialPositionInStreamExtended {
    position: InitialPositionInStream,
    timestamp: Option<DateTime<Utc>>,
}

impl InitialPositionInStreamExtended {
    /// Builds a timestamp-less position.
    ///
    /// `AT_TIMESTAMP` is rejected: use [`Self::at_timestamp`] for it.
    pub fn new(position: InitialPositionInStream) -> Result<Self> {
        if position == InitialPositionInStream::AtTimestamp {
            return Err(ConfigError::invalid_argument(
                "InitialPositionInStream",
                "AT_TIMESTAMP requires a timestamp",
            ));
        }

        Ok(Self {
            position,
            timestamp: None,
        })
    }

    pub fn at_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self {
            position: InitialPositionInStream::AtTimestamp,
            timestamp: Some(timestamp),
        }
    }

    pub fn position(&self) -> InitialPositionInStream {
        self.position
    }

    /// Set only when [`Self::position`] is `AT_TIMESTAMP`.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_display_uses_wire_names() {
        assert_eq!(InitialPositionInStream::TrimHorizon.to_string(), "TRIM_HORIZON");
        assert_eq!(InitialPositionInStream::Latest.to_string(), "LATEST");
        assert_eq!(InitialPositionInStream::AtTimestamp.to_string(), "AT_TIMESTAMP");
    }

    #[test]
    fn test_parse_wire_names() {
        assert_eq!(
            "TRIM_HORIZON".parse::<InitialPositionInStream>().unwrap(),
            InitialPositionInStream::TrimHorizon
        );
        assert_eq!(
            "AT_TIMESTAMP".parse::<InitialPositionInStream>().unwrap(),
            InitialPositionInStream::AtTimestamp
        );
        assert!("trim_horizon".parse::<InitialPositionInStream>().is_err());
        assert!("EARLIEST".parse::<InitialPositionInStream>().is_err());
    }

    #[test]
    fn test_new_has_no_timestamp() {
        let latest = InitialPositionInStreamExtended::new(InitialPositionInStream::Latest).unwrap();
        assert_eq!(latest.position(), InitialPositionInStream::Latest);
        assert_eq!(latest.timestamp(), None);
    }

    #[test]
    fn test_new_rejects_at_timestamp() {
        let err = InitialPositionInStreamExtended::new(InitialPositionInStream::AtTimestamp)
            .unwrap_err();
        assert_eq!(err.field(), "InitialPositionInStream");
        assert!(err.to_string().contains("requires a timestamp"));
    }

    #[test]
    fn test_at_timestamp_keeps_exact_value() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let position = InitialPositionInStreamExtended::at_timestamp(ts);
        assert_eq!(position.position(), InitialPositionInStream::AtTimestamp);
        assert_eq!(position.timestamp(), Some(ts));
    }
}
