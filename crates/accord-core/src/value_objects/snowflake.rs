//! Snowflake ID - Discord's 64-bit unique identifier
//!
//! Structure:
//! - Bits 63-22: Timestamp (milliseconds since the Discord epoch)
//! - Bits 21-0:  Worker/process/increment fields we never interpret

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Discord snowflake ID (64-bit)
///
/// Always minted by the server; the client only parses, compares, and
/// formats them. The wire representation is a decimal string (JavaScript
/// number safety), but numeric payload fields are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(u64);

impl Snowflake {
    /// Discord epoch: 2015-01-01 00:00:00 UTC (milliseconds)
    pub const EPOCH: u64 = 1_420_070_400_000;

    /// Create a Snowflake from a raw u64 value
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    #[inline]
    #[must_use]
    pub const fn into_inner(self) -> u64 {
        self.0
    }

    /// Check if the Snowflake is zero (uninitialized)
    #[inline]
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Extract the creation timestamp (milliseconds since Unix epoch)
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        (self.0 >> 22) + Self::EPOCH
    }

    /// Creation time as a `DateTime<Utc>`
    #[must_use]
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        use chrono::{TimeZone, Utc};
        Utc.timestamp_millis_opt(self.timestamp() as i64)
            .single()
            .unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap())
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Result<Self, SnowflakeParseError> {
        s.parse::<u64>()
            .map(Snowflake)
            .map_err(|_| SnowflakeParseError::InvalidFormat)
    }
}

/// Error when parsing a Snowflake from string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SnowflakeParseError {
    #[error("invalid snowflake format")]
    InvalidFormat,
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for u64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl std::str::FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Snowflake::parse(s)
    }
}

// Serialize as string for JSON (JavaScript number safety)
impl Serialize for Snowflake {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

// Deserialize from string or number
impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct SnowflakeVisitor;

        impl<'de> Visitor<'de> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing a snowflake ID")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Snowflake, E>
            where
                E: de::Error,
            {
                Ok(Snowflake(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Snowflake, E>
            where
                E: de::Error,
            {
                u64::try_from(value)
                    .map(Snowflake)
                    .map_err(|_| de::Error::custom("negative snowflake"))
            }

            fn visit_str<E>(self, value: &str) -> Result<Snowflake, E>
            where
                E: de::Error,
            {
                value
                    .parse::<u64>()
                    .map(Snowflake)
                    .map_err(|_| de::Error::custom("invalid snowflake string"))
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_creation() {
        let sf = Snowflake::new(123456789);
        assert_eq!(sf.into_inner(), 123456789);
    }

    #[test]
    fn test_snowflake_zero() {
        let sf = Snowflake::default();
        assert!(sf.is_zero());

        let sf = Snowflake::new(1);
        assert!(!sf.is_zero());
    }

    #[test]
    fn test_snowflake_parse() {
        let sf = Snowflake::parse("123456789").unwrap();
        assert_eq!(sf.into_inner(), 123456789);

        assert!(Snowflake::parse("invalid").is_err());
        assert!(Snowflake::parse("-5").is_err());
    }

    #[test]
    fn test_snowflake_display() {
        let sf = Snowflake::new(123456789);
        assert_eq!(sf.to_string(), "123456789");
    }

    #[test]
    fn test_snowflake_serialize_json() {
        let sf = Snowflake::new(123456789012345678);
        let json = serde_json::to_string(&sf).unwrap();
        assert_eq!(json, "\"123456789012345678\"");
    }

    #[test]
    fn test_snowflake_deserialize_string() {
        let sf: Snowflake = serde_json::from_str("\"123456789012345678\"").unwrap();
        assert_eq!(sf.into_inner(), 123456789012345678);
    }

    #[test]
    fn test_snowflake_deserialize_number() {
        let sf: Snowflake = serde_json::from_str("12345").unwrap();
        assert_eq!(sf.into_inner(), 12345);
    }

    #[test]
    fn test_snowflake_ordering() {
        let sf1 = Snowflake::new(100);
        let sf2 = Snowflake::new(200);
        assert!(sf1 < sf2);
    }

    #[test]
    fn test_snowflake_timestamp() {
        // A real snowflake from early 2016
        let sf = Snowflake::new(175_928_847_299_117_063);
        let ts = sf.timestamp();
        assert!(ts > Snowflake::EPOCH);
        assert_eq!(ts, 1_462_015_105_796);
    }

    #[test]
    fn test_snowflake_created_at() {
        let sf = Snowflake::new(175_928_847_299_117_063);
        let dt = sf.created_at();
        assert_eq!(dt.timestamp_millis(), 1_462_015_105_796);
    }
}
