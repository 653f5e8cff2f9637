//! Value objects shared across the workspace

mod snowflake;

pub use snowflake::{Snowflake, SnowflakeParseError};
