//! `icy` section of the SPMusic configuration
//!
//! ```yaml
//! icy:
//!   title_timeout_secs: 1800
//!   connect_timeout_secs: 30
//! ```

use crate::decoder::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TITLE_TIMEOUT};
use anyhow::Result;
use serde_yaml::Value;
use spmconfig::Config;
use std::time::Duration;

/// Extension trait adding ICY decoder settings to [`spmconfig::Config`]
pub trait IcyConfigExt {
    /// Time without a new title before a stream is abandoned
    fn get_icy_title_timeout(&self) -> Result<Duration>;

    fn set_icy_title_timeout(&self, timeout: Duration) -> Result<()>;

    /// Timeout for opening the stream connection
    fn get_icy_connect_timeout(&self) -> Result<Duration>;

    fn set_icy_connect_timeout(&self, timeout: Duration) -> Result<()>;
}

impl IcyConfigExt for Config {
    fn get_icy_title_timeout(&self) -> Result<Duration> {
        self.get_secs_or(&["icy", "title_timeout_secs"], DEFAULT_TITLE_TIMEOUT)
    }

    fn set_icy_title_timeout(&self, timeout: Duration) -> Result<()> {
        self.set_value(
            &["icy", "title_timeout_secs"],
            Value::Number(timeout.as_secs().into()),
        )
    }

    fn get_icy_connect_timeout(&self) -> Result<Duration> {
        self.get_secs_or(
            &["icy", "connect_timeout_secs"],
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    fn set_icy_connect_timeout(&self, timeout: Duration) -> Result<()> {
        self.set_value(
            &["icy", "connect_timeout_secs"],
            Value::Number(timeout.as_secs().into()),
        )
    }
}
