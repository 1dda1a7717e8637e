//! `web` section of the SPMusic configuration
//!
//! ```yaml
//! web:
//!   initial_sleep_secs: 10
//!   request_timeout_secs: 30
//! ```

use crate::crawler::{DEFAULT_INITIAL_SLEEP, DEFAULT_REQUEST_TIMEOUT_SECS};
use anyhow::Result;
use serde_yaml::Value;
use spmconfig::Config;
use std::time::Duration;

/// Extension trait adding page crawler settings to [`spmconfig::Config`]
pub trait WebConfigExt {
    /// Upper bound of the random delay before a live-mode fetch
    fn get_web_initial_sleep(&self) -> Result<Duration>;

    fn set_web_initial_sleep(&self, bound: Duration) -> Result<()>;

    /// Timeout applied to every page request
    fn get_web_request_timeout(&self) -> Result<Duration>;

    fn set_web_request_timeout(&self, timeout: Duration) -> Result<()>;
}

impl WebConfigExt for Config {
    fn get_web_initial_sleep(&self) -> Result<Duration> {
        self.get_secs_or(&["web", "initial_sleep_secs"], DEFAULT_INITIAL_SLEEP)
    }

    fn set_web_initial_sleep(&self, bound: Duration) -> Result<()> {
        self.set_value(
            &["web", "initial_sleep_secs"],
            Value::Number(bound.as_secs().into()),
        )
    }

    fn get_web_request_timeout(&self) -> Result<Duration> {
        self.get_secs_or(
            &["web", "request_timeout_secs"],
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    fn set_web_request_timeout(&self, timeout: Duration) -> Result<()> {
        self.set_value(
            &["web", "request_timeout_secs"],
            Value::Number(timeout.as_secs().into()),
        )
    }
}
