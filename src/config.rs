//! Connection options and pipeline sizing.

use std::time::Duration;

use crate::error::{IprotoError, Result};

/// Default connect + handshake deadline.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default per-query timeout used by `Connection::execute`.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(1);

/// Default submission queue capacity (shared by all callers).
pub const DEFAULT_SUBMISSION_CAPACITY: usize = 16;

/// Default outbound (router → writer) queue capacity.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Default decoded-response (reader → router) queue capacity.
pub const DEFAULT_RESPONSE_CAPACITY: usize = 256;

/// Intake pauses once the response queue holds more than `capacity / divisor`.
pub const DEFAULT_BACKPRESSURE_DIVISOR: usize = 10;

/// Separator between the socket address and the default space.
pub const SPACE_SEPARATOR: char = '/';

/// User-facing connection options.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Deadline for TCP connect, greeting and authentication. Zero means default.
    pub connect_timeout: Duration,
    /// Timeout for `execute`. Zero means default.
    pub query_timeout: Duration,
    /// Space used by queries that do not name one.
    pub default_space: Option<String>,
    /// Authenticate as this user when set and non-empty.
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Options {
    /// Copy with zero durations replaced by defaults.
    pub fn normalized(&self) -> Self {
        let mut opts = self.clone();
        if opts.connect_timeout.is_zero() {
            opts.connect_timeout = DEFAULT_CONNECT_TIMEOUT;
        }
        if opts.query_timeout.is_zero() {
            opts.query_timeout = DEFAULT_QUERY_TIMEOUT;
        }
        opts
    }

    /// Credentials, if a user name was given.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match self.user.as_deref() {
            Some(user) if !user.is_empty() => {
                Some((user, self.password.as_deref().unwrap_or("")))
            }
            _ => None,
        }
    }
}

/// Queue sizes of the request pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub submission_capacity: usize,
    pub outbound_capacity: usize,
    pub response_capacity: usize,
    pub backpressure_divisor: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            submission_capacity: DEFAULT_SUBMISSION_CAPACITY,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            response_capacity: DEFAULT_RESPONSE_CAPACITY,
            backpressure_divisor: DEFAULT_BACKPRESSURE_DIVISOR,
        }
    }
}

/// Parsed `host:port[/space]` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub remote: String,
    pub space: Option<String>,
}

impl Address {
    /// Split the optional space suffix off an address.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` if the host part or a present suffix is empty.
    pub fn parse(addr: &str) -> Result<Self> {
        let (remote, space) = match addr.split_once(SPACE_SEPARATOR) {
            Some((remote, space)) => {
                if space.is_empty() {
                    return Err(IprotoError::InvalidAddress(format!(
                        "empty space in {:?}",
                        addr
                    )));
                }
                (remote, Some(space.to_string()))
            }
            None => (addr, None),
        };

        if remote.is_empty() {
            return Err(IprotoError::InvalidAddress(format!(
                "missing host in {:?}",
                addr
            )));
        }

        Ok(Self {
            remote: remote.to_string(),
            space,
        })
    }
}
