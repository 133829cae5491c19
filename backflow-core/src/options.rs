//! Write buffer configuration options

use crate::error::{BufferError, Result};

/// Default soft limit, in bytes.
pub const DEFAULT_SOFT_LIMIT: usize = 2048;

/// Write buffer configuration options.
///
/// # Examples
///
/// ```
/// use backflow_core::options::BufferOptions;
///
/// let opts = BufferOptions::default().with_soft_limit(64 * 1024);
/// assert!(opts.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferOptions {
    /// Backpressure threshold (bytes)
    ///
    /// `write` reports `false` once the queue holds at least this many bytes,
    /// and `drain` fires when a flush brings it back below.
    /// Writes past the limit are still queued.
    /// - Default: 2048
    /// - Must be greater than zero
    pub soft_limit: usize,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            soft_limit: DEFAULT_SOFT_LIMIT,
        }
    }
}

impl BufferOptions {
    /// Create new buffer options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the soft limit.
    #[must_use]
    pub const fn with_soft_limit(mut self, limit: usize) -> Self {
        self.soft_limit = limit;
        self
    }

    /// Check the options before they are applied to a buffer.
    pub fn validate(&self) -> Result<()> {
        validate_soft_limit(self.soft_limit)
    }
}

pub(crate) fn validate_soft_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(BufferError::invalid_options(
            "soft_limit must be greater than zero",
        ));
    }
    Ok(())
}
