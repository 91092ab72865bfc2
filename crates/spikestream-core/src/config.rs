//! Buffer configuration.
//!
//! Capacity, blocking threshold and mark bound are the only knobs a
//! circular buffer exposes. The struct is serde-friendly so hosts can keep
//! it alongside their own settings.

use crate::defaults;
use crate::error::{Result, SpikeStreamError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a circular sample buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Number of elements in the backing store.
    pub capacity: usize,
    /// Blocking threshold for reads. `None` disables blocking.
    pub min_size: Option<usize>,
    /// Maximum number of outstanding marks.
    pub max_marks: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::BUFFER_CAPACITY,
            min_size: None,
            max_marks: defaults::MAX_MARKS,
        }
    }
}

impl BufferConfig {
    /// Create a configuration with the given capacity and default settings.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the blocking threshold.
    pub fn min_size(mut self, min_size: Option<usize>) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the mark bound.
    pub fn max_marks(mut self, max_marks: usize) -> Self {
        self.max_marks = max_marks;
        self
    }

    /// Check that the configuration describes a usable buffer.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(SpikeStreamError::InvalidCapacity(self.capacity));
        }
        if self.max_marks == 0 {
            return Err(SpikeStreamError::InvalidConfig(
                "max_marks must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
