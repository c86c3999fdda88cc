//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::query::PageSpec;

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default upper bound on a requested page size.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page size used when the caller does not pick one.
    pub default_page_size: u32,

    /// Largest page size a caller may request.
    pub max_page_size: u32,

    /// Upper bound on rows materialized by a list query (`None` = unbounded).
    pub max_results: Option<usize>,

    /// Emit compiled queries as JSON at TRACE level.
    pub trace_compiled_queries: bool,
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_results: None,
            trace_compiled_queries: false,
        }
    }

    /// Load a configuration from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the default page size.
    pub fn with_default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    /// Set the maximum page size.
    pub fn with_max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size;
        self
    }

    /// Bound the number of rows a list query may return.
    pub fn with_max_results(mut self, limit: usize) -> Self {
        self.max_results = Some(limit);
        self
    }

    /// Enable or disable compiled-query tracing.
    pub fn with_trace_compiled_queries(mut self, enabled: bool) -> Self {
        self.trace_compiled_queries = enabled;
        self
    }

    /// First page with the default page size.
    pub fn default_page(&self) -> PageSpec {
        PageSpec::new(0, self.default_page_size)
    }

    /// Check that the values are usable together.
    pub fn validate(&self) -> Result<(), Error> {
        if self.default_page_size == 0 {
            return Err(Error::Config("default_page_size must be positive".into()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(Error::Config(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
