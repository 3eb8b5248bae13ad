use serde::{Deserialize, Serialize};

use crate::runtime::error::{Result, RuntimeError};

pub const DEFAULT_GC_THRESHOLD: usize = 10_000;
pub const MIN_GC_THRESHOLD: usize = 1024;

/// Tunables for the heap, the collector audit, and the splice engine.
///
/// Every field has a default, so a JSON document only needs to name the
/// settings it changes:
///
/// ```
/// use bindery::runtime::config::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json(r#"{ "audit_marks": false }"#).unwrap();
/// assert!(!config.audit_marks);
/// assert_eq!(config.gc_threshold, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Allocations between automatic collections.
    pub gc_threshold: usize,
    /// Run the mark validator over every live cell after each mark phase.
    pub audit_marks: bool,
    /// Run the structural context check after each context constructor.
    pub check_contexts: bool,
    /// Strings shorter than this (in codepoints) do not keep a bookmark.
    pub bookmark_min_len: usize,
    /// Initial capacity of the key collection buffer.
    pub collect_buffer_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            audit_marks: true,
            check_contexts: true,
            bookmark_min_len: 32,
            collect_buffer_capacity: 2 + 98,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| RuntimeError::Config(err.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| RuntimeError::Config(err.to_string()))
    }
}
