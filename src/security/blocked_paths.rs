//! Suspicious path rules.
//!
//! # Responsibilities
//! - Reject PHP probes (`.php` suffix or `.php/` segment, any case)
//! - Reject paths containing a configured substring
//!
//! # Design Decisions
//! - Substring containment, not regex, so matching stays linear
//! - Substring matching is case-sensitive against the raw path
//! - The rule list is immutable; reloads build a new one

use crate::config::BlockedPathsConfig;

/// Immutable set of blocked path rules.
#[derive(Debug, Clone)]
pub struct BlockedPathRules {
    block_php: bool,
    substrings: Vec<String>,
}

impl BlockedPathRules {
    pub fn new(block_php: bool, substrings: Vec<String>) -> Self {
        Self {
            block_php,
            substrings,
        }
    }

    pub fn from_config(config: &BlockedPathsConfig) -> Self {
        Self::new(config.block_php, config.substrings.clone())
    }

    /// True if the path looks like a PHP endpoint probe.
    pub fn is_php_probe(&self, path: &str) -> bool {
        if !self.block_php {
            return false;
        }
        let lower = path.to_ascii_lowercase();
        lower.ends_with(".php") || lower.contains(".php/")
    }

    /// True if any configured substring occurs in the path.
    pub fn matches_substring(&self, path: &str) -> bool {
        self.substrings.iter().any(|s| path.contains(s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.substrings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substrings.is_empty()
    }
}
