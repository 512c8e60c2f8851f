//! Runtime configuration shared by the decoder and the live tree.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Runtime configuration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Config {
    // Branch name used for branch-aware items and controller home pages
    pub branch: Option<String>,

    // Variables referenced by controller home pages
    pub vars: HashMap<String, String>,

    // Apply every gear synchronously, ignoring tween settings
    pub disable_tweens: bool,

    // Maximum relation cascade depth
    pub max_relation_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            branch: None,
            vars: HashMap::new(),
            disable_tweens: false,
            max_relation_depth: 64,
        }
    }
}

impl Config {
    /// Set the active branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Define a variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Disable all gear tweens.
    pub fn without_tweens(mut self) -> Self {
        self.disable_tweens = true;
        self
    }

    /// Look up a variable.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let cfg = Config::default()
            .with_branch("en")
            .with_var("lang", "fr")
            .without_tweens();
        assert_eq!(cfg.branch.as_deref(), Some("en"));
        assert_eq!(cfg.var("lang"), Some("fr"));
        assert_eq!(cfg.var("missing"), None);
        assert!(cfg.disable_tweens);
        assert_eq!(cfg.max_relation_depth, 64);
    }
}
