//! Operator configuration
//!
//! Built once at startup from the command line and environment, then handed
//! to every component that needs it.

use std::path::PathBuf;
use std::time::Duration;

use crate::render::DEFAULT_EXTENSION;

/// Default configuration directory when `TFPATH` is not set
pub const DEFAULT_CONFIG_DIR: &str = "/var/lib/terraform";

/// Default requeue delay while waiting on dependencies
pub const DEFAULT_DEPENDENCY_REQUEUE: Duration = Duration::from_secs(30);

/// Default resync interval for materialized resources
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Runtime configuration shared by the lifecycle engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Directory holding one subdirectory of rendered documents per namespace
    pub config_dir: PathBuf,
    /// Extension appended to document file names
    pub file_extension: String,
    /// Requeue delay while a resource waits on its dependencies
    pub dependency_requeue: Duration,
    /// Requeue delay after a resource has been materialized
    pub resync_interval: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            file_extension: DEFAULT_EXTENSION.to_string(),
            dependency_requeue: DEFAULT_DEPENDENCY_REQUEUE,
            resync_interval: DEFAULT_RESYNC_INTERVAL,
        }
    }
}

impl OperatorConfig {
    /// Configuration writing into `config_dir` with default timings
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Default::default()
        }
    }

    /// Set the document file extension; a leading dot is ignored
    pub fn file_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.file_extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Set the requeue delay used while waiting on dependencies
    pub fn dependency_requeue(mut self, delay: Duration) -> Self {
        self.dependency_requeue = delay;
        self
    }

    /// Set the resync interval for materialized resources
    pub fn resync_interval(mut self, interval: Duration) -> Self {
        self.resync_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = OperatorConfig::default();
        assert_eq!(config.config_dir, PathBuf::from("/var/lib/terraform"));
        assert_eq!(config.file_extension, "tf.json");
        assert_eq!(config.dependency_requeue, Duration::from_secs(30));
        assert_eq!(config.resync_interval, Duration::from_secs(300));
    }

    #[test]
    fn builder_overrides_and_strips_leading_dot() {
        let config = OperatorConfig::new("/tmp/tf")
            .file_extension(".cfg")
            .dependency_requeue(Duration::from_secs(1))
            .resync_interval(Duration::from_secs(2));
        assert_eq!(config.config_dir, PathBuf::from("/tmp/tf"));
        assert_eq!(config.file_extension, "cfg");
        assert_eq!(config.dependency_requeue, Duration::from_secs(1));
        assert_eq!(config.resync_interval, Duration::from_secs(2));
    }
}
