//! Store configuration.

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to error if the store already exists.
    pub error_if_exists: bool,

    /// Whether to fsync the WAL on every commit.
    ///
    /// When set, committed mutations survive power loss. When unset,
    /// commits survive a process crash but are durable against power
    /// loss only from the last checkpoint or close. Slower when set.
    pub sync_on_commit: bool,

    /// Format version to use for new stores.
    pub format_version: (u16, u16),
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            sync_on_commit: true,
            format_version: (1, 0),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to error if the store exists.
    #[must_use]
    pub const fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets whether to fsync the WAL on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }
}
