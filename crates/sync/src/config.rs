/// Messages newer than this are left out of snapshots; hubs only compare
/// settled data.
pub const SYNC_THRESHOLD_IN_SECONDS: u64 = 10;

/// Subtrees at or below this size are fetched in one request instead of
/// being walked further.
pub const HASHES_PER_FETCH: usize = 50;

#[derive(Clone, Copy, Debug)]
pub struct SyncConfig {
    pub sync_threshold_secs: u64,
    pub hashes_per_fetch: usize,
    /// Progress log cadence during trie initialization.
    pub init_log_every: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_threshold_secs: SYNC_THRESHOLD_IN_SECONDS,
            hashes_per_fetch: HASHES_PER_FETCH,
            init_log_every: 10_000,
        }
    }
}

impl SyncConfig {
    pub fn with_hashes_per_fetch(mut self, hashes_per_fetch: usize) -> Self {
        self.hashes_per_fetch = hashes_per_fetch;
        self
    }

    pub fn with_sync_threshold_secs(mut self, sync_threshold_secs: u64) -> Self {
        self.sync_threshold_secs = sync_threshold_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_protocol_constants() {
        let config = SyncConfig::default();
        assert_eq!(config.sync_threshold_secs, 10);
        assert_eq!(config.hashes_per_fetch, 50);
        assert_eq!(config.init_log_every, 10_000);
    }

    #[test]
    fn builders_override_single_fields() {
        let config = SyncConfig::default()
            .with_hashes_per_fetch(5)
            .with_sync_threshold_secs(60);
        assert_eq!(config.hashes_per_fetch, 5);
        assert_eq!(config.sync_threshold_secs, 60);
    }
}
