use std::time::{SystemTime, UNIX_EPOCH};

use hub_primitives::FARCASTER_EPOCH_SECS;

/// Time source for snapshot boundaries, in seconds since the Farcaster
/// epoch, the same scale message timestamps use, so snapshot prefixes and
/// sync ids align byte-for-byte.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
            .saturating_sub(FARCASTER_EPOCH_SECS)
    }
}
