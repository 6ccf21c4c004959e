//! Wall clock for TOTP

use otpkey_apdu::Clock;

use std::time::{SystemTime, UNIX_EPOCH};

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_time(&self) -> u64 {
        // A clock set before 1970 reads as the epoch
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_2020() {
        assert!(SystemClock.unix_time() > 1_577_836_800);
    }
}
