//! Absolute deadlines for timed send/receive
//!
//! `mq_timedsend` and `mq_timedreceive` take an absolute `CLOCK_REALTIME`
//! timestamp, not a relative timeout. The kernel enforces it: a deadline that
//! has already passed fails with `ETIMEDOUT` as soon as the call would block.

use chrono::{DateTime, TimeZone};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Absolute point in wall-clock time bounding a blocking call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(SystemTime);

impl Deadline {
    pub fn at(instant: SystemTime) -> Self {
        Self(instant)
    }

    /// Deadline `timeout` from now
    ///
    /// Timeouts past the end of representable time (e.g. `Duration::MAX`)
    /// saturate to the latest instant a `timespec` can hold.
    pub fn after(timeout: Duration) -> Self {
        SystemTime::now()
            .checked_add(timeout)
            .map_or_else(Self::latest, Self)
    }

    /// Latest deadline the kernel can be handed
    pub fn latest() -> Self {
        let secs = Duration::from_secs(libc::time_t::MAX as u64);
        Self(UNIX_EPOCH.checked_add(secs).unwrap_or(UNIX_EPOCH))
    }

    pub fn instant(&self) -> SystemTime {
        self.0
    }

    pub fn has_passed(&self) -> bool {
        self.0 <= SystemTime::now()
    }

    /// Kernel timespec for this deadline
    ///
    /// Past instants are kept as they are so the kernel reports the timeout.
    /// Instants before the epoch become the epoch itself, since the kernel
    /// rejects a negative `tv_sec` with `EINVAL`.
    pub fn to_timespec(&self) -> libc::timespec {
        let since_epoch = self.0.duration_since(UNIX_EPOCH).unwrap_or_default();
        // Some targets pad timespec with private fields
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        ts.tv_sec = libc::time_t::try_from(since_epoch.as_secs()).unwrap_or(libc::time_t::MAX);
        ts.tv_nsec = since_epoch.subsec_nanos() as _;
        ts
    }
}

impl From<SystemTime> for Deadline {
    fn from(instant: SystemTime) -> Self {
        Self(instant)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Deadline {
    fn from(dt: DateTime<Tz>) -> Self {
        let secs = dt.timestamp();
        let nanos = dt.timestamp_subsec_nanos();
        let instant = if secs >= 0 {
            UNIX_EPOCH + Duration::new(secs as u64, nanos)
        } else {
            UNIX_EPOCH
        };
        Self(instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, Utc};
    use proptest::prelude::*;

    #[test]
    fn test_sub_second_split() {
        let deadline = Deadline::at(UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789));
        let ts = deadline.to_timespec();
        assert_eq!(ts.tv_sec, 1_700_000_000);
        assert_eq!(ts.tv_nsec, 123_456_789);
    }

    #[test]
    fn test_past_not_clamped_to_now() {
        let past = SystemTime::now() - Duration::from_secs(3600);
        let ts = Deadline::at(past).to_timespec();
        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as libc::time_t;
        assert!(ts.tv_sec <= now_secs - 3599);
        assert!(Deadline::at(past).has_passed());
    }

    #[test]
    fn test_pre_epoch_clamps_to_epoch() {
        let ts = Deadline::at(UNIX_EPOCH - Duration::from_secs(10)).to_timespec();
        assert_eq!(ts.tv_sec, 0);
        assert_eq!(ts.tv_nsec, 0);
    }

    #[test]
    fn test_from_chrono() {
        let dt = Utc.timestamp_opt(1_600_000_000, 500).unwrap();
        let ts = Deadline::from(dt).to_timespec();
        assert_eq!(ts.tv_sec, 1_600_000_000);
        assert_eq!(ts.tv_nsec, 500);

        // Offset does not change the instant
        let local = dt.with_timezone(&Local);
        assert_eq!(Deadline::from(local), Deadline::from(dt));
    }

    #[test]
    fn test_after_is_in_future() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(!deadline.has_passed());
    }

    #[test]
    fn test_after_saturates() {
        let deadline = Deadline::after(Duration::MAX);
        assert_eq!(deadline, Deadline::latest());
        assert!(!deadline.has_passed());

        let ts = deadline.to_timespec();
        assert_eq!(ts.tv_sec, libc::time_t::MAX);
        assert_eq!(ts.tv_nsec, 0);
    }

    #[test]
    fn test_far_future_clamps_tv_sec() {
        let ts = Deadline::at(Deadline::latest().instant() + Duration::from_nanos(5)).to_timespec();
        assert_eq!(ts.tv_sec, libc::time_t::MAX);
    }

    proptest! {
        #[test]
        fn prop_timespec_within_second(secs in 0u64..4_000_000_000, nanos in 0u32..1_000_000_000) {
            let ts = Deadline::at(UNIX_EPOCH + Duration::new(secs, nanos)).to_timespec();
            prop_assert!(ts.tv_nsec >= 0 && ts.tv_nsec < 1_000_000_000);
            prop_assert_eq!(ts.tv_sec as u64, secs);
            prop_assert_eq!(ts.tv_nsec as u32, nanos);
        }
    }
}
