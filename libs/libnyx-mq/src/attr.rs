//! Queue attributes
//!
//! Shape and occupancy of a queue as exchanged with the kernel through
//! `struct mq_attr`.

use crate::error::{Error, ErrorKind, Op, Result};
use serde::{Deserialize, Serialize};

/// Largest message size Linux accepts (`/proc/sys/fs/mqueue/msgsize_max`
/// hard ceiling since 3.5)
pub const MSGSIZE_MAX: usize = 16 * 1024 * 1024;

/// Highest priority is `MQ_PRIO_MAX - 1`
pub const MQ_PRIO_MAX: u32 = 32768;

/// Queue capacity and depth
///
/// On creation only `flags`, `max_messages` and `max_message_size` are
/// consulted; `current_messages` is always kernel-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueAttributes {
    /// `O_NONBLOCK` or 0
    #[serde(default)]
    pub flags: i64,
    /// Maximum number of queued messages
    pub max_messages: i64,
    /// Maximum size of one message in bytes
    pub max_message_size: i64,
    /// Messages currently queued
    #[serde(default)]
    pub current_messages: i64,
}

impl QueueAttributes {
    /// Attributes for creating a queue
    pub fn new(max_messages: i64, max_message_size: i64) -> Self {
        Self {
            flags: 0,
            max_messages,
            max_message_size,
            current_messages: 0,
        }
    }

    pub fn is_nonblocking(&self) -> bool {
        self.flags & libc::O_NONBLOCK as i64 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.current_messages == 0
    }

    pub fn is_full(&self) -> bool {
        self.current_messages >= self.max_messages
    }

    /// Kernel representation
    ///
    /// Fields that do not fit a `c_long` (32-bit targets) are rejected rather
    /// than truncated.
    pub(crate) fn to_raw(&self, op: Op) -> Result<libc::mq_attr> {
        let field = |value: i64| {
            libc::c_long::try_from(value).map_err(|_| Error::new(op, ErrorKind::InvalidArgument))
        };

        // mq_attr carries private padding on glibc targets
        let mut raw: libc::mq_attr = unsafe { std::mem::zeroed() };
        raw.mq_flags = field(self.flags)?;
        raw.mq_maxmsg = field(self.max_messages)?;
        raw.mq_msgsize = field(self.max_message_size)?;
        raw.mq_curmsgs = 0;
        Ok(raw)
    }

    pub(crate) fn from_raw(raw: &libc::mq_attr) -> Self {
        Self {
            flags: raw.mq_flags as i64,
            max_messages: raw.mq_maxmsg as i64,
            max_message_size: raw.mq_msgsize as i64,
            current_messages: raw.mq_curmsgs as i64,
        }
    }

    pub(crate) fn zeroed_raw() -> libc::mq_attr {
        unsafe { std::mem::zeroed() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_ignores_current_messages() {
        let attrs = QueueAttributes {
            flags: 0,
            max_messages: 10,
            max_message_size: 128,
            current_messages: 7,
        };
        let raw = attrs.to_raw(Op::Open).unwrap();
        assert_eq!(raw.mq_maxmsg, 10);
        assert_eq!(raw.mq_msgsize, 128);
        assert_eq!(raw.mq_curmsgs, 0);
    }

    #[test]
    #[cfg(target_pointer_width = "32")]
    fn test_raw_rejects_out_of_range() {
        let attrs = QueueAttributes::new(10, i64::from(u32::MAX) + 128);
        let err = attrs.to_raw(Op::Open).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.op(), Op::Open);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_raw_keeps_full_range() {
        let attrs = QueueAttributes::new(i64::MAX, i64::MIN);
        let raw = attrs.to_raw(Op::Open).unwrap();
        assert_eq!(raw.mq_maxmsg as i64, i64::MAX);
        assert_eq!(raw.mq_msgsize as i64, i64::MIN);
    }

    #[test]
    fn test_from_raw() {
        let mut raw = QueueAttributes::zeroed_raw();
        raw.mq_flags = libc::O_NONBLOCK as libc::c_long;
        raw.mq_maxmsg = 4;
        raw.mq_msgsize = 64;
        raw.mq_curmsgs = 4;

        let attrs = QueueAttributes::from_raw(&raw);
        assert!(attrs.is_nonblocking());
        assert!(attrs.is_full());
        assert!(!attrs.is_empty());
        assert_eq!(attrs.max_message_size, 64);
    }

    #[test]
    fn test_deserialize_creation_subset() {
        let attrs: QueueAttributes =
            serde_json::from_str(r#"{"max_messages": 10, "max_message_size": 128}"#).unwrap();
        assert_eq!(attrs, QueueAttributes::new(10, 128));
    }
}
