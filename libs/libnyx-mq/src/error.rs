//! Error mapping for message queue system calls
//!
//! Every `mq_*` call reports failure through a sentinel return value (`-1`)
//! and `errno`. This module turns that pair into a structured [`Error`] that
//! names the failure kind, the operation, and the raw errno.
//!
//! ```no_run
//! use libnyx_mq::{ErrorKind, MessageQueue};
//!
//! match MessageQueue::attach("/jobs") {
//!     Ok(queue) => println!("attached to {}", queue.name()),
//!     Err(e) if e.kind() == ErrorKind::NotFound => println!("no such queue"),
//!     Err(e) => println!("error: {}", e),
//! }
//! ```

use nix::errno::Errno;
use std::fmt;
use std::io;

/// Queue operation that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Open,
    Send,
    TimedSend,
    Receive,
    TimedReceive,
    GetAttr,
    SetAttr,
    Notify,
    Close,
    Unlink,
    Allocate,
}

impl Op {
    /// Name of the underlying call
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "mq_open",
            Self::Send => "mq_send",
            Self::TimedSend => "mq_timedsend",
            Self::Receive => "mq_receive",
            Self::TimedReceive => "mq_timedreceive",
            Self::GetAttr => "mq_getattr",
            Self::SetAttr => "mq_setattr",
            Self::Notify => "mq_notify",
            Self::Close => "mq_close",
            Self::Unlink => "mq_unlink",
            Self::Allocate => "receive buffer allocation",
        }
    }

    fn is_send(&self) -> bool {
        matches!(self, Self::Send | Self::TimedSend)
    }

    fn is_receive(&self) -> bool {
        matches!(self, Self::Receive | Self::TimedReceive)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure kinds callers can match on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed name, bad priority, or attributes outside kernel limits
    InvalidArgument,
    /// Mode/ownership conflict, or the handle lacks the needed direction
    PermissionDenied,
    /// Exclusive create on a queue that already exists
    AlreadyExists,
    /// Attach-only open or unlink of a queue that does not exist
    NotFound,
    /// Payload longer than the queue's maximum message size
    MessageTooLarge,
    /// Receive buffer smaller than the queue's maximum message size
    BufferTooSmall,
    /// Non-blocking send on a full queue
    QueueFull,
    /// Non-blocking receive on an empty queue
    WouldBlock,
    /// Deadline elapsed before the operation could complete
    Timeout,
    /// Memory for the receive buffer could not be reserved
    AllocationFailed,
    /// Handle was already closed
    Closed,
    /// Another notification registration is outstanding
    AlreadyRegistered,
    /// A signal handler interrupted a blocking call
    Interrupted,
    /// Descriptor or queue-count limit reached
    LimitReached,
    /// Queue name exceeds `NAME_MAX`
    NameTooLong,
    /// Unmapped errno value
    Unknown(i32),
}

impl ErrorKind {
    /// Map an errno reported by `op` to a failure kind
    ///
    /// `EMSGSIZE`, `EAGAIN` and `EBADF` depend on the direction of the call.
    /// The handle never issues a call on a closed descriptor, so `EBADF` on
    /// send/receive means the queue was opened without that direction.
    pub fn from_errno(op: Op, errno: Errno) -> Self {
        match errno {
            Errno::EINVAL => Self::InvalidArgument,
            Errno::EACCES | Errno::EPERM => Self::PermissionDenied,
            Errno::EEXIST => Self::AlreadyExists,
            Errno::ENOENT => Self::NotFound,
            Errno::EMSGSIZE if op.is_receive() => Self::BufferTooSmall,
            Errno::EMSGSIZE => Self::MessageTooLarge,
            Errno::EAGAIN if op.is_send() => Self::QueueFull,
            Errno::EAGAIN => Self::WouldBlock,
            Errno::ETIMEDOUT => Self::Timeout,
            Errno::ENOMEM => Self::AllocationFailed,
            Errno::EBADF if op.is_send() || op.is_receive() => Self::PermissionDenied,
            Errno::EBADF => Self::Closed,
            Errno::EBUSY => Self::AlreadyRegistered,
            Errno::EINTR => Self::Interrupted,
            Errno::EMFILE | Errno::ENFILE | Errno::ENOSPC => Self::LimitReached,
            Errno::ENAMETOOLONG => Self::NameTooLong,
            other => Self::Unknown(other as i32),
        }
    }

    /// True for the two non-blocking "try again" kinds
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::QueueFull | Self::WouldBlock)
    }

    /// Get human-readable description
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::PermissionDenied => "permission denied",
            Self::AlreadyExists => "queue already exists",
            Self::NotFound => "queue not found",
            Self::MessageTooLarge => "message exceeds maximum message size",
            Self::BufferTooSmall => "receive buffer smaller than maximum message size",
            Self::QueueFull => "queue is full",
            Self::WouldBlock => "operation would block",
            Self::Timeout => "deadline elapsed",
            Self::AllocationFailed => "memory allocation failed",
            Self::Closed => "queue handle is closed",
            Self::AlreadyRegistered => "notification already registered",
            Self::Interrupted => "interrupted by signal",
            Self::LimitReached => "system limit reached",
            Self::NameTooLong => "queue name too long",
            Self::Unknown(_) => "unknown error",
        }
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::InvalidArgument
            | Self::MessageTooLarge
            | Self::BufferTooSmall
            | Self::NameTooLong => io::ErrorKind::InvalidInput,
            Self::PermissionDenied => io::ErrorKind::PermissionDenied,
            Self::AlreadyExists => io::ErrorKind::AlreadyExists,
            Self::NotFound => io::ErrorKind::NotFound,
            Self::QueueFull | Self::WouldBlock => io::ErrorKind::WouldBlock,
            Self::Timeout => io::ErrorKind::TimedOut,
            Self::AllocationFailed => io::ErrorKind::OutOfMemory,
            Self::Closed => io::ErrorKind::NotConnected,
            Self::Interrupted => io::ErrorKind::Interrupted,
            Self::AlreadyRegistered | Self::LimitReached | Self::Unknown(_) => {
                io::ErrorKind::Other
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown error (errno {})", code),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Message queue error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{op} failed: {kind}{}", errno_suffix(.code))]
pub struct Error {
    kind: ErrorKind,
    op: Op,
    code: Option<Errno>,
}

fn errno_suffix(code: &Option<Errno>) -> String {
    match code {
        Some(errno) => format!(" ({})", errno),
        None => String::new(),
    }
}

impl Error {
    /// Error detected by the wrapper itself, without a kernel call
    pub fn new(op: Op, kind: ErrorKind) -> Self {
        Self {
            kind,
            op,
            code: None,
        }
    }

    /// Error from an explicit errno value
    pub fn from_errno(op: Op, errno: Errno) -> Self {
        Self {
            kind: ErrorKind::from_errno(op, errno),
            op,
            code: Some(errno),
        }
    }

    /// Error from the calling thread's current errno
    pub fn last(op: Op) -> Self {
        Self::from_errno(op, Errno::last())
    }

    /// Shorthand for use after close
    pub(crate) fn closed(op: Op) -> Self {
        Self::new(op, ErrorKind::Closed)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn op(&self) -> Op {
        self.op
    }

    /// Raw errno, if the error came from the kernel
    pub fn errno(&self) -> Option<Errno> {
        self.code
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        self.code.map(|errno| errno as i32)
    }

    /// Convert an `int` return value, treating `-1` as failure
    pub(crate) fn check(op: Op, rv: libc::c_int) -> Result<libc::c_int> {
        if rv == -1 {
            Err(Self::last(op))
        } else {
            Ok(rv)
        }
    }

    /// Convert an `ssize_t` return value into a byte count
    pub(crate) fn check_len(op: Op, rv: libc::ssize_t) -> Result<usize> {
        if rv < 0 {
            Err(Self::last(op))
        } else {
            Ok(rv as usize)
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        io::Error::new(err.kind.io_kind(), err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
