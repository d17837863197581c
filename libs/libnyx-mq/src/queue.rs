//! Message queue handle
//!
//! A [`MessageQueue`] owns one kernel descriptor for a named queue. The
//! kernel object itself outlives the handle: closing (or dropping) a handle
//! never removes the queue, only [`MessageQueue::unlink`] or the free
//! function [`unlink`] does.
//!
//! ```text
//! Unopened --open--> Open --close/drop--> Closed
//!                      unlink acts on the name, in any state
//! ```
//!
//! Every call goes straight to the kernel on the calling thread. Blocking
//! calls suspend the thread; the timed variants are bounded by an absolute
//! [`Deadline`] that the kernel enforces.

use nix::sys::signal::Signal;
use nix::sys::stat::Mode;
use std::os::unix::io::RawFd;
use std::ptr;
use tracing::{debug, trace, warn};

use crate::attr::QueueAttributes;
use crate::buffer::ReceiveBuffer;
use crate::deadline::Deadline;
use crate::error::{Error, Op, Result};
use crate::flags::{OpenFlags, DEFAULT_MODE};
use crate::name::QueueName;

// Not exported by the libc crate on all Linux targets
extern "C" {
    fn mq_notify(mqdes: libc::mqd_t, sevp: *const libc::sigevent) -> libc::c_int;
}

/// One received message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub data: Vec<u8>,
    pub priority: u32,
}

/// Handle to a named POSIX message queue
///
/// Methods that touch the internal receive buffer take `&mut self`; sharing a
/// handle between threads needs external synchronization for those.
#[derive(Debug)]
pub struct MessageQueue {
    mqd: Option<libc::mqd_t>,
    name: QueueName,
    flags: OpenFlags,
    buffer: ReceiveBuffer,
}

impl MessageQueue {
    /// Open or create the queue `name`
    ///
    /// `attributes` is only consulted when `flags` contains `CREATE` and the
    /// queue does not exist yet. Readable handles allocate a receive buffer
    /// sized to the queue's maximum message size.
    pub fn open(
        name: &str,
        flags: OpenFlags,
        mode: Mode,
        attributes: Option<&QueueAttributes>,
    ) -> Result<Self> {
        let name = QueueName::new(name, Op::Open)?;

        let raw_attr = attributes
            .map(|attrs| attrs.to_raw(Op::Open))
            .transpose()?;
        let attr_ptr = raw_attr
            .as_ref()
            .map_or(ptr::null(), |attr| attr as *const libc::mq_attr);

        let mqd = unsafe {
            libc::mq_open(
                name.as_c_str().as_ptr(),
                flags.bits(),
                mode.bits() as libc::c_uint,
                attr_ptr,
            )
        };
        if mqd == -1 {
            return Err(Error::last(Op::Open));
        }

        // From here on, any early return closes the descriptor via Drop
        let mut queue = Self {
            mqd: Some(mqd),
            name,
            flags,
            buffer: ReceiveBuffer::empty(),
        };

        if flags.can_read() {
            let attrs = queue.attributes()?;
            queue.buffer = ReceiveBuffer::allocate(attrs.max_message_size as usize)?;
        }

        debug!(
            "Opened message queue {} (mqd {}, flags {:?})",
            queue.name, mqd, flags
        );
        Ok(queue)
    }

    /// Create the queue if needed and open it read-write
    pub fn create(name: &str, attributes: &QueueAttributes) -> Result<Self> {
        Self::open(
            name,
            OpenFlags::READ_WRITE | OpenFlags::CREATE | OpenFlags::CLOEXEC,
            Mode::from_bits_truncate(DEFAULT_MODE as libc::mode_t),
            Some(attributes),
        )
    }

    /// Open an existing queue read-write
    pub fn attach(name: &str) -> Result<Self> {
        Self::open(
            name,
            OpenFlags::READ_WRITE | OpenFlags::CLOEXEC,
            Mode::empty(),
            None,
        )
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    pub fn is_open(&self) -> bool {
        self.mqd.is_some()
    }

    /// Size of the internal receive buffer (zero for write-only handles)
    pub fn message_size(&self) -> usize {
        self.buffer.capacity()
    }

    /// Underlying descriptor, usable with poll/select on Linux
    pub fn raw_descriptor(&self) -> Option<RawFd> {
        self.mqd
    }

    fn descriptor(&self, op: Op) -> Result<libc::mqd_t> {
        self.mqd.ok_or_else(|| Error::closed(op))
    }

    /// Enqueue `data` at `priority`, blocking while the queue is full
    pub fn send(&self, data: &[u8], priority: u32) -> Result<()> {
        let mqd = self.descriptor(Op::Send)?;
        let rv = unsafe {
            libc::mq_send(
                mqd,
                data.as_ptr() as *const libc::c_char,
                data.len(),
                priority as libc::c_uint,
            )
        };
        Error::check(Op::Send, rv)?;
        trace!("Sent {} bytes to {} at priority {}", data.len(), self.name, priority);
        Ok(())
    }

    /// As [`send`](Self::send), giving up with `Timeout` at `deadline`
    pub fn timed_send(
        &self,
        data: &[u8],
        priority: u32,
        deadline: impl Into<Deadline>,
    ) -> Result<()> {
        let mqd = self.descriptor(Op::TimedSend)?;
        let timeout = deadline.into().to_timespec();
        let rv = unsafe {
            libc::mq_timedsend(
                mqd,
                data.as_ptr() as *const libc::c_char,
                data.len(),
                priority as libc::c_uint,
                &timeout,
            )
        };
        Error::check(Op::TimedSend, rv)?;
        trace!("Sent {} bytes to {} at priority {}", data.len(), self.name, priority);
        Ok(())
    }

    /// Dequeue the highest-priority, oldest message
    pub fn receive(&mut self) -> Result<Message> {
        let mqd = self.descriptor(Op::Receive)?;
        let (len, priority) = raw_receive(mqd, self.buffer.as_mut_slice(), None)?;
        Ok(self.take_message(len, priority))
    }

    /// As [`receive`](Self::receive), giving up with `Timeout` at `deadline`
    pub fn timed_receive(&mut self, deadline: impl Into<Deadline>) -> Result<Message> {
        let mqd = self.descriptor(Op::TimedReceive)?;
        let timeout = deadline.into().to_timespec();
        let (len, priority) = raw_receive(mqd, self.buffer.as_mut_slice(), Some(&timeout))?;
        Ok(self.take_message(len, priority))
    }

    /// Receive into a caller-managed buffer, returning length and priority
    ///
    /// `buf` must hold at least the queue's maximum message size, otherwise
    /// the call fails with `BufferTooSmall` and the message stays queued.
    pub fn receive_into(&self, buf: &mut [u8]) -> Result<(usize, u32)> {
        let mqd = self.descriptor(Op::Receive)?;
        raw_receive(mqd, buf, None)
    }

    pub fn timed_receive_into(
        &self,
        buf: &mut [u8],
        deadline: impl Into<Deadline>,
    ) -> Result<(usize, u32)> {
        let mqd = self.descriptor(Op::TimedReceive)?;
        let timeout = deadline.into().to_timespec();
        raw_receive(mqd, buf, Some(&timeout))
    }

    fn take_message(&self, len: usize, priority: u32) -> Message {
        trace!("Received {} bytes from {} at priority {}", len, self.name, priority);
        Message {
            data: self.buffer.filled(len).to_vec(),
            priority,
        }
    }

    /// Snapshot of the queue's limits and current depth
    pub fn attributes(&self) -> Result<QueueAttributes> {
        let mqd = self.descriptor(Op::GetAttr)?;
        let mut raw = QueueAttributes::zeroed_raw();
        Error::check(Op::GetAttr, unsafe { libc::mq_getattr(mqd, &mut raw) })?;
        Ok(QueueAttributes::from_raw(&raw))
    }

    /// Switch this handle between blocking and non-blocking mode
    ///
    /// `O_NONBLOCK` is the only attribute the kernel lets a handle change.
    /// Returns the attributes in effect before the change.
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> Result<QueueAttributes> {
        let mqd = self.descriptor(Op::SetAttr)?;

        let mut new_attr = QueueAttributes::zeroed_raw();
        if nonblocking {
            new_attr.mq_flags = libc::O_NONBLOCK as libc::c_long;
        }
        let mut old_attr = QueueAttributes::zeroed_raw();
        Error::check(Op::SetAttr, unsafe {
            libc::mq_setattr(mqd, &new_attr, &mut old_attr)
        })?;

        self.flags.set(OpenFlags::NONBLOCK, nonblocking);
        Ok(QueueAttributes::from_raw(&old_attr))
    }

    /// Ask for `signal` the next time the queue goes from empty to non-empty
    ///
    /// Registration is single-shot: it is consumed by the delivery and must
    /// be renewed afterwards. Only one process may be registered per queue;
    /// a second registration fails with `AlreadyRegistered`. No signal is
    /// sent while another thread is blocked in a receive on the queue.
    pub fn notify(&self, signal: Signal) -> Result<()> {
        let mqd = self.descriptor(Op::Notify)?;

        let mut event: libc::sigevent = unsafe { std::mem::zeroed() };
        event.sigev_notify = libc::SIGEV_SIGNAL;
        event.sigev_signo = signal as libc::c_int;

        Error::check(Op::Notify, unsafe { mq_notify(mqd, &event) })?;
        debug!("Registered {} for {:?} notifications", self.name, signal);
        Ok(())
    }

    /// Remove this process's notification registration
    pub fn cancel_notify(&self) -> Result<()> {
        let mqd = self.descriptor(Op::Notify)?;
        Error::check(Op::Notify, unsafe { mq_notify(mqd, ptr::null()) })?;
        debug!("Cancelled notifications for {}", self.name);
        Ok(())
    }

    /// Release the descriptor
    ///
    /// The queue itself stays in place. Later calls on this handle, including
    /// a second `close`, fail with `Closed`.
    pub fn close(&mut self) -> Result<()> {
        let mqd = self.mqd.take().ok_or_else(|| Error::closed(Op::Close))?;
        Error::check(Op::Close, unsafe { libc::mq_close(mqd) })?;
        debug!("Closed message queue {} (mqd {})", self.name, mqd);
        Ok(())
    }

    /// Remove the queue's name from the system
    ///
    /// Works whether or not this handle is still open. Handles opened before
    /// the unlink stay usable until they are closed.
    pub fn unlink(&self) -> Result<()> {
        unlink_name(&self.name)
    }
}

impl Drop for MessageQueue {
    fn drop(&mut self) {
        if let Some(mqd) = self.mqd.take() {
            if unsafe { libc::mq_close(mqd) } == -1 {
                warn!(
                    "Failed to close message queue {}: {}",
                    self.name,
                    Error::last(Op::Close)
                );
            }
        }
    }
}

/// Remove the queue `name`
///
/// Fails with `NotFound` if no such queue exists.
pub fn unlink(name: &str) -> Result<()> {
    unlink_name(&QueueName::new(name, Op::Unlink)?)
}

fn unlink_name(name: &QueueName) -> Result<()> {
    Error::check(Op::Unlink, unsafe { libc::mq_unlink(name.as_c_str().as_ptr()) })?;
    debug!("Unlinked message queue {}", name);
    Ok(())
}

fn raw_receive(
    mqd: libc::mqd_t,
    buf: &mut [u8],
    timeout: Option<&libc::timespec>,
) -> Result<(usize, u32)> {
    let mut priority: libc::c_uint = 0;
    let ptr = buf.as_mut_ptr() as *mut libc::c_char;

    let len = match timeout {
        None => {
            let rv = unsafe { libc::mq_receive(mqd, ptr, buf.len(), &mut priority) };
            Error::check_len(Op::Receive, rv)?
        }
        Some(timeout) => {
            let rv =
                unsafe { libc::mq_timedreceive(mqd, ptr, buf.len(), &mut priority, timeout) };
            Error::check_len(Op::TimedReceive, rv)?
        }
    };

    Ok((len, priority as u32))
}
