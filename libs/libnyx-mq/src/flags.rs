//! Open flags and the options builder

use bitflags::bitflags;
use nix::sys::stat::Mode;

use crate::attr::QueueAttributes;
use crate::error::{Error, ErrorKind, Op, Result};
use crate::queue::MessageQueue;

bitflags! {
    /// `oflag` bits accepted by `mq_open`
    ///
    /// The access mode is one of `READ_ONLY` (zero), `WRITE_ONLY` or
    /// `READ_WRITE`; the rest combine freely.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OpenFlags: libc::c_int {
        const READ_ONLY = libc::O_RDONLY;
        const WRITE_ONLY = libc::O_WRONLY;
        const READ_WRITE = libc::O_RDWR;

        /// Create the queue if it does not exist
        const CREATE = libc::O_CREAT;
        /// With `CREATE`, fail if the queue exists
        const EXCLUSIVE = libc::O_EXCL;
        /// Send/receive return instead of blocking
        const NONBLOCK = libc::O_NONBLOCK;
        /// Close the descriptor across exec
        const CLOEXEC = libc::O_CLOEXEC;
    }
}

impl OpenFlags {
    fn access(&self) -> libc::c_int {
        self.bits() & libc::O_ACCMODE
    }

    pub fn can_read(&self) -> bool {
        matches!(self.access(), libc::O_RDONLY | libc::O_RDWR)
    }

    pub fn can_write(&self) -> bool {
        matches!(self.access(), libc::O_WRONLY | libc::O_RDWR)
    }

    pub fn creates(&self) -> bool {
        self.contains(Self::CREATE)
    }
}

/// Default permission bits for new queues
pub const DEFAULT_MODE: u32 = 0o600;

/// Builder for opening queues, in the manner of `std::fs::OpenOptions`
///
/// ```no_run
/// use libnyx_mq::{OpenOptions, QueueAttributes};
///
/// let queue = OpenOptions::new()
///     .read(true)
///     .write(true)
///     .create(true)
///     .attributes(QueueAttributes::new(10, 128))
///     .open("/jobs")?;
/// # Ok::<(), libnyx_mq::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    read: bool,
    write: bool,
    create: bool,
    create_new: bool,
    nonblocking: bool,
    cloexec: bool,
    mode: Mode,
    attributes: Option<QueueAttributes>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self {
            read: false,
            write: false,
            create: false,
            create_new: false,
            nonblocking: false,
            cloexec: true,
            mode: Mode::from_bits_truncate(DEFAULT_MODE as libc::mode_t),
            attributes: None,
        }
    }

    pub fn read(&mut self, read: bool) -> &mut Self {
        self.read = read;
        self
    }

    pub fn write(&mut self, write: bool) -> &mut Self {
        self.write = write;
        self
    }

    /// Create the queue if it does not exist
    pub fn create(&mut self, create: bool) -> &mut Self {
        self.create = create;
        self
    }

    /// Create the queue, failing if it already exists
    pub fn create_new(&mut self, create_new: bool) -> &mut Self {
        self.create_new = create_new;
        self
    }

    pub fn nonblocking(&mut self, nonblocking: bool) -> &mut Self {
        self.nonblocking = nonblocking;
        self
    }

    pub fn cloexec(&mut self, cloexec: bool) -> &mut Self {
        self.cloexec = cloexec;
        self
    }

    /// Permission bits for a newly created queue
    pub fn mode(&mut self, mode: u32) -> &mut Self {
        self.mode = Mode::from_bits_truncate(mode as libc::mode_t);
        self
    }

    /// Capacity for a newly created queue; ignored on attach
    pub fn attributes(&mut self, attributes: QueueAttributes) -> &mut Self {
        self.attributes = Some(attributes);
        self
    }

    /// Translate into `mq_open` flags
    pub fn to_flags(&self) -> Result<OpenFlags> {
        let mut flags = match (self.read, self.write) {
            (true, false) => OpenFlags::READ_ONLY,
            (false, true) => OpenFlags::WRITE_ONLY,
            (true, true) => OpenFlags::READ_WRITE,
            (false, false) => return Err(Error::new(Op::Open, ErrorKind::InvalidArgument)),
        };

        if self.create || self.create_new {
            flags |= OpenFlags::CREATE;
        }
        if self.create_new {
            flags |= OpenFlags::EXCLUSIVE;
        }
        if self.nonblocking {
            flags |= OpenFlags::NONBLOCK;
        }
        if self.cloexec {
            flags |= OpenFlags::CLOEXEC;
        }
        Ok(flags)
    }

    pub fn open(&self, name: &str) -> Result<MessageQueue> {
        let flags = self.to_flags()?;
        MessageQueue::open(name, flags, self.mode, self.attributes.as_ref())
    }
}
