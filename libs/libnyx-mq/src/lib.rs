//! # libnyx-mq - POSIX Message Queues
//!
//! Typed access to Linux POSIX message queues: named, priority-ordered
//! kernel queues shared by unrelated processes on one host.
//!
//! ## Features
//!
//! - **Handle lifecycle** - open/create, close on drop, explicit unlink
//! - **Send/receive** - blocking, non-blocking and deadline-bound variants
//! - **Attributes** - queue limits and current depth
//! - **Notification** - one-shot signal when an empty queue gets a message
//!
//! ## Quick Start
//!
//! ```no_run
//! use libnyx_mq::{MessageQueue, QueueAttributes};
//!
//! let mut queue = MessageQueue::create("/test_q", &QueueAttributes::new(10, 128))?;
//! queue.send(b"ping", 0)?;
//!
//! let msg = queue.receive()?;
//! assert_eq!(msg.data, b"ping");
//! assert_eq!(msg.priority, 0);
//!
//! queue.close()?;
//! libnyx_mq::unlink("/test_q")?;
//! # Ok::<(), libnyx_mq::Error>(())
//! ```
//!
//! ## Deadlines
//!
//! ```no_run
//! use libnyx_mq::{Deadline, ErrorKind, MessageQueue};
//! use std::time::Duration;
//!
//! let mut queue = MessageQueue::attach("/test_q")?;
//! match queue.timed_receive(Deadline::after(Duration::from_secs(1))) {
//!     Ok(msg) => println!("got {} bytes", msg.data.len()),
//!     Err(e) if e.kind() == ErrorKind::Timeout => println!("nothing within 1s"),
//!     Err(e) => return Err(e),
//! }
//! # Ok::<(), libnyx_mq::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, libnyx_mq::Error>`. The error carries an
//! [`ErrorKind`], the failing [`Op`] and the raw errno.

pub mod attr;
pub mod buffer;
pub mod deadline;
pub mod error;
pub mod flags;
pub mod name;
pub mod queue;

// Re-export commonly used types at the crate root
pub use attr::{QueueAttributes, MQ_PRIO_MAX, MSGSIZE_MAX};
pub use buffer::ReceiveBuffer;
pub use deadline::Deadline;
pub use error::{Error, ErrorKind, Op, Result};
pub use flags::{OpenFlags, OpenOptions, DEFAULT_MODE};
pub use name::{QueueName, NAME_MAX};
pub use queue::{unlink, Message, MessageQueue};

pub use nix::sys::signal::Signal;
pub use nix::sys::stat::Mode;
