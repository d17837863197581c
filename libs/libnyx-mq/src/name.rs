//! Queue names
//!
//! POSIX queue names look like `/name`: one leading slash, at least one more
//! character, no further slashes. Linux stores them in the mqueue filesystem,
//! so the part after the slash is capped at `NAME_MAX` bytes.

use crate::error::{Error, ErrorKind, Op, Result};
use std::ffi::{CStr, CString};
use std::fmt;

/// Longest name component accepted by the mqueue filesystem
pub const NAME_MAX: usize = 255;

/// Validated queue name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueName {
    c_name: CString,
}

impl QueueName {
    /// Validate `name` for use by `op`
    pub fn new(name: &str, op: Op) -> Result<Self> {
        let rest = name
            .strip_prefix('/')
            .ok_or(Error::new(op, ErrorKind::InvalidArgument))?;

        if rest.is_empty() || rest.contains('/') {
            return Err(Error::new(op, ErrorKind::InvalidArgument));
        }
        if rest.len() > NAME_MAX {
            return Err(Error::new(op, ErrorKind::NameTooLong));
        }

        let c_name = CString::new(name).map_err(|_| Error::new(op, ErrorKind::InvalidArgument))?;
        Ok(Self { c_name })
    }

    pub fn as_str(&self) -> &str {
        // Built from a &str, so always valid UTF-8
        self.c_name.to_str().unwrap_or_default()
    }

    pub fn as_c_str(&self) -> &CStr {
        &self.c_name
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
