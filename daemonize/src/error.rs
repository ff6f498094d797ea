type Errno = libc::c_int;
pub type Result<T> = std::result::Result<T, Error>;
use std::{fmt::Display, io};

#[derive(Debug)]
pub enum Error {
    Fork(Errno),
    InvalidFd { fd: i32, expected: i32 },
    Open(Errno),
    RedirectStream(Errno),
    Rlimit(Errno),
    SetSid(Errno),
    Sysconf(Errno),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Fork(e) => write!(f, "cannot fork: {}", io::Error::from_raw_os_error(*e)),
            Error::InvalidFd { fd, expected } => {
                write!(f, "opening fd {fd}, it should be {expected}")
            }
            Error::Open(e) => write!(
                f,
                "cannot open /dev/null: {}",
                io::Error::from_raw_os_error(*e)
            ),
            Error::RedirectStream(e) => write!(
                f,
                "cannot redirect stream: {}",
                io::Error::from_raw_os_error(*e)
            ),
            Error::Rlimit(e) => write!(
                f,
                "cannot read fd limit: {}",
                io::Error::from_raw_os_error(*e)
            ),
            Error::SetSid(e) => write!(f, "cannot setsid(): {}", io::Error::from_raw_os_error(*e)),
            Error::Sysconf(e) => write!(
                f,
                "cannot read sysconf value: {}",
                io::Error::from_raw_os_error(*e)
            ),
        }
    }
}

pub trait IsErr {
    fn is_err(&self) -> bool;
}
impl IsErr for i32 {
    fn is_err(&self) -> bool {
        *self == -1
    }
}
impl IsErr for i64 {
    fn is_err(&self) -> bool {
        *self == -1
    }
}

pub fn get_err<V, F>(value: V, f: F) -> Result<V>
where
    V: IsErr,
    F: FnOnce(Errno) -> Error,
{
    if value.is_err() {
        Err(f(get_errno()))
    } else {
        Ok(value)
    }
}

pub fn get_errno() -> Errno {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}
