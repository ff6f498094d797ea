use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicI32, Ordering};

use logger::{log_parent, LogInfo};
use nix::errno::Errno;
use nix::unistd::{pipe, read};

use crate::model::{Error, Result, SignalToken};

// The write end, published for the signal handler.  The handler reads this
// and calls write(2); it touches nothing else.
static WRITE_FD: AtomicI32 = AtomicI32::new(-1);

pub(crate) fn published_write_fd() -> RawFd {
    WRITE_FD.load(Ordering::Relaxed)
}

/// The byte pipe bridging signal context and the event loop.
///
/// Signal handlers write one token byte per delivery; the loop drains them as
/// ordinary input.  Children inherit the write end across fork and close it
/// before exec.
pub struct SelfPipe {
    read: OwnedFd,
    write: OwnedFd,
}

impl SelfPipe {
    pub fn new() -> Result<Self> {
        let (read_end, write_end) = pipe().map_err(Error::SelfPipe)?;
        super::set_nonblocking(read_end.as_raw_fd());
        WRITE_FD.store(write_end.as_raw_fd(), Ordering::Relaxed);
        Ok(SelfPipe {
            read: read_end,
            write: write_end,
        })
    }

    pub fn read_fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }

    pub fn write_fd(&self) -> RawFd {
        self.write.as_raw_fd()
    }

    /// Read tokens while bytes are available.
    ///
    /// The read end is non-blocking, so this keeps reading until it would
    /// block.  A zero-byte read means both ends were somehow lost; the pipe
    /// is made afresh and the new write end republished for the handler.
    pub fn drain(&mut self) -> Vec<SignalToken> {
        let mut tokens = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match read(self.read.as_raw_fd(), &mut byte) {
                Ok(0) => {
                    log_parent(LogInfo::Warn, "read end of pipe closed!!\n");
                    match SelfPipe::new() {
                        Ok(fresh) => *self = fresh,
                        Err(e) => log_parent(LogInfo::Error, format!("cannot remake pipe: {e}\n")),
                    }
                    return tokens;
                }
                Ok(_) => match SignalToken::from_byte(byte[0]) {
                    Some(token) => tokens.push(token),
                    None => log_parent(
                        LogInfo::Warn,
                        format!("unknown pipe char: 0x{:02x}\n", byte[0]),
                    ),
                },
                Err(Errno::EAGAIN) => return tokens,
                Err(e) => {
                    log_parent(LogInfo::Warn, format!("cannot read from pipe: {e}\n"));
                    return tokens;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::write;

    #[test]
    fn written_tokens_come_back_out() {
        let mut pipe = SelfPipe::new().unwrap();
        write(&pipe.write, b"C").unwrap();
        write(&pipe.write, b"A").unwrap();
        assert_eq!(pipe.drain(), vec![SignalToken::Child, SignalToken::Alarm]);
    }

    #[test]
    fn unknown_bytes_are_discarded() {
        let mut pipe = SelfPipe::new().unwrap();
        write(&pipe.write, b"?C?").unwrap();
        assert_eq!(pipe.drain(), vec![SignalToken::Child]);
    }

    #[test]
    fn empty_pipe_drains_to_nothing() {
        let mut pipe = SelfPipe::new().unwrap();
        assert!(pipe.drain().is_empty());
    }

    #[test]
    fn write_fd_is_published() {
        let pipe = SelfPipe::new().unwrap();
        assert_eq!(published_write_fd(), pipe.write_fd());
    }
}
