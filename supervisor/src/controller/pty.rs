use std::os::fd::{AsRawFd, OwnedFd};

use logger::{log_child, log_parent, LogInfo};
use nix::errno::Errno;
use nix::unistd::read;

/// A logged line of child output is at most this long, terminator included.
pub(crate) const LINE_MAX: usize = 2048;

const READ_CHUNK: usize = 1024;

/// Reassembles raw pty bytes into lines for logging.
pub(crate) struct LineBuffer {
    data: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(LINE_MAX),
        }
    }

    /// Add one byte; returns a finished line when the byte completes one.
    ///
    /// `\n` and NUL both end a line, and stay in it.  A `\r\n` ending is
    /// collapsed to a lone `\n`.  A line hitting LINE_MAX - 1 bytes with no
    /// terminator is cut there and given a `\n`.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        self.data.push(byte);
        if byte == b'\n' || byte == 0 {
            let len = self.data.len();
            if byte == b'\n' && len >= 2 && self.data[len - 2] == b'\r' {
                self.data.truncate(len - 2);
                self.data.push(b'\n');
            }
            return Some(self.take());
        }
        if self.data.len() == LINE_MAX - 1 {
            self.data.push(b'\n');
            return Some(self.take());
        }
        None
    }

    fn take(&mut self) -> Vec<u8> {
        std::mem::replace(&mut self.data, Vec::with_capacity(LINE_MAX))
    }
}

/// Drain the pty master, logging each completed line as child output.
///
/// EOF and EIO are how a pty reports the child's exit; both close the master
/// and clear it from the state with a single info line.  Any other read
/// error does the same, with the error in the message.
pub(crate) fn read_pty(pty: &mut Option<OwnedFd>, lines: &mut LineBuffer) {
    let Some(fd) = pty.as_ref().map(|p| p.as_raw_fd()) else {
        return;
    };
    loop {
        let mut buf = [0u8; READ_CHUNK];
        match read(fd, &mut buf) {
            Ok(0) | Err(Errno::EIO) => {
                log_parent(LogInfo::Info, "pty closed\n");
                *pty = None;
                return;
            }
            Err(Errno::EAGAIN) => return,
            Err(e) => {
                log_parent(LogInfo::Info, format!("cannot read from pty: {e}\n"));
                *pty = None;
                return;
            }
            Ok(n) => {
                for &byte in &buf[..n] {
                    if let Some(line) = lines.push(byte) {
                        log_child(String::from_utf8_lossy(&line));
                    }
                }
            }
        }
    }
}
