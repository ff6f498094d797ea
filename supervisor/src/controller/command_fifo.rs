use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use logger::{log_parent, LogInfo};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;

use crate::model::{Command, Error, Result};

/// The named fifo external writers drop command bytes into.
#[derive(Debug)]
pub struct CommandFifo {
    path: PathBuf,
    reader: File,
    /// Held open so the read side never sees EOF between writers.  Never
    /// written to.  O_RDWR on a fifo is undefined by POSIX, hence two opens.
    writer: File,
}

impl CommandFifo {
    /// Create the fifo if it does not exist, then open both ends.
    pub fn open(path: &Path) -> Result<Self> {
        match fs::metadata(path) {
            Ok(meta) if meta.file_type().is_fifo() => (),
            Ok(_) => return Err(Error::NotAFifo(path.display().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                mkfifo(path, Mode::from_bits_truncate(0o610))
                    .map_err(|e| Error::FifoCreate(path.display().to_string(), e))?;
            }
            Err(e) => return Err(Error::FifoStat(path.display().to_string(), e)),
        }

        let reader = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| Error::FifoOpen(path.display().to_string(), e))?;
        // Cannot block: our own read end is already open.
        let writer = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| Error::FifoOpen(path.display().to_string(), e))?;

        Ok(CommandFifo {
            path: path.to_path_buf(),
            reader,
            writer,
        })
    }

    pub fn read_fd(&self) -> RawFd {
        self.reader.as_raw_fd()
    }

    pub fn write_fd(&self) -> RawFd {
        self.writer.as_raw_fd()
    }

    /// Read command bytes while any are available.  Each byte is one
    /// command; unknown bytes are logged and dropped.  EOF or a read error
    /// closes and reopens the fifo.
    pub fn drain(&mut self) -> Result<Vec<Command>> {
        let mut commands = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => {
                    // eof - should never happen while we hold the write end
                    log_parent(LogInfo::Warn, "command fifo closed, reopening\n");
                    *self = CommandFifo::open(&self.path)?;
                    return Ok(commands);
                }
                Ok(_) => match Command::from_byte(byte[0]) {
                    Some(command) => commands.push(command),
                    None => log_unknown(byte[0]),
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(commands),
                Err(e) => {
                    log_parent(
                        LogInfo::Warn,
                        format!("error reading from {}: {e}\n", self.path.display()),
                    );
                    *self = CommandFifo::open(&self.path)?;
                    return Ok(commands);
                }
            }
        }
    }
}

fn log_unknown(byte: u8) {
    if byte.is_ascii_graphic() {
        log_parent(
            LogInfo::Warn,
            format!("unknown command char {}\n", byte as char),
        );
    } else {
        log_parent(LogInfo::Warn, format!("unknown command char 0x{byte:02x}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    struct Defer<F: FnOnce()>(Option<F>);

    impl<F: FnOnce()> Drop for Defer<F> {
        fn drop(&mut self) {
            if let Some(f) = self.0.take() {
                f();
            }
        }
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("procmon_test_{}_{name}", std::process::id()))
    }

    #[test]
    fn missing_fifo_is_created_with_mode_0610() {
        let path = scratch_path("create");
        let cleanup = path.clone();
        let _defer = Defer(Some(move || {
            let _ = fs::remove_file(cleanup);
        }));

        // pin the umask so the mode assertion holds wherever the tests run
        let old_mask = unsafe { libc::umask(0o022) };
        let fifo = CommandFifo::open(&path);
        unsafe { libc::umask(old_mask) };

        let fifo = fifo.unwrap();
        let meta = fs::metadata(&path).unwrap();
        assert!(meta.file_type().is_fifo());
        assert_eq!(meta.permissions().mode() & 0o777, 0o610);
        assert!(fifo.read_fd() >= 0);
        assert!(fifo.write_fd() >= 0);
    }

    #[test]
    fn a_regular_file_in_the_way_is_refused() {
        let path = scratch_path("notafifo");
        let cleanup = path.clone();
        let _defer = Defer(Some(move || {
            let _ = fs::remove_file(cleanup);
        }));
        fs::write(&path, b"not a fifo").unwrap();

        match CommandFifo::open(&path) {
            Err(Error::NotAFifo(_)) => (),
            other => panic!("expected NotAFifo, got {other:?}"),
        }
    }

    #[test]
    fn bytes_written_by_a_client_come_out_as_commands() {
        let path = scratch_path("drain");
        let cleanup = path.clone();
        let _defer = Defer(Some(move || {
            let _ = fs::remove_file(cleanup);
        }));

        let mut fifo = CommandFifo::open(&path).unwrap();
        assert!(fifo.drain().unwrap().is_empty());

        let mut client = OpenOptions::new().write(true).open(&path).unwrap();
        client.write_all(b"+-q").unwrap();
        drop(client);

        // the q is logged and dropped; the held-open write end keeps the
        // client's close from reading as eof
        assert_eq!(fifo.drain().unwrap(), vec![Command::Start, Command::Stop]);
        assert!(fifo.drain().unwrap().is_empty());
    }
}
