use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use supervisor::{Command, Error, Result};

/// Send one command byte to a running supervisor through its command fifo.
///
/// The fifo is opened non-blocking so a pipe nobody is reading fails with
/// ENXIO right away instead of hanging; that case gets its own diagnostic.
pub fn send_command(name: &str, fifo: Option<&Path>) -> Result<()> {
    let command = Command::try_from(name)?;
    let path = fifo.ok_or(Error::NoFifoPath)?;

    let mut pipe = OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(|e| Error::CommandPipeOpen(path.display().to_string(), e))?;
    pipe.write_all(&[command.byte()])
        .map_err(|e| Error::CommandPipeWrite(path.display().to_string(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use std::path::PathBuf;

    use nix::sys::stat::Mode;
    use nix::unistd::mkfifo;

    struct Defer<F: FnOnce()>(Option<F>);

    impl<F: FnOnce()> Drop for Defer<F> {
        fn drop(&mut self) {
            if let Some(f) = self.0.take() {
                f();
            }
        }
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("procmon_client_{}_{name}", std::process::id()))
    }

    #[test]
    fn unknown_command_is_rejected_before_any_io() {
        match send_command("reboot", None) {
            Err(Error::UnknownCommand(name)) => assert_eq!(name, "reboot"),
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
    }

    #[test]
    fn a_command_needs_a_pipe_name() {
        assert!(matches!(send_command("stop", None), Err(Error::NoFifoPath)));
    }

    #[test]
    fn missing_fifo_is_an_open_error() {
        let path = scratch_path("missing");
        assert!(matches!(
            send_command("stop", Some(&path)),
            Err(Error::CommandPipeOpen(..))
        ));
    }

    #[test]
    fn the_byte_lands_in_the_fifo() {
        let path = scratch_path("roundtrip");
        let cleanup = path.clone();
        let _defer = Defer(Some(move || {
            let _ = fs::remove_file(cleanup);
        }));
        mkfifo(&path, Mode::from_bits_truncate(0o610)).unwrap();

        // stand in for the supervisor's reader
        let mut reader = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
            .unwrap();

        send_command("exit", Some(&path)).unwrap();

        let mut buf = [0u8; 4];
        let n = Read::read(&mut reader, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"x");
    }

    #[test]
    fn fifo_without_a_reader_reports_enxio() {
        let path = scratch_path("noreader");
        let cleanup = path.clone();
        let _defer = Defer(Some(move || {
            let _ = fs::remove_file(cleanup);
        }));
        mkfifo(&path, Mode::from_bits_truncate(0o610)).unwrap();

        match send_command("stop", Some(&path)) {
            Err(e @ Error::CommandPipeOpen(..)) => {
                assert!(e.to_string().contains("Is there a reader process?"));
            }
            other => panic!("expected CommandPipeOpen, got {other:?}"),
        }
    }
}
