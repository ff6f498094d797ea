mod child;
mod command_fifo;
mod event_loop;
mod pid_file;
mod pty;
mod self_pipe;
mod signal;
mod watch_set;

pub use command_fifo::CommandFifo;
pub use event_loop::Monitor;
pub use pid_file::create_pid_file;
pub use self_pipe::SelfPipe;
pub use signal::install_signal_handlers;

use std::os::fd::RawFd;

/// Add O_NONBLOCK to an fd, keeping its other flags.
pub(crate) fn set_nonblocking(fd: RawFd) {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags != -1 {
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
    }
}
