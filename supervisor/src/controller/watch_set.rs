use std::ops::{Deref, DerefMut};
use std::os::fd::RawFd;

const POLLFLAGS: i16 = libc::POLLIN;

/// The read set for one poll round.  Rebuilt every iteration, since the pty
/// and fifo fds come and go with the child and the pipe.
pub(crate) struct WatchSet {
    inner: Vec<libc::pollfd>,
}

impl Deref for WatchSet {
    type Target = Vec<libc::pollfd>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for WatchSet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl WatchSet {
    pub fn new() -> Self {
        Self { inner: vec![] }
    }

    pub fn push_from_fd(&mut self, fd: RawFd) {
        self.inner.push(libc::pollfd {
            fd,
            events: POLLFLAGS,
            revents: 0,
        });
    }

    /// Hangup and error count as readable: a pty master raises POLLHUP when
    /// the child exits, and the read that follows sees the EOF or EIO.
    pub fn readable(&self, fd: RawFd) -> bool {
        self.inner
            .iter()
            .any(|p| p.fd == fd && (p.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR)) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_set_reports_nothing_readable() {
        let mut set = WatchSet::new();
        set.push_from_fd(0);
        set.push_from_fd(7);
        assert!(!set.readable(0));
        assert!(!set.readable(7));
        assert!(!set.readable(42));
    }

    #[test]
    fn pollin_and_pollhup_both_mean_readable() {
        let mut set = WatchSet::new();
        set.push_from_fd(3);
        set.push_from_fd(4);
        set[0].revents = libc::POLLIN;
        set[1].revents = libc::POLLHUP;
        assert!(set.readable(3));
        assert!(set.readable(4));
    }
}
