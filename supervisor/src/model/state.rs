use std::os::fd::OwnedFd;

use nix::unistd::Pid;

/// Mutable supervisor state, owned by the event loop.
///
/// `(restart_enabled, shutdown_pending, child_pid)` is the restart state
/// machine; signal tokens, command bytes and reap events drive it.
#[derive(Debug)]
pub struct MonitorState {
    /// Currently running child, if any.
    pub child_pid: Option<Pid>,
    /// Master side of the child's pty.  May be dropped before `child_pid` is
    /// cleared if the pty closed on the child's exec or exit.
    pub pty: Option<OwnedFd>,

    /// Seconds before the next child start.  Doubles on every exit, capped at
    /// `max_delay`.
    pub current_delay: u32,
    /// Effective bounds.  Config never changes, but the graceful shutdown
    /// path clamps these to keep its wait short.
    pub min_delay: u32,
    pub max_delay: u32,

    /// Start another child when this one exits.
    pub restart_enabled: bool,
    /// The next child exit terminates the supervisor.
    pub shutdown_pending: bool,
}

impl MonitorState {
    pub fn new(min_delay: u32, max_delay: u32) -> Self {
        let max_delay = max_delay.max(min_delay);
        MonitorState {
            child_pid: None,
            pty: None,
            current_delay: min_delay,
            min_delay,
            max_delay,
            restart_enabled: true,
            shutdown_pending: false,
        }
    }

    /// Seconds to program into the restart alarm.  A zero delay still arms a
    /// one second alarm; `alarm(0)` would cancel instead of firing.
    pub fn alarm_delay(&self) -> u32 {
        if self.current_delay == 0 {
            1
        } else {
            self.current_delay
        }
    }

    /// Double the delay for the next exit, up to the cap.
    pub fn bump_delay(&mut self) {
        self.current_delay = self.current_delay.saturating_mul(2).min(self.max_delay);
    }

    /// Back to the configured minimum, as when monitoring is (re)enabled.
    pub fn reset_delay(&mut self) {
        self.current_delay = self.min_delay;
    }

    /// Clamp both bounds, and the current delay with them.  Used by the
    /// graceful shutdown path so its wait never sleeps longer than `secs`.
    pub fn clamp_bounds(&mut self, secs: u32) {
        self.min_delay = secs;
        self.max_delay = secs;
        self.current_delay = self.current_delay.min(secs);
    }
}
