use std::os::fd::AsRawFd;
use std::process;
use std::time::{Duration, Instant};

use logger::{log_parent, LogInfo};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::alarm;

use crate::controller::child;
use crate::controller::command_fifo::CommandFifo;
use crate::controller::pty::{read_pty, LineBuffer};
use crate::controller::self_pipe::SelfPipe;
use crate::controller::watch_set::WatchSet;
use crate::model::{Command, MonitorConfig, MonitorState, SignalToken};

/// The supervisor proper: one child, restarted with back-off, driven by a
/// poll loop over the self-pipe, the child's pty and the command fifo.
///
/// Every state transition happens here, on the one thread; the signal
/// handlers only feed bytes in.
pub struct Monitor {
    config: MonitorConfig,
    state: MonitorState,
    self_pipe: SelfPipe,
    fifo: Option<CommandFifo>,
    lines: LineBuffer,
}

impl Monitor {
    pub fn new(config: MonitorConfig, self_pipe: SelfPipe, fifo: Option<CommandFifo>) -> Self {
        let state = MonitorState::new(config.min_delay, config.max_delay);
        Monitor {
            config,
            state,
            self_pipe,
            fifo,
            lines: LineBuffer::new(),
        }
    }

    /// Start the child and supervise it until told to exit.  Every exit
    /// happens inside a handler, so this never returns.
    pub fn run(&mut self) {
        self.start_child();
        loop {
            self.wait_one();
        }
    }

    /// One iteration of the poll loop.
    ///
    /// Separate from `run()` so the graceful shutdown path can keep calling
    /// it while waiting for the child to die; the main loop itself never
    /// needs to know about that mode.
    fn wait_one(&mut self) {
        let mut watch = WatchSet::new();
        watch.push_from_fd(self.self_pipe.read_fd());
        if let Some(pty) = &self.state.pty {
            watch.push_from_fd(pty.as_raw_fd());
        }
        if let Some(fifo) = &self.fifo {
            watch.push_from_fd(fifo.read_fd());
        }

        let timeout_ms = i64::from(self.state.current_delay)
            .saturating_mul(1000)
            .min(i64::from(i32::MAX)) as i32;
        let ret = unsafe { libc::poll(watch.as_mut_ptr(), watch.len() as libc::nfds_t, timeout_ms) };
        if ret == -1 {
            let errno = Errno::last();
            if errno != Errno::EINTR {
                log_parent(LogInfo::Warn, format!("poll error: {errno}\n"));
            }
            return;
        }

        // Read the pty first so nothing the child wrote on its way out is
        // lost behind the exit event.
        if let Some(fd) = self.state.pty.as_ref().map(|p| p.as_raw_fd()) {
            if watch.readable(fd) {
                read_pty(&mut self.state.pty, &mut self.lines);
            }
        }
        if watch.readable(self.self_pipe.read_fd()) {
            for token in self.self_pipe.drain() {
                self.handle_token(token);
            }
        }
        let fifo_readable = self
            .fifo
            .as_ref()
            .is_some_and(|f| watch.readable(f.read_fd()));
        if fifo_readable {
            let commands = match self.fifo.as_mut().map(CommandFifo::drain) {
                Some(Ok(commands)) => commands,
                Some(Err(e)) => {
                    log_parent(LogInfo::Error, format!("{e}\n"));
                    process::exit(e.exit_code());
                }
                None => Vec::new(),
            };
            for command in commands {
                self.handle_command(command);
            }
        }
    }

    fn handle_token(&mut self, token: SignalToken) {
        match token {
            SignalToken::Alarm => self.handle_alarm(),
            SignalToken::Child => self.handle_child_exit(),
            SignalToken::Hangup => self.forward_hangup(),
            SignalToken::Interrupt => self.forward_interrupt(),
            SignalToken::Terminate => self.forward_terminate(),
            SignalToken::User1 => self.stop_monitoring("SIGUSR1"),
            SignalToken::User2 => self.start_monitoring("SIGUSR2"),
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start => self.start_monitoring("Command"),
            Command::Stop => self.stop_monitoring("Command"),
            Command::Hangup => self.forward_hangup(),
            Command::Interrupt => self.forward_interrupt(),
            Command::Exit => self.shutdown_and_exit(),
        }
    }

    fn start_child(&mut self) {
        let mut close_in_child = vec![self.self_pipe.read_fd(), self.self_pipe.write_fd()];
        if let Some(fifo) = &self.fifo {
            close_in_child.push(fifo.read_fd());
            close_in_child.push(fifo.write_fd());
        }
        child::start_child(&self.config, &mut self.state, &close_in_child);
    }

    /// The restart alarm fired.
    fn handle_alarm(&mut self) {
        if self.state.restart_enabled && self.state.child_pid.is_none() {
            self.start_child();
        }
        if self.state.shutdown_pending {
            process::exit(1);
        }
    }

    /// SIGCHLD: reap, log, and either exit, restart or stand down.
    fn handle_child_exit(&mut self) {
        // The pty can still hold output the child flushed on its way out;
        // the exit signal sometimes beats poll's readability report.
        read_pty(&mut self.state.pty, &mut self.lines);

        // waitpid() must happen for any SIGCHLD, even one for a child we are
        // not tracking; only then is the pid compared.
        let status = match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
            Ok(status) => status,
            Err(_) => return,
        };
        let pid = match status {
            WaitStatus::Exited(pid, code) => {
                if Some(pid) == self.state.child_pid && code != 99 {
                    // 99 is the child's own pre-exec failure report; it
                    // already logged the cause
                    log_parent(
                        LogInfo::Info,
                        format!(
                            "{}[{pid}] exited with status {code}\n",
                            self.config.program_name
                        ),
                    );
                }
                pid
            }
            WaitStatus::Signaled(pid, signal, _) => {
                if Some(pid) == self.state.child_pid {
                    log_parent(
                        LogInfo::Info,
                        format!(
                            "{}[{pid}] exited due to signal {signal}\n",
                            self.config.program_name
                        ),
                    );
                }
                pid
            }
            _ => return,
        };
        if Some(pid) != self.state.child_pid {
            return;
        }

        self.state.child_pid = None;
        if self.state.pty.is_some() {
            log_parent(LogInfo::Info, "closing pty\n");
            self.state.pty = None;
        }

        if self.state.shutdown_pending {
            log_parent(LogInfo::Info, "exiting\n");
            process::exit(0);
        }

        if self.state.restart_enabled {
            let wait = self.state.alarm_delay();
            log_parent(LogInfo::Info, format!("waiting for {wait} seconds\n"));
            alarm::set(wait);
            self.state.bump_delay();
        }
    }

    /// Pass SIGHUP on.  A daemon keeps supervising; in the foreground the
    /// next child exit ends the supervisor, and with no child it ends now.
    fn forward_hangup(&mut self) {
        if self.config.detach {
            match self.state.child_pid {
                None => log_parent(LogInfo::Info, "SIGHUP but no child\n"),
                Some(pid) => {
                    log_parent(
                        LogInfo::Info,
                        format!("passing SIGHUP to {}[{pid}]\n", self.config.program_name),
                    );
                    let _ = kill(pid, Signal::SIGHUP);
                }
            }
        } else {
            match self.state.child_pid {
                None => {
                    log_parent(LogInfo::Info, "exiting on SIGHUP\n");
                    process::exit(1);
                }
                Some(pid) => {
                    let _ = kill(pid, Signal::SIGHUP);
                    self.state.shutdown_pending = true;
                }
            }
        }
    }

    /// Pass SIGINT to the child.  A daemon changes no policy; in the
    /// foreground this was probably ^C on our terminal, so follow the child
    /// out.
    fn forward_interrupt(&mut self) {
        let Some(pid) = self.state.child_pid else {
            if self.config.detach {
                log_parent(
                    LogInfo::Info,
                    format!("SIGINT but no child process ({})\n", self.config.program_name),
                );
            } else {
                log_parent(LogInfo::Info, "exiting on SIGINT\n");
                process::exit(1);
            }
            return;
        };
        if self.config.detach {
            log_parent(
                LogInfo::Info,
                format!("passing SIGINT to {}[{pid}]\n", self.config.program_name),
            );
            let _ = kill(pid, Signal::SIGINT);
        } else {
            let _ = kill(pid, Signal::SIGINT);
            self.state.restart_enabled = false;
            self.state.shutdown_pending = true;
        }
    }

    /// Pass SIGTERM to the child and exit when it has.
    fn forward_terminate(&mut self) {
        let Some(pid) = self.state.child_pid else {
            log_parent(LogInfo::Info, "exiting on SIGTERM\n");
            process::exit(1);
        };
        log_parent(
            LogInfo::Info,
            format!("passing SIGTERM to {}[{pid}]\n", self.config.program_name),
        );
        let _ = kill(pid, Signal::SIGTERM);
        self.state.restart_enabled = false;
        self.state.shutdown_pending = true;
    }

    fn stop_monitoring(&mut self, reason: &str) {
        log_parent(
            LogInfo::Info,
            format!("{reason}: I will not monitor {}\n", self.config.program_name),
        );
        self.state.restart_enabled = false;
    }

    fn start_monitoring(&mut self, reason: &str) {
        log_parent(
            LogInfo::Info,
            format!("{reason}: I will monitor {} again\n", self.config.program_name),
        );
        self.state.restart_enabled = true;
        self.state.reset_delay();
        if self.state.child_pid.is_none() {
            self.start_child();
        }
    }

    /// The `x` command: terminate the child, give it six seconds inside the
    /// normal loop (pty and fifo still serviced), then kill, then exit 0.
    fn shutdown_and_exit(&mut self) {
        let start = Instant::now();

        if self.state.child_pid.is_none() {
            process::exit(0);
        }
        self.state.restart_enabled = false;
        self.state.shutdown_pending = true;
        self.send_term_to_child();
        self.state.clamp_bounds(5);
        while start.elapsed() < Duration::from_secs(6) && self.state.child_pid.is_some() {
            self.wait_one();
        }
        if self.state.child_pid.is_some() {
            self.send_kill_to_child();
        }
        process::exit(0);
    }

    fn send_term_to_child(&mut self) {
        let Some(pid) = self.state.child_pid else {
            return;
        };
        log_parent(LogInfo::Info, "Sending SIGTERM\n");
        let _ = kill(pid, Signal::SIGTERM);
    }

    fn send_kill_to_child(&mut self) {
        let Some(pid) = self.state.child_pid else {
            return;
        };
        log_parent(LogInfo::Info, "Sending SIGKILL\n");
        let _ = kill(pid, Signal::SIGKILL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cstring;

    fn sleep_monitor() -> Monitor {
        let config = MonitorConfig {
            program: cstring("/bin/sleep").unwrap(),
            argv: vec![cstring("/bin/sleep").unwrap(), cstring("5").unwrap()],
            program_name: "sleep".to_string(),
            detach: false,
            env: Default::default(),
            work_dir: None,
            startup_script: None,
            run_as_uid: None,
            run_as_gid: None,
            pid_file: None,
            command_fifo: None,
            min_delay: 2,
            max_delay: 10,
        };
        Monitor::new(config, SelfPipe::new().unwrap(), None)
    }

    #[test]
    fn stop_command_disables_restart_and_start_resets_backoff() {
        let mut monitor = sleep_monitor();
        monitor.state.bump_delay();
        monitor.state.bump_delay();
        assert_eq!(monitor.state.current_delay, 8);

        monitor.handle_command(Command::Stop);
        assert!(!monitor.state.restart_enabled);

        // pretend a child is running so start_monitoring does not fork
        monitor.state.child_pid = Some(nix::unistd::Pid::from_raw(1));
        monitor.handle_command(Command::Start);
        assert!(monitor.state.restart_enabled);
        assert_eq!(monitor.state.current_delay, 2);
        monitor.state.child_pid = None;
    }

    #[test]
    fn repeated_stop_commands_are_idempotent() {
        let mut monitor = sleep_monitor();
        monitor.handle_command(Command::Stop);
        let delay = monitor.state.current_delay;
        monitor.handle_command(Command::Stop);
        monitor.handle_command(Command::Stop);
        assert!(!monitor.state.restart_enabled);
        assert_eq!(monitor.state.current_delay, delay);
    }

    #[test]
    fn reap_with_no_child_is_a_no_op() {
        let mut monitor = sleep_monitor();
        monitor.handle_child_exit();
        assert!(monitor.state.child_pid.is_none());
        assert!(monitor.state.restart_enabled);
    }

    // a real child to signal, the way the policy paths see one
    fn adopt_sleeping_child(monitor: &mut Monitor) -> std::process::Child {
        let child = std::process::Command::new("/bin/sleep")
            .arg("30")
            .spawn()
            .unwrap();
        monitor.state.child_pid = Some(nix::unistd::Pid::from_raw(child.id() as i32));
        child
    }

    fn dispose(mut child: std::process::Child) {
        let _ = child.kill();
        let _ = child.wait();
    }

    #[test]
    fn foreground_interrupt_with_child_follows_it_out() {
        let mut monitor = sleep_monitor();
        let child = adopt_sleeping_child(&mut monitor);

        monitor.handle_token(SignalToken::Interrupt);
        assert!(!monitor.state.restart_enabled);
        assert!(monitor.state.shutdown_pending);
        // the child itself is still ours to reap
        assert!(monitor.state.child_pid.is_some());

        dispose(child);
    }

    #[test]
    fn daemon_interrupt_with_child_changes_no_policy() {
        let mut monitor = sleep_monitor();
        monitor.config.detach = true;
        let child = adopt_sleeping_child(&mut monitor);

        monitor.handle_token(SignalToken::Interrupt);
        assert!(monitor.state.restart_enabled);
        assert!(!monitor.state.shutdown_pending);

        dispose(child);
    }

    #[test]
    fn daemon_hangup_keeps_supervising() {
        let mut monitor = sleep_monitor();
        monitor.config.detach = true;
        let child = adopt_sleeping_child(&mut monitor);

        monitor.handle_token(SignalToken::Hangup);
        assert!(monitor.state.restart_enabled);
        assert!(!monitor.state.shutdown_pending);

        // with no child it only logs
        monitor.state.child_pid = None;
        monitor.handle_token(SignalToken::Hangup);
        assert!(!monitor.state.shutdown_pending);

        dispose(child);
    }

    #[test]
    fn terminate_with_child_disables_restart_and_pends_exit() {
        let mut monitor = sleep_monitor();
        let child = adopt_sleeping_child(&mut monitor);

        monitor.handle_token(SignalToken::Terminate);
        assert!(!monitor.state.restart_enabled);
        assert!(monitor.state.shutdown_pending);

        dispose(child);
    }

    #[test]
    fn user1_disables_and_user2_reenables_with_fresh_backoff() {
        let mut monitor = sleep_monitor();
        let child = adopt_sleeping_child(&mut monitor);
        monitor.state.bump_delay();
        monitor.state.bump_delay();

        monitor.handle_token(SignalToken::User1);
        assert!(!monitor.state.restart_enabled);

        monitor.handle_token(SignalToken::User2);
        assert!(monitor.state.restart_enabled);
        assert_eq!(monitor.state.current_delay, monitor.state.min_delay);

        dispose(child);
    }
}
