use std::os::fd::{AsRawFd, RawFd};

use logger::{log_child, log_parent, LogInfo};
use nix::pty::openpty;
use nix::unistd::{chdir, execv, fork, setgid, setsid, setuid, ForkResult};

use crate::controller::set_nonblocking;
use crate::model::{EnvPolicy, MonitorConfig, MonitorState};

/// Fork the next child behind a fresh pty.
///
/// On failure the supervisor stays up: the next restart window is set to 60
/// seconds and the loop carries on.  On success the parent holds the pty
/// master, non-blocking, with the child's pid recorded; the child never
/// returns from here.
pub(crate) fn start_child(
    config: &MonitorConfig,
    state: &mut MonitorState,
    close_in_child: &[RawFd],
) {
    log_parent(LogInfo::Info, format!("starting {}\n", config.program_name));

    let pty = match openpty(None, None) {
        Ok(pty) => pty,
        Err(e) => {
            state.child_pid = None;
            log_parent(LogInfo::Error, format!("cannot open pty: {e}\n"));
            state.current_delay = 60;
            return;
        }
    };

    match unsafe { fork() } {
        Err(e) => {
            state.child_pid = None;
            log_parent(LogInfo::Error, format!("cannot fork: {e}\n"));
            state.current_delay = 60;
        }
        Ok(ForkResult::Parent { child }) => {
            drop(pty.slave);
            set_nonblocking(pty.master.as_raw_fd());
            state.child_pid = Some(child);
            logger::set_child_pid(child.as_raw());
            state.pty = Some(pty.master);
        }
        Ok(ForkResult::Child) => exec_child(
            config,
            pty.master.as_raw_fd(),
            pty.slave.as_raw_fd(),
            close_in_child,
        ),
    }
}

/// The child side, between fork and exec.
///
/// Any failure past the environment step exits 99; the parent suppresses its
/// exit log for that status because the failure is already logged from here.
/// `_exit` throughout, so the parent's exit hooks never run in the child.
fn exec_child(config: &MonitorConfig, master: RawFd, slave: RawFd, close_fds: &[RawFd]) -> ! {
    // The supervisor's plumbing must not leak into the child.
    for &fd in close_fds {
        unsafe {
            libc::close(fd);
        }
    }
    unsafe {
        libc::close(master);
    }

    // Fresh session with the pty slave as controlling terminal and stdio.
    if setsid().is_err() {
        unsafe { libc::_exit(99) };
    }
    unsafe {
        // Not every system needs the ioctl; ignore its verdict.
        libc::ioctl(slave, libc::TIOCSCTTY, 0);
        if libc::dup2(slave, libc::STDIN_FILENO) == -1
            || libc::dup2(slave, libc::STDOUT_FILENO) == -1
            || libc::dup2(slave, libc::STDERR_FILENO) == -1
        {
            libc::_exit(99);
        }
        if slave > libc::STDERR_FILENO {
            libc::close(slave);
        }
    }

    apply_env(&config.env);

    // Group first, while setgid may still have root privilege.
    if let Some(gid) = config.run_as_gid {
        if let Err(e) = setgid(gid) {
            log_parent(LogInfo::Error, format!("cannot setgid({gid}): {e}\n"));
            unsafe { libc::_exit(99) };
        }
    }
    if let Some(uid) = config.run_as_uid {
        if let Err(e) = setuid(uid) {
            log_parent(LogInfo::Error, format!("cannot setuid({uid}): {e}\n"));
            unsafe { libc::_exit(99) };
        }
    }

    if let Some(dir) = &config.work_dir {
        if let Err(e) = chdir(dir.as_c_str()) {
            log_parent(
                LogInfo::Error,
                format!("cannot chdir() to {}: {e}\n", dir.to_string_lossy()),
            );
            unsafe { libc::_exit(99) };
        }
    }

    if let Some(script) = &config.startup_script {
        let status = unsafe { libc::system(script.as_ptr()) };
        if libc::WIFSIGNALED(status) {
            let sig = libc::WTERMSIG(status);
            if sig == libc::SIGINT || sig == libc::SIGQUIT {
                unsafe { libc::_exit(99) };
            }
        }
    }

    let _ = execv(&config.program, &config.argv);
    log_parent(
        LogInfo::Error,
        format!(
            "cannot exec {}: {}\n",
            config.program_name,
            std::io::Error::last_os_error()
        ),
    );
    unsafe { libc::_exit(99) };
}

/// Apply the environment policy, in the order it was given.  Failures here
/// are warnings only; the start goes ahead.  The child's stdio is already
/// the pty, so these warnings surface as child output.
fn apply_env(env: &EnvPolicy) {
    unsafe {
        if env.clear {
            libc::clearenv();
        }
        for (key, value) in &env.set {
            if libc::setenv(key.as_ptr(), value.as_ptr(), 1) == -1 {
                log_child(format!("error   setting {}\n", key.to_string_lossy()));
            }
        }
        for key in &env.unset {
            if libc::unsetenv(key.as_ptr()) == -1 {
                log_child(format!("error unsetting {}\n", key.to_string_lossy()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_apply_is_last_wins_and_ordered() {
        let mut env = EnvPolicy::default();
        env.add("PROCMON_TEST_APPLY=first").unwrap();
        env.add("PROCMON_TEST_APPLY=second").unwrap();
        env.add("PROCMON_TEST_GONE=x").unwrap();
        env.add("PROCMON_TEST_GONE").unwrap();

        apply_env(&env);

        assert_eq!(
            std::env::var("PROCMON_TEST_APPLY").as_deref(),
            Ok("second")
        );
        assert!(std::env::var("PROCMON_TEST_GONE").is_err());
    }
}
