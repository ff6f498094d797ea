use crate::error::{get_err, Error, Result};

/// Point fd 0, 1 and 2 at /dev/null.
pub(crate) fn redirect_stream() -> Result<()> {
    unsafe {
        get_err(libc::close(libc::STDIN_FILENO), Error::RedirectStream)?;
        let null_fd = get_err(
            libc::open(b"/dev/null\0" as *const [u8; 10] as _, libc::O_RDWR),
            Error::Open,
        )?;
        if null_fd != libc::STDIN_FILENO {
            return Err(Error::InvalidFd {
                fd: null_fd,
                expected: libc::STDIN_FILENO,
            });
        }
        let out_fd = get_err(
            libc::dup2(libc::STDIN_FILENO, libc::STDOUT_FILENO),
            Error::RedirectStream,
        )?;
        if out_fd != libc::STDOUT_FILENO {
            return Err(Error::InvalidFd {
                fd: out_fd,
                expected: libc::STDOUT_FILENO,
            });
        }
        let err_fd = get_err(
            libc::dup2(libc::STDIN_FILENO, libc::STDERR_FILENO),
            Error::RedirectStream,
        )?;
        if err_fd != libc::STDERR_FILENO {
            return Err(Error::InvalidFd {
                fd: err_fd,
                expected: libc::STDERR_FILENO,
            });
        }
    }
    Ok(())
}

fn get_rlimit() -> Result<i64> {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    unsafe {
        get_err(
            libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) as i32,
            Error::Rlimit,
        )?;
    }
    Ok(rlim.rlim_cur as i64)
}

fn get_max_fd() -> Result<i32> {
    let max = unsafe { libc::sysconf(libc::_SC_OPEN_MAX) };
    let max = if max == -1 { get_rlimit()? } else { max };
    i32::try_from(max).map_err(|_| Error::Sysconf(libc::ERANGE))
}

/// Close every fd from 3 up to the open-file limit.
///
/// This runs before any logging is set up, so failures to close fds that are
/// in use go unreported.
pub fn close_inherited_fds() {
    let Ok(max_fd) = get_max_fd() else {
        return;
    };
    for fd in 3..max_fd {
        unsafe {
            libc::close(fd);
        }
    }
}
