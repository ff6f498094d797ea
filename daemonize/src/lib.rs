mod error;
mod fork;
mod stdio;

use fork::{execute_fork, ForkResult};
use stdio::redirect_stream;

pub use error::{get_err, get_errno, Error, IsErr, Result};
pub use stdio::close_inherited_fds;

/// Detach from the controlling terminal.
///
/// Forks once; the parent exits 0 and the child carries on as the new
/// supervisor process, with its standard streams on /dev/null and its own
/// session.
pub fn daemonize() -> Result<()> {
    unsafe {
        match execute_fork()? {
            ForkResult::Child => (),
            ForkResult::Parent(_) => libc::exit(libc::EXIT_SUCCESS),
        }

        redirect_stream()?;

        get_err(libc::setsid(), Error::SetSid)?;
    }
    Ok(())
}
