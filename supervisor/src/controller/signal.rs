use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::controller::self_pipe;
use crate::model::{Error, Result, SignalToken};

const CAUGHT: [Signal; 7] = [
    Signal::SIGALRM,
    Signal::SIGCHLD,
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGTERM,
    Signal::SIGUSR1,
    Signal::SIGUSR2,
];

// Async-signal-safe: one table lookup, one raw write(2), stack data only.
// The write result is ignored; a full pipe just coalesces the event.
extern "C" fn trampoline(sig: libc::c_int) {
    if let Some(token) = SignalToken::from_raw_signal(sig) {
        let fd = self_pipe::published_write_fd();
        if fd >= 0 {
            let byte = [token.byte()];
            unsafe {
                libc::write(fd, byte.as_ptr() as *const libc::c_void, 1);
            }
        }
    }
}

/// Install the one process-wide signal action for all seven caught signals.
/// Stopped children do not report; only exits do.
pub fn install_signal_handlers() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(trampoline),
        SaFlags::SA_NOCLDSTOP,
        SigSet::empty(),
    );
    for sig in CAUGHT {
        unsafe { sigaction(sig, &action) }.map_err(Error::SignalInstall)?;
    }
    Ok(())
}
