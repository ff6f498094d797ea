pub type Result<T> = std::result::Result<T, Error>;
use std::fmt::Display;
use std::io;

use nix::errno::Errno;

#[derive(Debug)]
pub enum Error {
    // configuration errors, exit code 1
    BadEnvVar(String),
    DuplicateGroupName,
    DuplicateUserName,
    MissingProgram,
    NoFifoPath,
    NulInArgument(String),
    ProgramAndCommand,
    UnknownCommand(String),
    UnknownGroup(String, Option<Errno>),
    UnknownUser(String, Option<Errno>),

    // one-shot client errors, exit code 1
    CommandPipeOpen(String, io::Error),
    CommandPipeWrite(String, io::Error),

    // OS setup failures, exit code 2
    FifoCreate(String, Errno),
    FifoOpen(String, io::Error),
    FifoStat(String, io::Error),
    NotAFifo(String),
    PidFile(String, io::Error),
    SelfPipe(Errno),
    SignalInstall(Errno),
    Daemonize(daemonize::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::BadEnvVar(_)
            | Error::DuplicateGroupName
            | Error::DuplicateUserName
            | Error::MissingProgram
            | Error::NoFifoPath
            | Error::NulInArgument(_)
            | Error::ProgramAndCommand
            | Error::UnknownCommand(_)
            | Error::UnknownGroup(..)
            | Error::UnknownUser(..)
            | Error::CommandPipeOpen(..)
            | Error::CommandPipeWrite(..) => 1,
            Error::FifoCreate(..)
            | Error::FifoOpen(..)
            | Error::FifoStat(..)
            | Error::NotAFifo(_)
            | Error::PidFile(..)
            | Error::SelfPipe(_)
            | Error::SignalInstall(_)
            | Error::Daemonize(_) => 2,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BadEnvVar(v) => write!(f, "bad environment variable: {v}"),
            Error::DuplicateGroupName => {
                write!(f, "group name specified twice, which one do I use?")
            }
            Error::DuplicateUserName => {
                write!(f, "username specified twice, which one do I use?")
            }
            Error::MissingProgram => {
                write!(f, "need a program to run, or a command\n  -h for help")
            }
            Error::NoFifoPath => write!(f, "need a command pipe name"),
            Error::NulInArgument(a) => write!(f, "argument contains a nul byte: {a}"),
            Error::ProgramAndCommand => {
                write!(f, "can't use a program name and a command\n  -h for help")
            }
            Error::UnknownCommand(c) => write!(f, "unknown command {c}"),
            Error::UnknownGroup(name, Some(e)) => write!(f, "unknown group name: {name}: {e}"),
            Error::UnknownGroup(name, None) => write!(f, "unknown group name {name}"),
            Error::UnknownUser(name, Some(e)) => write!(f, "unknown user name: {name}: {e}"),
            Error::UnknownUser(name, None) => write!(f, "unknown user name {name}"),
            Error::CommandPipeOpen(path, e) => {
                write!(f, "cannot open {path}: {e}")?;
                if e.raw_os_error() == Some(libc::ENXIO) {
                    write!(f, "\n  Is there a reader process?")?;
                }
                Ok(())
            }
            Error::CommandPipeWrite(path, e) => write!(f, "cannot write to {path}: {e}"),
            Error::FifoCreate(path, e) => write!(f, "cannot make fifo {path}: {e}"),
            Error::FifoOpen(path, e) => write!(f, "cannot open {path}: {e}"),
            Error::FifoStat(path, e) => write!(f, "cannot stat {path}: {e}"),
            Error::NotAFifo(path) => write!(f, "{path} exists but is not a fifo"),
            Error::PidFile(path, e) => write!(f, "cannot open {path} for writing: {e}"),
            Error::SelfPipe(e) => write!(f, "cannot make pipe: {e}"),
            Error::SignalInstall(e) => write!(f, "cannot set signal handler: {e}"),
            Error::Daemonize(e) => Display::fmt(e, f),
        }
    }
}

impl From<daemonize::Error> for Error {
    fn from(e: daemonize::Error) -> Self {
        Error::Daemonize(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_1() {
        assert_eq!(Error::MissingProgram.exit_code(), 1);
        assert_eq!(Error::UnknownCommand("reboot".to_string()).exit_code(), 1);
        assert_eq!(Error::BadEnvVar("=FOO".to_string()).exit_code(), 1);
    }

    #[test]
    fn os_errors_exit_2() {
        assert_eq!(Error::SelfPipe(Errno::EMFILE).exit_code(), 2);
        assert_eq!(Error::NotAFifo("/tmp/x".to_string()).exit_code(), 2);
    }

    #[test]
    fn no_reader_is_reported_distinctly() {
        let e = Error::CommandPipeOpen(
            "/tmp/cf".to_string(),
            io::Error::from_raw_os_error(libc::ENXIO),
        );
        assert!(e.to_string().contains("Is there a reader process?"));

        let e = Error::CommandPipeOpen(
            "/tmp/cf".to_string(),
            io::Error::from_raw_os_error(libc::ENOENT),
        );
        assert!(!e.to_string().contains("Is there a reader process?"));
    }
}
