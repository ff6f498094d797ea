use std::fmt::Display;
use std::process;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;

use chrono::offset::Local;
use once_cell::sync::OnceCell;
use syslog::{Facility, Formatter3164, Logger, LoggerBackend};

pub enum LogInfo {
    Info,
    Warn,
    Error,
}

static PARENT_NAME: OnceCell<String> = OnceCell::new();
static CHILD_NAME: OnceCell<String> = OnceCell::new();
static CHILD_PID: AtomicI32 = AtomicI32::new(0);
static IS_DAEMON: AtomicBool = AtomicBool::new(false);

// One cached connection per tag; the child one is rebuilt whenever the child
// pid changes, since the pid is baked into the syslog header.
static PARENT_SYSLOG: Mutex<Option<(i32, Logger<LoggerBackend, Formatter3164>)>> = Mutex::new(None);
static CHILD_SYSLOG: Mutex<Option<(i32, Logger<LoggerBackend, Formatter3164>)>> = Mutex::new(None);

pub fn set_parent_name(name: &str) {
    let _ = PARENT_NAME.set(name.to_string());
}

pub fn parent_name() -> &'static str {
    PARENT_NAME.get().map(String::as_str).unwrap_or("procmon")
}

pub fn set_child_name(name: &str) {
    let _ = CHILD_NAME.set(name.to_string());
}

pub fn child_name() -> &'static str {
    CHILD_NAME.get().map(String::as_str).unwrap_or("child")
}

pub fn child_name_is_set() -> bool {
    CHILD_NAME.get().is_some()
}

pub fn set_child_pid(pid: i32) {
    CHILD_PID.store(pid, Ordering::Relaxed);
}

/// Switch every later message over to the daemon syslog facility.  Called
/// once, when the supervisor detaches from the terminal.
pub fn set_daemon_mode() {
    IS_DAEMON.store(true, Ordering::Relaxed);
}

pub fn is_daemon() -> bool {
    IS_DAEMON.load(Ordering::Relaxed)
}

/// Log a message as the supervisor itself.
///
/// Messages carry their own trailing newline, the way the call sites write
/// them.  In the foreground, info goes to stdout and everything else to
/// stderr; as a daemon, everything goes to syslog tagged `name[pid]`.
pub fn log_parent<M>(info: LogInfo, msg: M)
where
    M: Display,
{
    if is_daemon() {
        to_syslog(
            &PARENT_SYSLOG,
            parent_name(),
            process::id() as i32,
            info,
            msg.to_string(),
        );
    } else {
        to_console(parent_name(), info, msg.to_string());
    }
}

/// Log one line of child output, tagged with the child's name and pid.
pub fn log_child<M>(line: M)
where
    M: Display,
{
    if is_daemon() {
        to_syslog(
            &CHILD_SYSLOG,
            child_name(),
            CHILD_PID.load(Ordering::Relaxed),
            LogInfo::Info,
            line.to_string(),
        );
    } else {
        to_console(child_name(), LogInfo::Info, line.to_string());
    }
}

fn to_console(name: &str, info: LogInfo, msg: String) {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S");
    match info {
        LogInfo::Info => print!("{now} {name}: {msg}"),
        _ => eprint!("{now} {name}: {msg}"),
    }
}

fn to_syslog(
    slot: &Mutex<Option<(i32, Logger<LoggerBackend, Formatter3164>)>>,
    name: &str,
    pid: i32,
    info: LogInfo,
    msg: String,
) {
    let Ok(mut slot) = slot.lock() else {
        return;
    };

    let stale = match slot.as_ref() {
        Some((cached_pid, _)) => *cached_pid != pid,
        None => true,
    };
    if stale {
        let formatter = Formatter3164 {
            facility: Facility::LOG_DAEMON,
            hostname: None,
            process: name.to_string(),
            pid: pid as u32,
        };
        match syslog::unix(formatter) {
            Ok(writer) => *slot = Some((pid, writer)),
            Err(e) => {
                eprintln!("{name}: cannot open syslog: {e}");
                return;
            }
        }
    }

    let (_, writer) = slot.as_mut().expect("syslog connection was just cached");
    let text = msg.trim_end_matches('\n').to_string();
    let _ = match info {
        LogInfo::Info => writer.info(text),
        LogInfo::Warn => writer.warning(text),
        LogInfo::Error => writer.err(text),
    };
}
