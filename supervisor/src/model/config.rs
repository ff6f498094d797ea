use std::ffi::CString;
use std::path::PathBuf;

use nix::unistd::{Gid, Group, Uid, User};

use crate::model::{Error, Result};

/// Environment changes to apply in the child, in the order they were given.
///
/// No deduplication happens here; a key given twice is applied twice and the
/// OS keeps the last value.
#[derive(Debug, Default)]
pub struct EnvPolicy {
    pub clear: bool,
    pub set: Vec<(CString, CString)>,
    pub unset: Vec<CString>,
}

impl EnvPolicy {
    /// Record one `-E` argument: `KEY=VALUE` sets, a bare `KEY` unsets.
    pub fn add(&mut self, var: &str) -> Result<()> {
        if var.starts_with('=') {
            return Err(Error::BadEnvVar(var.to_string()));
        }
        match var.split_once('=') {
            Some((key, value)) => {
                self.set.push((cstring(key)?, cstring(value)?));
            }
            None => {
                self.unset.push(cstring(var)?);
            }
        }
        Ok(())
    }
}

/// Everything the supervisor was told on the command line, fixed for the
/// lifetime of the process.
#[derive(Debug)]
pub struct MonitorConfig {
    /// Path of the program to run.
    pub program: CString,
    /// argv for the child; `argv[0]` is the program path itself.
    pub argv: Vec<CString>,
    /// Display name of the child program, for messages.
    pub program_name: String,

    /// Detached from the terminal; changes some signal handling behaviour.
    pub detach: bool,

    pub env: EnvPolicy,
    pub work_dir: Option<CString>,
    pub startup_script: Option<CString>,

    /// Applied in the child only when a user was named on the command line.
    pub run_as_uid: Option<Uid>,
    /// Applied in the child only when a group was named on the command line.
    pub run_as_gid: Option<Gid>,

    pub pid_file: Option<PathBuf>,
    pub command_fifo: Option<PathBuf>,

    pub min_delay: u32,
    pub max_delay: u32,
}

pub fn cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::NulInArgument(s.to_string()))
}

/// Split a `user[:group]` spec into its parts.  A leading colon names only a
/// group; no colon names only a user.
pub fn split_user_spec(spec: &str) -> (Option<&str>, Option<&str>) {
    match spec.split_once(':') {
        None => (Some(spec), None),
        Some(("", group)) => (None, Some(group)),
        Some((user, group)) => (Some(user), Some(group)),
    }
}

/// Combine every `-u` occurrence into one resolved uid/gid pair.
///
/// Each occurrence may name a user, a group (leading colon), or both; naming
/// the same part twice is an error, whichever occurrences it comes from.
pub fn resolve_user_specs(specs: &[String]) -> Result<(Option<Uid>, Option<Gid>)> {
    let mut uid = None;
    let mut gid = None;
    for spec in specs {
        let (user, group) = split_user_spec(spec);
        if let Some(user) = user {
            if uid.is_some() {
                return Err(Error::DuplicateUserName);
            }
            uid = Some(resolve_user(user)?);
        }
        if let Some(group) = group {
            if gid.is_some() {
                return Err(Error::DuplicateGroupName);
            }
            gid = Some(resolve_group(group)?);
        }
    }
    Ok((uid, gid))
}

/// Resolve a user name, or failing that a numeric uid.
pub fn resolve_user(name: &str) -> Result<Uid> {
    let lookup_errno = match User::from_name(name) {
        Ok(Some(user)) => return Ok(user.uid),
        Ok(None) => None,
        Err(e) => Some(e),
    };
    match name.parse::<u32>() {
        Ok(uid) => Ok(Uid::from_raw(uid)),
        Err(_) => Err(Error::UnknownUser(name.to_string(), lookup_errno)),
    }
}

/// Resolve a group name, or failing that a numeric gid.
pub fn resolve_group(name: &str) -> Result<Gid> {
    let lookup_errno = match Group::from_name(name) {
        Ok(Some(group)) => return Ok(group.gid),
        Ok(None) => None,
        Err(e) => Some(e),
    };
    match name.parse::<u32>() {
        Ok(gid) => Ok(Gid::from_raw(gid)),
        Err(_) => Err(Error::UnknownGroup(name.to_string(), lookup_errno)),
    }
}
