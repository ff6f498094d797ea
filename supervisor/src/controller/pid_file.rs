use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use logger::{log_parent, LogInfo};
use once_cell::sync::OnceCell;

use crate::model::{Error, Result};

static PID_FILE: OnceCell<PathBuf> = OnceCell::new();

/// Write our pid (decimal, one trailing newline) and arrange for the file to
/// disappear again on normal exit.
///
/// The hook runs on `exit()` but not on `_exit()`, so a child that dies
/// before exec leaves the parent's file alone.
pub fn create_pid_file(path: &Path) -> Result<()> {
    let mut file =
        fs::File::create(path).map_err(|e| Error::PidFile(path.display().to_string(), e))?;
    file.write_all(format!("{}\n", process::id()).as_bytes())
        .map_err(|e| Error::PidFile(path.display().to_string(), e))?;

    if PID_FILE.set(path.to_path_buf()).is_ok() {
        unsafe {
            libc::atexit(delete_pid_file);
        }
    }
    Ok(())
}

extern "C" fn delete_pid_file() {
    let Some(path) = PID_FILE.get() else { return };
    match fs::remove_file(path) {
        Ok(()) => (),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => (),
        Err(e) => log_parent(
            LogInfo::Warn,
            format!("cannot unlink {}: {e}\n", path.display()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_file_holds_our_pid_and_a_newline() {
        let path = std::env::temp_dir().join(format!("procmon_test_pid_{}", process::id()));

        create_pid_file(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}\n", process::id()));

        fs::remove_file(&path).unwrap();
    }
}
