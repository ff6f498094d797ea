use std::path::PathBuf;

use clap::Parser;

/// Run a program under a pseudo-terminal, log its output line by line, and
/// restart it when it exits, backing off exponentially.
#[derive(Parser, Debug)]
#[command(name = "procmon", version)]
pub struct Args {
    /// Change to <DIR> before starting the child
    #[arg(short = 'D', long = "dir", value_name = "DIR")]
    pub dir: Option<String>,

    /// Go into the background (changes some signal handling behaviour)
    #[arg(short = 'd', long = "daemon")]
    pub daemon: bool,

    /// Clear the environment before setting the vars given with -E
    #[arg(short = 'C', long = "clear-env")]
    pub clear_env: bool,

    /// Make a running supervisor react to <COMMAND>
    /// (start, stop, exit, hup or int)
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    pub command: Option<String>,

    /// Environment var for the child: KEY=VALUE sets, a bare KEY unsets
    /// (can use multiple times)
    #[arg(short = 'E', long = "env", value_name = "VAR")]
    pub env: Vec<String>,

    /// Email when the child restarts (not implemented)
    #[arg(short = 'e', long = "email", value_name = "ADDR")]
    pub email: Option<String>,

    /// Name to use in messages that come from the child process
    #[arg(short = 'L', long = "child-log-name", value_name = "NAME")]
    pub child_log_name: Option<String>,

    /// Name to use in our own messages
    #[arg(short = 'l', long = "log-name", value_name = "NAME")]
    pub log_name: Option<String>,

    /// Maximum time between child starts (seconds)
    #[arg(
        short = 'M',
        long = "max-wait-time",
        value_name = "TIME",
        default_value_t = 300
    )]
    pub max_wait_time: u32,

    /// Minimum time between child starts (seconds)
    #[arg(
        short = 'm',
        long = "min-wait-time",
        value_name = "TIME",
        default_value_t = 2
    )]
    pub min_wait_time: u32,

    /// Open named pipe <PIPE> to receive commands
    #[arg(short = 'P', long = "command-pipe", value_name = "PIPE")]
    pub command_pipe: Option<PathBuf>,

    /// Write our PID to <FILE>
    #[arg(short = 'p', long = "pid-file", value_name = "FILE")]
    pub pid_file: Option<PathBuf>,

    /// Shell command to run in the child before the exec
    #[arg(short = 'S', long = "startup-script", value_name = "CMD")]
    pub startup_script: Option<String>,

    /// User to run the child as (name or uid, can be user:group;
    /// can use multiple times for separate user and group parts)
    #[arg(short = 'u', long = "user", value_name = "USER", action = clap::ArgAction::Append)]
    pub user: Vec<String>,

    /// Close all file descriptors from 3 up at startup
    #[arg(short = 'z', long = "release-allfd")]
    pub release_allfd: bool,

    /// Child program and its arguments
    /// (-- is required if any of them begin with -)
    #[arg(value_name = "CHILD", trailing_var_arg = true)]
    pub child: Vec<String>,
}
