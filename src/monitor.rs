use logger::{log_parent, LogInfo};
use supervisor::{
    create_pid_file, cstring, install_signal_handlers, resolve_user_specs, CommandFifo, EnvPolicy,
    Error, Monitor, MonitorConfig, Result, SelfPipe,
};

use crate::controller::send_command;
use crate::model::Args;

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Wire everything together, in the order the startup sequence needs: fd
/// release, name resolution, one-shot command dispatch, self-pipe, fifo,
/// detach, pid file, signal handlers, then the loop.
pub fn run(args: Args) -> Result<()> {
    let argv0 = std::env::args().next().unwrap_or_default();
    match &args.log_name {
        Some(name) => logger::set_parent_name(name),
        None => logger::set_parent_name(basename(&argv0)),
    }

    // Runs before any logging exists, so close errors go unreported.
    if args.release_allfd {
        daemonize::close_inherited_fds();
    }

    if args.email.is_some() {
        log_parent(LogInfo::Warn, "email notification is not implemented\n");
    }

    let (run_as_uid, run_as_gid) = resolve_user_specs(&args.user)?;

    let min_delay = args.min_wait_time;
    let mut max_delay = args.max_wait_time;
    if max_delay < min_delay {
        max_delay = min_delay;
        log_parent(
            LogInfo::Info,
            format!("max wait time set to {max_delay} seconds\n"),
        );
    }

    if args.child.is_empty() {
        return match &args.command {
            Some(name) => {
                send_command(name, args.command_pipe.as_deref())?;
                std::process::exit(0)
            }
            None => Err(Error::MissingProgram),
        };
    }
    if args.command.is_some() {
        return Err(Error::ProgramAndCommand);
    }

    let program_path = &args.child[0];
    match &args.child_log_name {
        Some(name) => logger::set_child_name(name),
        None => logger::set_child_name(basename(program_path)),
    }

    let mut env = EnvPolicy::default();
    env.clear = args.clear_env;
    for var in &args.env {
        env.add(var)?;
    }

    let config = MonitorConfig {
        program: cstring(program_path)?,
        argv: args
            .child
            .iter()
            .map(|arg| cstring(arg))
            .collect::<Result<Vec<_>>>()?,
        program_name: basename(program_path).to_string(),
        detach: args.daemon,
        env,
        work_dir: args.dir.as_deref().map(cstring).transpose()?,
        startup_script: args.startup_script.as_deref().map(cstring).transpose()?,
        run_as_uid,
        run_as_gid,
        pid_file: args.pid_file.clone(),
        command_fifo: args.command_pipe.clone(),
        min_delay,
        max_delay,
    };

    // The pipe and fifo exist before the detach fork so their fds survive
    // into the daemon half, exactly once.
    let self_pipe = SelfPipe::new()?;
    let fifo = match &config.command_fifo {
        Some(path) => Some(CommandFifo::open(path)?),
        None => None,
    };

    if config.detach {
        logger::set_daemon_mode();
        daemonize::daemonize()?;
    }

    if let Some(path) = &config.pid_file {
        create_pid_file(path)?;
    }

    install_signal_handlers()?;

    let mut monitor = Monitor::new(config, self_pipe, fifo);
    monitor.run();

    log_parent(
        LogInfo::Error,
        "monitor loop returned.  This should not happen.\n",
    );
    std::process::exit(88)
}
