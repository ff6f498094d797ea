mod controller;
mod model;

pub use controller::{create_pid_file, install_signal_handlers, CommandFifo, Monitor, SelfPipe};
pub use model::{
    cstring, resolve_group, resolve_user, resolve_user_specs, split_user_spec, Command, EnvPolicy,
    Error, MonitorConfig, MonitorState, Result, SignalToken,
};
