mod command;
mod config;
mod error;
mod state;
mod token;

pub use command::Command;
pub use config::{
    cstring, resolve_group, resolve_user, resolve_user_specs, split_user_spec, EnvPolicy,
    MonitorConfig,
};
pub use error::{Error, Result};
pub use state::MonitorState;
pub use token::SignalToken;
