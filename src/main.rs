mod controller;
mod model;
mod monitor;

use clap::Parser;
use logger::{log_parent, LogInfo};
use model::Args;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // -h and -V print and leave 0; anything else is a usage error
            let code = if e.exit_code() == 0 { 0 } else { 1 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if let Err(e) = monitor::run(args) {
        log_parent(LogInfo::Error, format!("{e}\n"));
        std::process::exit(e.exit_code());
    }
}
