mod client;

pub use client::send_command;
