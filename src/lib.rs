#[macro_use]
extern crate tracing;

pub mod dbus;
pub mod escape_tracker;
pub mod input;
pub mod prompt;
pub mod session;
pub mod shell;
pub mod utils;
pub mod veil;
