//! Library half of the `callweave` binary: argument parsing, config
//! resolution and the report commands.

pub mod args;
pub mod driver;
pub mod scenarios;
pub mod shapes;
