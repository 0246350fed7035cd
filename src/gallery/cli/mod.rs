//! Command-line client: argument parsing, dispatch, and terminal rendering.
//! Not part of the library API.

mod commands;
mod render;
mod setup;

pub use commands::run;
