//! Command dispatch
//!
//! Turns `name(args...)` lines into evaluated calls or signed submissions
//! against one deployed contract, and runs them interactively.

pub mod command;
pub mod console;
pub mod dispatcher;
pub mod error;

pub use command::Command;
pub use console::Session;
pub use dispatcher::{
    format_receipt, render, shape_output, InvocationContext, MethodDispatcher, PresetContext,
};
pub use error::DispatchError;
