//! Command grammar: `name(arg, ...)` with an optional trailing `;`
//!
//! The argument list is read as the elements of one JSON array, so strings
//! are quoted and numbers may be given bare or as decimal strings.

use super::DispatchError;
use crate::contract::AbiError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn command_pattern() -> &'static Regex {
    static COMMAND: OnceLock<Regex> = OnceLock::new();
    COMMAND.get_or_init(|| {
        Regex::new(r"^([a-zA-Z_$][0-9a-zA-Z_$]*)\((.*)\);?$").expect("command pattern must compile")
    })
}

/// A command line split into its method name and raw argument text
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub method: String,
    arguments: String,
}

impl Command {
    /// Check the grammar only; arguments are parsed by [`Command::args`]
    pub fn parse(line: &str) -> Result<Self, DispatchError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(DispatchError::EmptyCommand);
        }

        let captures = command_pattern()
            .captures(line)
            .ok_or_else(|| DispatchError::InvalidCommand(line.to_string()))?;

        Ok(Self {
            method: captures[1].to_string(),
            arguments: captures[2].to_string(),
        })
    }

    /// Argument literals, read as the elements of one JSON array
    pub fn args(&self) -> Result<Vec<Value>, DispatchError> {
        let list = format!("[{}]", self.arguments);
        serde_json::from_str(&list)
            .map_err(|e| AbiError::InvalidArguments(e.to_string()).into())
    }
}
