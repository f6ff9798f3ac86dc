//! An interface to a debugger.
//!
//! Contains commands and corresponding command handlers. Command is a some sort of request to
//! debugger that define an action and a list of input arguments. Command handler validate command,
//! define what exactly debugger must to do and return result of it.

pub mod memory;
pub mod parser;
pub mod register;
pub mod status;
pub mod symbol;

use crate::debugger::Error;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Parsing(String),
    #[error(transparent)]
    Handle(#[from] Error),
}

impl CommandError {
    /// True when an error must stop the whole session, not only the current command.
    pub fn is_fatal(&self) -> bool {
        match self {
            CommandError::Parsing(_) => false,
            CommandError::Handle(err) => err.is_fatal(),
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

/// External commands that can be processed by the debugger.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status(status::Command),
    PrintSymbol(String),
    Memory(memory::Command),
    Register(register::Command),
    Help {
        command: Option<String>,
        reason: Option<String>,
    },
}
