use crate::debugger::Debugger;
use crate::ui::command;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Read(usize),
}

pub struct Handler<'a> {
    dbg: &'a Debugger,
}

impl<'a> Handler<'a> {
    pub fn new(debugger: &'a Debugger) -> Self {
        Self { dbg: debugger }
    }

    pub fn handle(&self, cmd: Command) -> command::CommandResult<usize> {
        match cmd {
            Command::Read(addr) => Ok(self.dbg.read_word(addr)?),
        }
    }
}
