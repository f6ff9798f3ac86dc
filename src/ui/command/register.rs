use crate::debugger::Debugger;
use crate::ui::command;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Read(String),
    Info,
}

#[derive(Debug)]
pub struct RegisterValue {
    pub register_name: String,
    pub value: u64,
}

pub struct Handler<'a> {
    dbg: &'a Debugger,
}

impl<'a> Handler<'a> {
    pub fn new(debugger: &'a Debugger) -> Self {
        Self { dbg: debugger }
    }

    pub fn handle(&self, cmd: &Command) -> command::CommandResult<Vec<RegisterValue>> {
        let response = match cmd {
            Command::Read(register_name) => {
                vec![RegisterValue {
                    register_name: register_name.clone(),
                    value: self.dbg.get_register_value(register_name)?,
                }]
            }
            Command::Info => self
                .dbg
                .registers()?
                .into_iter()
                .map(|(register, value)| RegisterValue {
                    register_name: register.to_string(),
                    value,
                })
                .collect(),
        };

        Ok(response)
    }
}
