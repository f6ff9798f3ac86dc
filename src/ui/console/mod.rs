use crate::debugger::Debugger;
use crate::ui::command::{memory, register, status, symbol, Command, CommandError};
use crate::ui::config;
use crate::ui::console::editor::{create_editor, RLHelper};
use crate::ui::console::help::help_for_command;
use crate::ui::console::print::style::{AddressView, ErrorView, FilePathView};
use crate::weak_error;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::path::PathBuf;
use std::sync::Once;

mod editor;
mod help;
pub mod print;

const WELCOME_TEXT: &str = r#"
xstatus greets
"#;
const PROMT: &str = "(xs) ";

type XSEditor = Editor<RLHelper, DefaultHistory>;

pub struct AppBuilder;

impl AppBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(self, debugger: Debugger) -> anyhow::Result<TerminalApplication> {
        let editor = create_editor()?;
        Ok(TerminalApplication { debugger, editor })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TerminalApplication {
    debugger: Debugger,
    editor: XSEditor,
}

pub static LOGGER_ONCE: Once = Once::new();

impl TerminalApplication {
    pub fn run(mut self) -> anyhow::Result<()> {
        LOGGER_ONCE.call_once(|| {
            env_logger::init();
        });

        println!("{WELCOME_TEXT}");
        println!(
            "attached to {} (pid {})",
            FilePathView::from(self.debugger.process().program()),
            self.debugger.process().pid(),
        );

        let history = history_file();
        if let Some(ref path) = history {
            _ = self.editor.load_history(path);
        }

        loop {
            match self.editor.readline(PROMT) {
                Ok(input) => {
                    if input == "q" || input == "quit" {
                        break;
                    }

                    _ = self.editor.add_history_entry(&input);
                    if let Err(e) = self.handle_command(&input) {
                        if e.is_fatal() {
                            println!("{}", ErrorView::from("shutdown debugger"));
                            println!("{}", ErrorView::from(format!("fatal debugger error: {e:#}")));
                            break;
                        }
                        println!("{}", ErrorView::from(format!("debugger error: {e:#}")));
                    }
                }
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
                Err(err) => {
                    println!("error: {:#}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = history {
            _ = self.editor.save_history(path);
        }

        weak_error!(self.debugger.detach(), "detach:");
        Ok(())
    }

    fn handle_command(&mut self, cmd: &str) -> Result<(), CommandError> {
        match Command::parse(cmd)? {
            Command::Status(status_cmd) => status::Handler::new(&self.debugger)
                .handle(status_cmd)?
                .into_iter()
                .for_each(|report| println!("{report}")),
            Command::PrintSymbol(regex) => {
                let symbols = symbol::Handler::new(&self.debugger).handle(&regex)?;
                for symbol in symbols {
                    println!(
                        "{} - {:?} {}",
                        symbol.display_name(),
                        symbol.kind,
                        AddressView::from(symbol.addr)
                    );
                }
            }
            Command::Memory(mem_cmd) => {
                let read = memory::Handler::new(&self.debugger).handle(mem_cmd)?;
                println!("{:#016X}", read);
            }
            Command::Register(reg_cmd) => {
                let response = register::Handler::new(&self.debugger).handle(&reg_cmd)?;
                response.iter().for_each(|register| {
                    println!("{:10} {:#016X}", register.register_name, register.value);
                });
            }
            Command::Help { reason, command } => {
                if let Some(reason) = reason {
                    println!("{reason}");
                }
                println!("{}", help_for_command(command.as_deref()));
            }
        }

        Ok(())
    }
}

fn history_file() -> Option<PathBuf> {
    if !config::current().save_history {
        return None;
    }
    home::home_dir().map(|home| home.join(".xstatus_history"))
}
