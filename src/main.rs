use clap::Parser;
use nix::unistd::Pid;
use xstatus::debugger::process::Child;
use xstatus::debugger::Debugger;
use xstatus::ui::config::{self, UIConfig};
use xstatus::ui::console::AppBuilder;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Pid of a running FPGA-accelerated application to attach.
    #[arg(long, short)]
    pid: i32,

    /// Do not save command history between sessions.
    #[arg(long)]
    no_history: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    config::set(UIConfig {
        save_history: !args.no_history,
    });

    let process = Child::from_external(Pid::from_raw(args.pid))?;
    let debugger = Debugger::new(process)?;

    let app = AppBuilder::new().build(debugger)?;
    app.run()
}
