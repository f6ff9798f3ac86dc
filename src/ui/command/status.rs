use crate::debugger::probe::{self, IpBlock, ProbeRuntime, ProbeTarget};
use crate::ui::command;

/// IP blocks covered by one status command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scope {
    Spm,
    Lapc,
    All,
}

impl Scope {
    fn targets(self) -> Vec<ProbeTarget> {
        match self {
            Scope::Spm => vec![ProbeTarget::for_block(IpBlock::Spm)],
            Scope::Lapc => vec![ProbeTarget::for_block(IpBlock::Lapc)],
            Scope::All => vec![
                ProbeTarget::for_block(IpBlock::Spm),
                ProbeTarget::for_block(IpBlock::Lapc),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `xstatus <scope>`, one plain text report per probed block.
    Show(Scope),
    /// `xstatus_json all`, a single JSON document covering every block.
    ShowJson,
}

pub struct Handler<'a, R: ProbeRuntime> {
    rt: &'a R,
}

impl<'a, R: ProbeRuntime> Handler<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { rt: runtime }
    }

    pub fn handle(&self, cmd: Command) -> command::CommandResult<Vec<String>> {
        match cmd {
            Command::Show(scope) => scope
                .targets()
                .into_iter()
                .map(|target| Ok(probe::fetch(self.rt, &target, false)?))
                .collect(),
            Command::ShowJson => Ok(vec![probe::fetch_all_json(self.rt)?]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::probe::StagedView;
    use crate::debugger::Error;
    use std::cell::RefCell;

    /// Runtime with one scripted report per probed block.
    struct SeqRuntime {
        reports: RefCell<Vec<&'static str>>,
    }

    impl ProbeRuntime for SeqRuntime {
        fn call_view_fn(&self, _: &str) -> Result<StagedView, Error> {
            Ok(StagedView {
                staging: 1,
                handle: 1,
                message: String::new(),
            })
        }

        fn call_view_method(&self, _: u64, _: &str, _: &[u64]) -> Result<u64, Error> {
            Ok(1)
        }

        fn read_remote_string(&self, _: u64) -> Result<String, Error> {
            Ok(self.reports.borrow_mut().remove(0).to_string())
        }

        fn release_view(&self, _: &str, _: u64) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn show_all_reports_spm_then_lapc() {
        let rt = SeqRuntime {
            reports: RefCell::new(vec!["SPM 0: writes 42", "LAPC 0: no violations"]),
        };

        let reports = Handler::new(&rt).handle(Command::Show(Scope::All)).unwrap();
        assert_eq!(reports, vec!["SPM 0: writes 42", "LAPC 0: no violations"]);
    }

    #[test]
    fn single_block_scopes_probe_one_target() {
        for (scope, report) in [(Scope::Spm, "spm report"), (Scope::Lapc, "lapc report")] {
            let rt = SeqRuntime {
                reports: RefCell::new(vec![report]),
            };
            let reports = Handler::new(&rt).handle(Command::Show(scope)).unwrap();
            assert_eq!(reports, vec![report]);
        }
    }
}
