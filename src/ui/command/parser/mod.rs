use super::status::Scope;
use super::{memory, register, status, Command, CommandError, CommandResult};

pub const STATUS_COMMAND: &str = "xstatus";
pub const STATUS_JSON_COMMAND: &str = "xstatus_json";
pub const STATUS_SPM_SUBCOMMAND: &str = "spm";
pub const STATUS_LAPC_SUBCOMMAND: &str = "lapc";
pub const STATUS_ALL_SUBCOMMAND: &str = "all";
pub const SYMBOL_COMMAND: &str = "symbol";
pub const MEMORY_COMMAND: &str = "memory";
pub const MEMORY_COMMAND_SHORT: &str = "mem";
pub const MEMORY_COMMAND_READ_SUBCOMMAND: &str = "read";
pub const REGISTER_COMMAND: &str = "register";
pub const REGISTER_COMMAND_SHORT: &str = "reg";
pub const REGISTER_COMMAND_READ_SUBCOMMAND: &str = "read";
pub const REGISTER_COMMAND_INFO_SUBCOMMAND: &str = "info";
pub const HELP_COMMAND: &str = "help";
pub const HELP_COMMAND_SHORT: &str = "h";

use chumsky::error::Rich;
use chumsky::prelude::{any, choice, end, just};
use chumsky::{extra, text, Boxed, Parser};

type Err<'a> = extra::Err<Rich<'a, char>>;

pub fn hex<'a>() -> impl chumsky::Parser<'a, &'a str, usize, Err<'a>> + Clone {
    let prefix = just("0x").or(just("0X"));
    prefix
        .ignore_then(
            text::digits(16)
                .at_least(1)
                .to_slice()
                .map(|s: &str| usize::from_str_radix(s, 16).unwrap()),
        )
        .padded()
        .labelled("hexidecimal number")
}

fn command<'a, I>(ctx: &'static str, inner: I) -> Boxed<'a, 'a, &'a str, Command, Err<'a>>
where
    I: chumsky::Parser<'a, &'a str, Command, Err<'a>> + 'a,
{
    inner.then_ignore(end()).labelled(ctx).boxed()
}

impl Command {
    /// Parse input string into command.
    pub fn parse(input: &str) -> CommandResult<Command> {
        Self::parser()
            .parse(input)
            .into_result()
            .map_err(|e| CommandError::Parsing(format!("{}", e[0])))
    }

    fn parser<'a>() -> impl chumsky::Parser<'a, &'a str, Command, Err<'a>> {
        let op = |sym| just(sym).padded();

        let status_json = op(STATUS_JSON_COMMAND)
            .then(op(STATUS_ALL_SUBCOMMAND))
            .map(|_| Command::Status(status::Command::ShowJson));

        let status = op(STATUS_COMMAND)
            .ignore_then(choice((
                op(STATUS_SPM_SUBCOMMAND).map(|_| Scope::Spm),
                op(STATUS_LAPC_SUBCOMMAND).map(|_| Scope::Lapc),
                op(STATUS_ALL_SUBCOMMAND).map(|_| Scope::All),
            )))
            .map(|scope| Command::Status(status::Command::Show(scope)));

        let print_symbol = op(SYMBOL_COMMAND)
            .ignore_then(any().repeated().at_least(1).to_slice())
            .map(|regex: &str| Command::PrintSymbol(regex.trim().to_string()));

        let memory = choice((op(MEMORY_COMMAND), op(MEMORY_COMMAND_SHORT)))
            .ignore_then(op(MEMORY_COMMAND_READ_SUBCOMMAND))
            .ignore_then(hex())
            .map(|addr| Command::Memory(memory::Command::Read(addr)));

        let register = choice((op(REGISTER_COMMAND), op(REGISTER_COMMAND_SHORT)))
            .ignore_then(choice((
                op(REGISTER_COMMAND_INFO_SUBCOMMAND).map(|_| register::Command::Info),
                op(REGISTER_COMMAND_READ_SUBCOMMAND)
                    .ignore_then(text::ascii::ident().padded())
                    .map(|name: &str| register::Command::Read(name.to_string())),
            )))
            .map(Command::Register);

        let help = choice((op(HELP_COMMAND), op(HELP_COMMAND_SHORT)))
            .ignore_then(any().repeated().to_slice())
            .map(|rest: &str| {
                let rest = rest.trim();
                Command::Help {
                    command: (!rest.is_empty()).then(|| rest.to_string()),
                    reason: None,
                }
            });

        choice((
            command(STATUS_JSON_COMMAND, status_json),
            command(STATUS_COMMAND, status),
            command(SYMBOL_COMMAND, print_symbol),
            command(MEMORY_COMMAND, memory),
            command(REGISTER_COMMAND, register),
            command(HELP_COMMAND, help),
        ))
    }
}

#[cfg(test)]
#[test]
fn test_parser() {
    struct TestCase {
        inputs: Vec<&'static str>,
        command_matcher: fn(result: CommandResult<Command>),
    }

    let cases = vec![
        TestCase {
            inputs: vec!["xstatus spm", " xstatus  spm  "],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::Status(status::Command::Show(Scope::Spm))
                ));
            },
        },
        TestCase {
            inputs: vec!["xstatus lapc", "xstatus   lapc "],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::Status(status::Command::Show(Scope::Lapc))
                ));
            },
        },
        TestCase {
            inputs: vec!["xstatus all", "  xstatus all"],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::Status(status::Command::Show(Scope::All))
                ));
            },
        },
        TestCase {
            inputs: vec!["xstatus_json all", " xstatus_json   all "],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::Status(status::Command::ShowJson)
                ));
            },
        },
        TestCase {
            inputs: vec!["xstatus"],
            command_matcher: |result| {
                assert!(result.is_err());
            },
        },
        TestCase {
            inputs: vec!["xstatus_json spm"],
            command_matcher: |result| {
                assert!(result.is_err());
            },
        },
        TestCase {
            inputs: vec!["symbol clGetDebug.*", "symbol  clGetDebug.* "],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::PrintSymbol(regex) if regex == "clGetDebug.*"
                ));
            },
        },
        TestCase {
            inputs: vec![
                "mem read 0x123",
                "memory read 0x123",
                "   mem read   0x123   ",
            ],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::Memory(memory::Command::Read(addr)) if addr == 0x123
                ));
            },
        },
        TestCase {
            inputs: vec!["reg info", "register info", "   reg  info "],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::Register(register::Command::Info)
                ));
            },
        },
        TestCase {
            inputs: vec!["reg read rip", "register read rip", "   reg  read   rip "],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::Register(register::Command::Read(r)) if r == "rip"
                ));
            },
        },
        TestCase {
            inputs: vec!["help", "h", "  help  "],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::Help { command: None, .. }
                ));
            },
        },
        TestCase {
            inputs: vec!["help xstatus", "h xstatus"],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::Help { command: Some(c), .. } if c == "xstatus"
                ));
            },
        },
        TestCase {
            inputs: vec!["xstatus spm lapc", "mem read xyz", "unknown"],
            command_matcher: |result| {
                assert!(result.is_err());
            },
        },
    ];

    for case in cases {
        for input in case.inputs {
            let result = Command::parse(input);
            (case.command_matcher)(result);
        }
    }
}
