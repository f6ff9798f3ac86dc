use crate::ui::command::parser;

pub const HELP: &str = r#"
Available commands:

xstatus spm|lapc|all                        -- print performance monitor counters or protocol checker status
xstatus_json all                            -- print status of all available IPs as a single JSON document
symbol <regex>                              -- print symbols kind and address
mem, memory read <addr>                     -- read a word from the attached application memory
reg, register read <name>|info              -- read one or all registers of the suspended application
h, help <>|<command>                        -- show help
q, quit                                     -- detach from the application and exit
"#;

pub const HELP_STATUS: &str = "\
\x1b[32;1mxstatus\x1b[0m
Print the status of hardware IP blocks of the attached application.

Available subcommands:
xstatus spm - print the performance monitor counters when available
xstatus lapc - print the status of lightweight AXI protocol checkers when available
xstatus all - print the status of all available IPs

The attached application stays suspended while the status is collected, a probe
that never returns keeps the command blocked.
";

pub const HELP_STATUS_JSON: &str = "\
\x1b[32;1mxstatus_json\x1b[0m
Print the status of all available IPs as a single JSON document.

Available subcommands:
xstatus_json all - print `{\"spm\": ..., \"lapc\": ...}`, an unavailable IP is
reported as `[{\"error\": \"<message>\"}]` in the corresponding field
";

pub const HELP_SYMBOL: &str = "\
\x1b[32;1msymbol\x1b[0m
Print kind and address of all symbols matching a regular expression, the main
executable and every loaded shared library are searched.

Example of usage:
symbol clGetDebug.* - find the introspection entry points of the application runtime
";

pub const HELP_MEMORY: &str = "\
\x1b[32;1mmem, memory\x1b[0m
Read a word from the attached application memory.

Available subcommands:
mem read <hex address> - read and print a word at the address
";

pub const HELP_REGISTER: &str = "\
\x1b[32;1mreg, register\x1b[0m
Read registers of the suspended application.

Available subcommands:
reg read <register name> - print a single register value
reg info - print all general purpose registers
";

/// Return help about a command or a common help if command not selected.
pub fn help_for_command(command: Option<&str>) -> &str {
    match command {
        Some(parser::STATUS_COMMAND) => HELP_STATUS,
        Some(parser::STATUS_JSON_COMMAND) => HELP_STATUS_JSON,
        Some(parser::SYMBOL_COMMAND) => HELP_SYMBOL,
        Some(parser::MEMORY_COMMAND) | Some(parser::MEMORY_COMMAND_SHORT) => HELP_MEMORY,
        Some(parser::REGISTER_COMMAND) | Some(parser::REGISTER_COMMAND_SHORT) => HELP_REGISTER,
        _ => HELP,
    }
}
