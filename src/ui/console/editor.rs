use crate::ui::command::parser::{
    HELP_COMMAND, HELP_COMMAND_SHORT, MEMORY_COMMAND, MEMORY_COMMAND_READ_SUBCOMMAND,
    MEMORY_COMMAND_SHORT, REGISTER_COMMAND, REGISTER_COMMAND_INFO_SUBCOMMAND,
    REGISTER_COMMAND_READ_SUBCOMMAND, REGISTER_COMMAND_SHORT, STATUS_ALL_SUBCOMMAND,
    STATUS_COMMAND, STATUS_JSON_COMMAND, STATUS_LAPC_SUBCOMMAND, STATUS_SPM_SUBCOMMAND,
    SYMBOL_COMMAND,
};
use crossterm::style::Stylize;
use rustyline::completion::{Completer, Pair};
use rustyline::history::DefaultHistory;
use rustyline::hint::HistoryHinter;
use rustyline::{CompletionType, Config, Context, Editor};
use rustyline_derive::{Helper, Highlighter, Hinter, Validator};

struct CommandHint {
    short: Option<String>,
    long: String,
    subcommands: Vec<String>,
}

impl CommandHint {
    fn display(&self) -> String {
        if let Some(ref short) = self.short {
            if self.long.starts_with(short) {
                format!(
                    "{}{}",
                    short.clone().bold().underlined(),
                    &self.long[short.len()..]
                )
            } else {
                format!("{}|{}", &self.long, short.clone().bold().underlined())
            }
        } else {
            self.long.clone()
        }
    }

    fn named(&self, token: &str) -> bool {
        self.long == token || self.short.as_deref() == Some(token)
    }
}

pub struct CommandCompleter {
    commands: Vec<CommandHint>,
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let word_start = prefix
            .rfind(|c: char| c.is_whitespace())
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &prefix[word_start..];

        let completing_command = prefix[..word_start].trim().is_empty();
        let candidates = if completing_command {
            self.commands
                .iter()
                .filter(|cmd| cmd.long.starts_with(word))
                .map(|cmd| Pair {
                    display: cmd.display(),
                    replacement: format!("{} ", cmd.long),
                })
                .collect()
        } else {
            let first_token = prefix.split_whitespace().next().unwrap_or_default();
            self.commands
                .iter()
                .filter(|cmd| cmd.named(first_token))
                .flat_map(|cmd| cmd.subcommands.iter())
                .filter(|sub| sub.starts_with(word))
                .map(|sub| Pair {
                    display: sub.clone(),
                    replacement: sub.clone(),
                })
                .collect()
        };

        Ok((word_start, candidates))
    }
}

#[derive(Helper, Highlighter, Hinter, Validator)]
pub struct RLHelper {
    pub completer: CommandCompleter,
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
}

impl Completer for RLHelper {
    type Candidate = <CommandCompleter as Completer>::Candidate;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        self.completer.complete(line, pos, ctx)
    }
}

pub fn create_editor() -> anyhow::Result<Editor<RLHelper, DefaultHistory>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let commands = vec![
        CommandHint {
            short: None,
            long: STATUS_COMMAND.to_string(),
            subcommands: vec![
                STATUS_SPM_SUBCOMMAND.to_string(),
                STATUS_LAPC_SUBCOMMAND.to_string(),
                STATUS_ALL_SUBCOMMAND.to_string(),
            ],
        },
        CommandHint {
            short: None,
            long: STATUS_JSON_COMMAND.to_string(),
            subcommands: vec![STATUS_ALL_SUBCOMMAND.to_string()],
        },
        CommandHint {
            short: None,
            long: SYMBOL_COMMAND.to_string(),
            subcommands: vec![],
        },
        CommandHint {
            short: Some(MEMORY_COMMAND_SHORT.to_string()),
            long: MEMORY_COMMAND.to_string(),
            subcommands: vec![MEMORY_COMMAND_READ_SUBCOMMAND.to_string()],
        },
        CommandHint {
            short: Some(REGISTER_COMMAND_SHORT.to_string()),
            long: REGISTER_COMMAND.to_string(),
            subcommands: vec![
                REGISTER_COMMAND_READ_SUBCOMMAND.to_string(),
                REGISTER_COMMAND_INFO_SUBCOMMAND.to_string(),
            ],
        },
        CommandHint {
            short: Some(HELP_COMMAND_SHORT.to_string()),
            long: HELP_COMMAND.to_string(),
            subcommands: vec![],
        },
        CommandHint {
            short: Some("q".to_string()),
            long: "quit".to_string(),
            subcommands: vec![],
        },
    ];

    let helper = RLHelper {
        completer: CommandCompleter { commands },
        hinter: HistoryHinter {},
    };

    let mut editor = Editor::with_history(config, DefaultHistory::new())?;
    editor.set_helper(Some(helper));
    Ok(editor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completer() -> CommandCompleter {
        CommandCompleter {
            commands: vec![
                CommandHint {
                    short: None,
                    long: "xstatus".to_string(),
                    subcommands: vec!["spm".to_string(), "lapc".to_string(), "all".to_string()],
                },
                CommandHint {
                    short: Some("mem".to_string()),
                    long: "memory".to_string(),
                    subcommands: vec!["read".to_string()],
                },
            ],
        }
    }

    #[test]
    fn complete_command_names() {
        let completer = completer();
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let (start, pairs) = completer.complete("xst", 3, &ctx).unwrap();
        assert_eq!(start, 0);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].replacement, "xstatus ");
    }

    #[test]
    fn complete_subcommands_by_long_and_short_names() {
        let completer = completer();
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let (start, pairs) = completer.complete("xstatus sp", 10, &ctx).unwrap();
        assert_eq!(start, 8);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].replacement, "spm");

        let (_, pairs) = completer.complete("mem r", 5, &ctx).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].replacement, "read");
    }
}
