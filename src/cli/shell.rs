use std::io::{self, BufRead};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};

use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output;

/// Set to run commands from stdin without a prompt.
pub const SCRIPT_ENV: &str = "CLAIM_WIZARD_CLI_SCRIPT";

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<ClaimHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(ClaimHelper::new(
        context.command_names(),
        context.field_ids(),
        context.section_ids(),
    )));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    output::info("Type `help` to list commands.");
    while context.running {
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();
                if step(context, trimmed)? == LoopControl::Exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                if context.confirm_exit()? {
                    break;
                }
            }
            Err(ReadlineError::Eof) => {
                output::info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    for line in io::stdin().lock().lines() {
        if !context.running {
            break;
        }
        if step(context, &line?)? == LoopControl::Exit {
            break;
        }
    }
    Ok(())
}

/// Runs one line, reporting command errors in place.
fn step(context: &mut ShellContext, line: &str) -> Result<LoopControl, CliError> {
    match handle_line(context, line) {
        Ok(control) => Ok(control),
        Err(err) => {
            context.report_error(err)?;
            Ok(LoopControl::Continue)
        }
    }
}

fn handle_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let tokens = match shell_words::split(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(format!("Could not read that line: {}", err));
            return Ok(LoopControl::Continue);
        }
    };

    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    if raw.starts_with('#') {
        return Ok(LoopControl::Continue);
    }

    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    let control = context.dispatch(&raw.to_lowercase(), raw, &args)?;
    if control == LoopControl::Exit {
        context.running = false;
    }
    Ok(control)
}

/// Tab completion for command names, then field or section ids as the
/// command's first argument.
struct ClaimHelper {
    commands: Vec<&'static str>,
    fields: Vec<&'static str>,
    sections: Vec<&'static str>,
}

impl ClaimHelper {
    fn new(
        mut commands: Vec<&'static str>,
        mut fields: Vec<&'static str>,
        sections: Vec<&'static str>,
    ) -> Self {
        commands.sort_unstable();
        fields.sort_unstable();
        Self {
            commands,
            fields,
            sections,
        }
    }

    /// Start of the word under the cursor and the ids that could finish it.
    fn candidates(&self, before_cursor: &str) -> (usize, Vec<&'static str>) {
        let start = before_cursor
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let needle = before_cursor[start..].to_ascii_lowercase();
        let previous: Vec<&str> = before_cursor[..start].split_whitespace().collect();

        let pool: &[&'static str] = match previous.as_slice() {
            [] => &self.commands,
            [command] => match command.to_ascii_lowercase().as_str() {
                "set" | "clear" | "attach" => &self.fields,
                "goto" | "show" => &self.sections,
                _ => &[],
            },
            _ => &[],
        };
        let matches = pool
            .iter()
            .copied()
            .filter(|candidate| candidate.starts_with(&needle))
            .collect();
        (start, matches)
    }
}

impl Completer for ClaimHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, matches) = self.candidates(&line[..pos]);
        let pairs = matches
            .into_iter()
            .map(|id| Pair {
                display: id.to_string(),
                replacement: id.to_string(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ClaimHelper {
    type Hint = String;
}

impl Highlighter for ClaimHelper {}

impl Validator for ClaimHelper {}

impl Helper for ClaimHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper() -> ClaimHelper {
        ClaimHelper::new(
            vec!["set", "show", "sections", "goto", "attach", "save"],
            vec!["claim-number", "claim-file", "comments", "selling-dealer"],
            vec!["dealer-info", "contract-info", "vehicle-info"],
        )
    }

    #[test]
    fn first_word_completes_commands() {
        assert_eq!(helper().candidates("se"), (0, vec!["sections", "set"]));
        assert_eq!(helper().candidates("S").1, vec!["save", "sections", "set", "show"]);
    }

    #[test]
    fn field_commands_complete_field_ids() {
        assert_eq!(helper().candidates("set cla"), (4, vec!["claim-file", "claim-number"]));
        assert_eq!(helper().candidates("attach claim-f"), (7, vec!["claim-file"]));
        assert_eq!(helper().candidates("CLEAR  co").1, vec!["comments"]);
    }

    #[test]
    fn section_commands_complete_section_ids() {
        assert_eq!(helper().candidates("goto c"), (5, vec!["contract-info"]));
        assert_eq!(helper().candidates("show ").1.len(), 3);
    }

    #[test]
    fn later_arguments_are_not_completed() {
        assert!(helper().candidates("set claim-number cl").1.is_empty());
        assert!(helper().candidates("save cl").1.is_empty());
    }
}
