use std::{fs, io, path::Path, sync::Arc};

use strsim::levenshtein;
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};

use crate::cli::output;
use crate::config::{ClaimConfig, ConfigManager, DocumentFormat};
use crate::errors::{
    ConfigError, FormError, SectionValidationError, StoreError, SubmissionError,
};
use crate::form::field::{FieldValue, FileRef};
use crate::form::section::Navigation;
use crate::form::wizard::{ClaimWizard, FieldChange};
use crate::storage::{JsonFileStore, SessionPersistence};
use crate::submission::{
    DocumentLayout, DocumentRenderer, HtmlRenderer, OutboxDispatcher, PlainTextRenderer,
    SubmissionOrchestrator, SubmissionState,
};
use crate::time::SystemClock;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Form(#[from] FormError),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Section(#[from] SectionValidationError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("exit requested")]
    ExitRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

type Handler = fn(&mut ShellContext, &[&str]) -> Result<(), CommandError>;

struct CommandSpec {
    name: &'static str,
    usage: &'static str,
    summary: &'static str,
    handler: Handler,
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "help", usage: "help", summary: "List available commands", handler: cmd_help },
    CommandSpec { name: "sections", usage: "sections", summary: "List sections and their completion", handler: cmd_sections },
    CommandSpec { name: "show", usage: "show [section]", summary: "Show the fields of a section", handler: cmd_show },
    CommandSpec { name: "set", usage: "set <field> <value>", summary: "Set a field value", handler: cmd_set },
    CommandSpec { name: "clear", usage: "clear <field>", summary: "Empty a field", handler: cmd_clear },
    CommandSpec { name: "attach", usage: "attach <field> <path>...", summary: "Attach files to a file field", handler: cmd_attach },
    CommandSpec { name: "goto", usage: "goto <section|number>", summary: "Jump to a section", handler: cmd_goto },
    CommandSpec { name: "next", usage: "next", summary: "Advance once the current section is complete", handler: cmd_next },
    CommandSpec { name: "prev", usage: "prev", summary: "Go back one section", handler: cmd_prev },
    CommandSpec { name: "progress", usage: "progress", summary: "Show overall completion", handler: cmd_progress },
    CommandSpec { name: "decode", usage: "decode", summary: "Decode the VIN into make, model and year", handler: cmd_decode },
    CommandSpec { name: "save", usage: "save", summary: "Save the claim for later", handler: cmd_save },
    CommandSpec { name: "load", usage: "load", summary: "Restore the saved claim", handler: cmd_load },
    CommandSpec { name: "preview", usage: "preview", summary: "Render the claim document", handler: cmd_preview },
    CommandSpec { name: "submit", usage: "submit", summary: "Validate the claim and ask for confirmation", handler: cmd_submit },
    CommandSpec { name: "confirm", usage: "confirm", summary: "Send the claim", handler: cmd_confirm },
    CommandSpec { name: "cancel", usage: "cancel", summary: "Return to editing", handler: cmd_cancel },
    CommandSpec { name: "new", usage: "new", summary: "Start a new claim after a submission", handler: cmd_new },
    CommandSpec { name: "exit", usage: "exit", summary: "Leave the shell", handler: cmd_exit },
];

pub struct ShellContext {
    pub mode: CliMode,
    pub running: bool,
    wizard: ClaimWizard,
    orchestrator: SubmissionOrchestrator,
    persistence: SessionPersistence,
    renderer: Box<dyn DocumentRenderer>,
    dispatcher: OutboxDispatcher,
    runtime: Runtime,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let manager = ConfigManager::new()?;
        let config = manager.load()?;
        Self::with_config(mode, manager.base_dir(), &config)
    }

    pub fn with_config(mode: CliMode, base: &Path, config: &ClaimConfig) -> Result<Self, CliError> {
        let mut wizard = ClaimWizard::new(Arc::new(SystemClock))?;
        let store = JsonFileStore::new(config.store_dir_in(base))?;
        let persistence = SessionPersistence::new(Arc::new(store));

        if let Some(session) = persistence.restore(wizard.registry()) {
            wizard.load_session(session);
            output::info("Restored saved claim.");
        }

        let layout = DocumentLayout::from_form(&config.organisation, wizard.sections(), wizard.registry());
        let renderer: Box<dyn DocumentRenderer> = match config.document_format {
            DocumentFormat::Text => Box::new(PlainTextRenderer::new(layout)),
            DocumentFormat::Html => Box::new(HtmlRenderer::new(layout)),
        };
        let dispatcher = OutboxDispatcher::new(config.outbox_dir_in(base), wizard.clock().clone());
        let runtime = Builder::new_current_thread().enable_all().build()?;

        Ok(Self {
            mode,
            running: true,
            wizard,
            orchestrator: SubmissionOrchestrator::new(config.transport()),
            persistence,
            renderer,
            dispatcher,
            runtime,
        })
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        COMMANDS.iter().map(|command| command.name).collect()
    }

    pub fn field_ids(&self) -> Vec<&'static str> {
        self.wizard.registry().keys().collect()
    }

    pub fn section_ids(&self) -> Vec<&'static str> {
        self.wizard.sections().iter().map(|section| section.id).collect()
    }

    pub fn prompt(&self) -> String {
        let section = self.wizard.active_section();
        let completion = self.wizard.completion();
        format!("claim [{} {}%]> ", section.id, completion.percentage)
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let command = match command {
            "quit" => "exit",
            "back" => "prev",
            other => other,
        };
        if let Some(spec) = COMMANDS.iter().find(|spec| spec.name == command) {
            match (spec.handler)(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));
        if let Some(best) = closest(input, COMMANDS.iter().map(|spec| spec.name)) {
            output::info(format!("Suggestion: `{}`?", best));
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        output::info("Press Ctrl-D or type `exit` to leave.");
        Ok(false)
    }

    pub(crate) fn report_error(&mut self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::info("Use `help` for usage details.");
            }
            CommandError::Form(FormError::UnknownField(field)) => {
                output::error(format!("Unknown field `{}`.", field));
                if let Some(best) = closest(&field, self.wizard.registry().keys()) {
                    output::info(format!("Suggestion: `{}`?", best));
                }
            }
            CommandError::Section(err) => {
                output::error(format!("Section `{}` is incomplete.", err.section));
                for field in &err.missing {
                    output::warning(format!("Required: {}", self.label(field)));
                }
            }
            CommandError::Submission(SubmissionError::Validation(report)) => {
                output::error("The claim is not ready to submit.");
                for field in &report.missing {
                    output::warning(format!("Required: {}", self.label(field)));
                }
                for issue in &report.invalid_addresses {
                    output::warning(format!("Invalid address: {} ({})", issue.address, self.label(issue.field)));
                }
                if let Some(section) = report.first_section {
                    self.wizard.go_to(section)?;
                    output::info(format!("Moved to `{}`.", section));
                }
            }
            other => output::error(other.to_string()),
        }
        Ok(())
    }

    fn label(&self, field: &str) -> String {
        self.wizard
            .registry()
            .get(field)
            .map(|descriptor| descriptor.label.clone())
            .unwrap_or_else(|_| field.to_string())
    }

    fn report_change(&self, change: &FieldChange) {
        if !change.changed {
            output::info(format!("{} unchanged.", self.label(change.field)));
            return;
        }
        output::success(format!("{} updated.", self.label(change.field)));
        for field in &change.derived.updated {
            output::info(format!(
                "{} = {}",
                self.label(field),
                self.wizard.value(field)
            ));
        }
        for (field, err) in &change.derived.failures {
            output::warning(format!("{}: {}", self.label(field), err));
        }
        for dependent in self.wizard.visibility().dependents_of(change.field) {
            let state = if self.wizard.visibility().is_visible(self.wizard.session(), dependent) {
                "shown"
            } else {
                "hidden"
            };
            output::info(format!("{} is now {}.", self.label(dependent), state));
        }
        output::info(format!("Progress: {}%", change.completion.percentage));
    }

    fn report_navigation(&self, navigation: Navigation) {
        match navigation {
            Navigation::Moved { to, .. } => {
                let title = self
                    .wizard
                    .navigator()
                    .section(to)
                    .map(|section| section.title)
                    .unwrap_or(to);
                output::section(title);
            }
            Navigation::Stayed(id) => output::info(format!("Already at the edge: `{}`.", id)),
        }
    }
}

fn closest<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .map(|candidate| (levenshtein(candidate, input), candidate))
        .min_by_key(|(distance, _)| *distance)
        .filter(|(distance, _)| *distance <= 3)
        .map(|(_, candidate)| candidate)
}

fn require_args(args: &[&str], count: usize, usage: &str) -> Result<(), CommandError> {
    if args.len() < count {
        return Err(CommandError::InvalidArguments(format!("Usage: {}", usage)));
    }
    Ok(())
}

fn cmd_help(_context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    output::section("Commands");
    for spec in COMMANDS {
        output::info(format!("{:<26} {}", spec.usage, spec.summary));
    }
    Ok(())
}

fn cmd_sections(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    let completion = context.wizard.completion();
    let active = context.wizard.active_section().id;
    for (index, section) in context.wizard.sections().iter().enumerate() {
        let marker = if section.id == active { "*" } else { " " };
        let done = completion
            .section(section.id)
            .map(|entry| format!("{}/{}", entry.filled, entry.required))
            .unwrap_or_default();
        let check = match completion.section(section.id) {
            Some(entry) if entry.completed => " done",
            _ => "",
        };
        output::info(format!(
            "{} {}. {} ({}) {}{}",
            marker,
            index + 1,
            section.title,
            section.id,
            done,
            check
        ));
    }
    Ok(())
}

fn cmd_show(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    let id = match args.first() {
        Some(id) => context.wizard.navigator().section(id)?.id,
        None => context.wizard.active_section().id,
    };
    let section = context.wizard.navigator().section(id)?;
    output::section(section.title);
    for descriptor in context.wizard.visible_fields(id)? {
        let value = context.wizard.value(descriptor.key);
        let shown = match value {
            FieldValue::Empty => "-".to_string(),
            FieldValue::Files(files) => files
                .iter()
                .map(|file| format!("{} ({})", file.name, file.display_size()))
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_string(),
        };
        let mut flags = String::new();
        if descriptor.required {
            flags.push('*');
        }
        if descriptor.derived {
            flags.push_str(" (auto)");
        }
        output::info(format!("{}{} [{}]: {}", descriptor.label, flags, descriptor.key, shown));
    }
    Ok(())
}

fn cmd_set(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    require_args(args, 1, "set <field> <value>")?;
    let value = args[1..].join(" ");
    let change = context.wizard.set_field(args[0], &value)?;
    context.report_change(&change);
    Ok(())
}

fn cmd_clear(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    require_args(args, 1, "clear <field>")?;
    let change = context.wizard.clear_field(args[0])?;
    context.report_change(&change);
    Ok(())
}

fn cmd_attach(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    require_args(args, 2, "attach <field> <path>...")?;
    let mut files = Vec::new();
    for raw in &args[1..] {
        let path = Path::new(raw);
        let size = fs::metadata(path)?.len();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| raw.to_string());
        files.push(FileRef::new(name, size));
    }
    let change = context.wizard.attach_files(args[0], files)?;
    context.report_change(&change);
    Ok(())
}

fn cmd_goto(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    require_args(args, 1, "goto <section|number>")?;
    let target = match args[0].parse::<usize>() {
        Ok(number) => context
            .wizard
            .sections()
            .get(number.wrapping_sub(1))
            .map(|section| section.id)
            .ok_or_else(|| FormError::UnknownSection(args[0].to_string()))?,
        Err(_) => context.wizard.navigator().section(args[0])?.id,
    };
    let navigation = context.wizard.go_to(target)?;
    context.report_navigation(navigation);
    Ok(())
}

fn cmd_next(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    let navigation = context.wizard.advance()?;
    context.report_navigation(navigation);
    Ok(())
}

fn cmd_prev(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    let navigation = context.wizard.retreat();
    context.report_navigation(navigation);
    Ok(())
}

fn cmd_progress(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    let completion = context.wizard.completion();
    output::info(format!(
        "Progress: {}% ({}/{} required fields)",
        completion.percentage, completion.completed_required, completion.total_required
    ));
    Ok(())
}

fn cmd_decode(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    let details = context.wizard.decode_identifier()?;
    output::success(format!(
        "Decoded: {} {} {}",
        details.year, details.make, details.model
    ));
    Ok(())
}

fn cmd_save(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    context
        .persistence
        .save(context.wizard.session(), context.wizard.registry())?;
    output::success("Claim saved.");
    Ok(())
}

fn cmd_load(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    match context.persistence.restore(context.wizard.registry()) {
        Some(session) => {
            context.wizard.load_session(session);
            output::success("Saved claim restored.");
        }
        None => output::warning("No saved claim found."),
    }
    Ok(())
}

fn cmd_preview(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    let preview = context
        .orchestrator
        .preview(&context.wizard, context.renderer.as_ref())?;
    println!("{}", preview.artifact.as_text());
    if !preview.is_ready() {
        output::warning(format!("Not ready to submit: {}", preview.report));
    }
    Ok(())
}

fn cmd_submit(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    let recipient = context.orchestrator.request_submit(&context.wizard)?;
    output::info(format!(
        "Ready to send the claim to {}. Type `confirm` to send or `cancel` to keep editing.",
        recipient
    ));
    Ok(())
}

fn cmd_confirm(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    let outcome = context.runtime.block_on(context.orchestrator.submit(
        &context.wizard,
        context.renderer.as_ref(),
        &context.dispatcher,
    ));
    match outcome {
        Ok(receipt) => {
            output::success(format!("Claim submitted ({}).", receipt.reference));
            output::info("Type `new` to start another claim.");
            Ok(())
        }
        Err(err @ (SubmissionError::Render(_) | SubmissionError::Dispatch(_))) => {
            output::error(format!("Submission failed: {}", err));
            output::info("Your entries are unchanged. Type `confirm` to retry or `cancel` to edit.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn cmd_cancel(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    if matches!(context.orchestrator.state(), SubmissionState::Failed { .. }) {
        context.orchestrator.resume_editing()?;
    } else {
        context.orchestrator.cancel()?;
    }
    output::info("Back to editing.");
    Ok(())
}

fn cmd_new(context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    context
        .orchestrator
        .reset(&mut context.wizard, Some(&context.persistence))?;
    output::success("Started a new claim.");
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    output::info("Exiting shell.");
    Err(CommandError::ExitRequested)
}
