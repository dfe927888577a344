//! Dispatch, error reporting and the shell's shared helpers.

use std::io;

use rustyline::error::ReadlineError;
use strsim::levenshtein;
use thiserror::Error;
use uuid::Uuid;

use ekami_config::ConfigError;
use ekami_core::{CoreError, IdentityProvider, IntakeSession, ValidationError};
use ekami_domain::{short_id, Identity};

use super::io as cli_io;
use super::shell_context::ActiveThread;
pub use super::shell_context::{CliMode, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

/// Failures that end the shell.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Line editor error: {0}")]
    Readline(#[from] ReadlineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
}

/// Failures of a single command; reported and the shell keeps running.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error("You are not signed in.")]
    SignInRequired,
    #[error("No repair request in progress.")]
    NoIntake,
    #[error("No comment thread is open.")]
    NoThread,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl ShellContext {
    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let Some(handler) = self.registry.handler(command) else {
            self.suggest_command(raw);
            return Ok(LoopControl::Continue);
        };
        tracing::debug!(command, args = args.len(), "dispatching command");
        match handler(self, args) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        cli_io::print_warning(format!(
            "Unknown command `{input}`. Type `help` to see available commands."
        ));
        let needle = input.to_lowercase();
        let best = self
            .registry
            .names()
            .map(|name| (levenshtein(name, &needle), name))
            .min_by_key(|(distance, _)| *distance);
        if let Some((distance, name)) = best {
            if distance <= 3 {
                cli_io::print_info(format!("Suggestion: `{name}`?"));
            }
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                cli_io::print_error(message);
                cli_io::print_hint("Use `help <command>` for usage details.");
            }
            CommandError::SignInRequired => {
                cli_io::print_error("You are not signed in.");
                cli_io::print_hint("Use `login <user-id> <email> [display name]` first.");
            }
            CommandError::NoIntake => {
                cli_io::print_error("No repair request in progress.");
                cli_io::print_hint("Use `repair start [package ...]` to begin one.");
            }
            CommandError::NoThread => {
                cli_io::print_error("No comment thread is open.");
                cli_io::print_hint("Use `comments show <post-id>` first.");
            }
            other => cli_io::print_error(other),
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        cli_io::confirm_action(&self.theme, "Exit shell?", true)
    }

    pub(crate) fn can_prompt(&self) -> bool {
        self.mode == CliMode::Interactive
    }

    pub(crate) fn prompt(&self) -> String {
        let mut prompt = String::from("ekami");
        if let Some(identity) = self.current_identity() {
            prompt.push_str(&format!(" [{}]", identity.user_id));
        }
        if let Some(session) = &self.intake {
            let sequencer = session.sequencer();
            prompt.push_str(&format!(
                " (repair {}/{})",
                sequencer.position(),
                sequencer.total()
            ));
        }
        prompt.push_str("> ");
        prompt
    }

    pub(crate) fn current_identity(&self) -> Option<Identity> {
        self.identity.current_identity()
    }

    pub(crate) fn require_identity(&self) -> Result<Identity, CommandError> {
        self.current_identity().ok_or(CommandError::SignInRequired)
    }

    pub(crate) fn intake_mut(&mut self) -> Result<&mut IntakeSession, CommandError> {
        self.intake.as_mut().ok_or(CommandError::NoIntake)
    }

    pub(crate) fn thread_mut(&mut self) -> Result<&mut ActiveThread, CommandError> {
        self.thread.as_mut().ok_or(CommandError::NoThread)
    }

    /// Accepts a full id or a unique prefix of the short id shown in listings.
    pub(crate) fn resolve_comment(&self, reference: &str) -> Result<Uuid, CommandError> {
        let thread = self.thread.as_ref().ok_or(CommandError::NoThread)?;
        if let Ok(id) = Uuid::parse_str(reference) {
            return Ok(id);
        }
        let needle = reference.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Err(CommandError::InvalidArguments(
                "comment reference cannot be empty".into(),
            ));
        }
        let matches: Vec<Uuid> = thread
            .tree
            .walk()
            .into_iter()
            .map(|(_, node)| node.id())
            .filter(|id| short_id(*id).starts_with(&needle))
            .collect();
        match matches.as_slice() {
            [id] => Ok(*id),
            [] => Err(CommandError::Message(format!(
                "No comment matches `{reference}`."
            ))),
            _ => Err(CommandError::Message(format!(
                "`{reference}` matches several comments; use more characters."
            ))),
        }
    }
}
