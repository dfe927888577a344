use std::fmt;

use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Select};

use crate::cli::core::CommandError;
use crate::cli::output;

pub fn print_info(message: impl fmt::Display) {
    output::info(message);
}

pub fn print_warning(message: impl fmt::Display) {
    output::warning(message);
}

pub fn print_error(message: impl fmt::Display) {
    output::error(message);
}

pub fn print_success(message: impl fmt::Display) {
    output::success(message);
}

pub fn print_hint(message: impl fmt::Display) {
    output::hint(message);
}

pub fn confirm_action(
    theme: &ColorfulTheme,
    prompt: &str,
    default: bool,
) -> Result<bool, CommandError> {
    Confirm::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(CommandError::from)
}

/// Free-form text; an empty answer keeps `initial`.
pub fn prompt_text(
    theme: &ColorfulTheme,
    prompt: &str,
    initial: &str,
) -> Result<String, CommandError> {
    Input::<String>::with_theme(theme)
        .with_prompt(prompt)
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()
        .map_err(CommandError::from)
}

/// Returns `None` when the user dismisses the list with Esc.
pub fn select_option(
    theme: &ColorfulTheme,
    prompt: &str,
    items: &[String],
    default: usize,
) -> Result<Option<usize>, CommandError> {
    Select::with_theme(theme)
        .with_prompt(prompt)
        .items(items)
        .default(default.min(items.len().saturating_sub(1)))
        .interact_opt()
        .map_err(CommandError::from)
}

pub fn select_many(
    theme: &ColorfulTheme,
    prompt: &str,
    items: &[String],
    checked: &[bool],
) -> Result<Vec<usize>, CommandError> {
    MultiSelect::with_theme(theme)
        .with_prompt(prompt)
        .items(items)
        .defaults(checked)
        .interact()
        .map_err(CommandError::from)
}
