use std::{fs, path::Path};

use ekami_core::intake::mime_from_file_name;
use ekami_core::{IntakeField, IntakeSession, NotificationOutcome, SubmissionFailure};
use ekami_domain::{Displayable, PhotoRef};

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::registry::CommandEntry;
use crate::cli::{io, output, render, wizard};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "repair",
        "Fill in and submit a repair request",
        "repair [start [package ...]|set <field> <value>|photo add <path>|photo remove <name>|next|back|status|submit|cancel|wizard]",
        cmd_repair,
    )]
}

fn cmd_repair(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(action) = args.first() else {
        return show_status(context);
    };
    let rest = &args[1..];
    match action.to_lowercase().as_str() {
        "start" => start(context, rest),
        "set" => set_field(context, rest),
        "photo" => photo(context, rest),
        "next" => next(context),
        "back" => back(context),
        "status" => show_status(context),
        "submit" => submit_current(context),
        "cancel" => cancel(context),
        "wizard" => wizard::run(context),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown repair action `{other}`"
        ))),
    }
}

fn start(context: &mut ShellContext, packages: &[&str]) -> CommandResult {
    if context.intake.is_some() {
        io::print_warning("Discarding the repair request that was in progress.");
    }
    let session = IntakeSession::with_packages(packages.iter().copied(), context.photo_limits());
    tracing::info!(
        key = %session.idempotency_key(),
        packages = packages.len(),
        "repair intake started"
    );
    context.intake = Some(session);
    io::print_success("Repair request started.");
    show_status(context)
}

fn set_field(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((key, value)) = args.split_first() else {
        return Err(CommandError::InvalidArguments(format!(
            "usage: repair set <field> <value>; fields: {}",
            IntakeField::KEYS.join(", ")
        )));
    };
    let field = IntakeField::from_input(key, &value.join(" "))?;
    context.intake_mut()?.update(field)?;
    io::print_success(format!("Updated {key}."));
    Ok(())
}

fn photo(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        ["add", path] => {
            let photo = photo_from_path(Path::new(path))?;
            let name = photo.file_name.clone();
            let limit = context.config.intake.max_photos;
            let session = context.intake_mut()?;
            session.add_photo(photo)?;
            let count = session.form().photos.len();
            io::print_success(format!("Attached {name} ({count}/{limit})."));
            Ok(())
        }
        ["remove", name] => {
            let session = context.intake_mut()?;
            match session.store_mut().remove_photo(name) {
                Some(_) => io::print_success(format!("Removed {name}.")),
                None => io::print_warning(format!("No attached photo named {name}.")),
            }
            Ok(())
        }
        _ => Err(CommandError::InvalidArguments(
            "usage: repair photo add <path> | repair photo remove <name>".into(),
        )),
    }
}

/// Reads only metadata; photo bytes stay on disk.
pub(crate) fn photo_from_path(path: &Path) -> Result<PhotoRef, CommandError> {
    let metadata = fs::metadata(path).map_err(|err| {
        CommandError::Message(format!("Cannot read {}: {err}", path.display()))
    })?;
    if !metadata.is_file() {
        return Err(CommandError::Message(format!(
            "{} is not a file",
            path.display()
        )));
    }
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CommandError::Message(format!("{} has no file name", path.display())))?
        .to_string();
    let mime = mime_from_file_name(&file_name).unwrap_or("application/octet-stream");
    Ok(PhotoRef::new(file_name, mime, metadata.len()))
}

fn next(context: &mut ShellContext) -> CommandResult {
    let session = context.intake_mut()?;
    let before = session.current_step();
    let step = session.advance()?;
    if step == before {
        io::print_info("This is the last step. Use `repair submit` to send the request.");
    } else {
        io::print_success(format!(
            "Step {} / {}: {step}",
            session.sequencer().position(),
            session.sequencer().total()
        ));
    }
    Ok(())
}

fn back(context: &mut ShellContext) -> CommandResult {
    let session = context.intake_mut()?;
    let step = session.retreat()?;
    io::print_info(format!(
        "Step {} / {}: {step}",
        session.sequencer().position(),
        session.sequencer().total()
    ));
    Ok(())
}

fn show_status(context: &mut ShellContext) -> CommandResult {
    let session = context.intake.as_ref().ok_or(CommandError::NoIntake)?;
    output::section("Repair request");
    output::block(&render::render_intake(session));
    Ok(())
}

fn cancel(context: &mut ShellContext) -> CommandResult {
    match context.intake.take() {
        Some(_) => io::print_info("Repair request discarded."),
        None => io::print_info("No repair request in progress."),
    }
    Ok(())
}

/// Submits the open session; on rejection the session is put back untouched.
pub(crate) fn submit_current(context: &mut ShellContext) -> CommandResult {
    let session = context.intake.take().ok_or(CommandError::NoIntake)?;
    match context.services.submissions.submit(session) {
        Ok(receipt) => {
            if receipt.created {
                io::print_success(format!(
                    "Repair request {} received: {}",
                    receipt.request.id,
                    receipt.request.display_label()
                ));
            } else {
                io::print_info(format!(
                    "Repair request {} was already received.",
                    receipt.request.id
                ));
            }
            if let NotificationOutcome::Failed(reason) = &receipt.notification {
                io::print_warning(format!(
                    "The workshop could not be notified ({reason}); your request is saved."
                ));
            }
            io::print_info(format!("Next: {}", receipt.redirect_to));
            Ok(())
        }
        Err(rejected) => {
            let reason = rejected.reason.clone();
            context.intake = Some(rejected.into_session());
            match reason {
                SubmissionFailure::SignInRequired { redirect_to } => {
                    io::print_warning(format!(
                        "Sign in to submit your repair request ({redirect_to})."
                    ));
                    Err(CommandError::SignInRequired)
                }
                other => Err(CommandError::Message(other.to_string())),
            }
        }
    }
}
