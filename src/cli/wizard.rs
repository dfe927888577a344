//! Interactive walk through the repair-intake steps.

use std::path::Path;

use ekami_core::{IntakeField, IntakeSession, ValidationError};
use ekami_domain::{IntakeStep, ServiceLocation, Urgency};

use crate::cli::commands::repair::{photo_from_path, submit_current};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::{io, output, render};

enum StepAction {
    Continue,
    Back,
    Leave,
}

/// Drives the open session (or a fresh one) one step at a time.
pub fn run(context: &mut ShellContext) -> CommandResult {
    if !context.can_prompt() {
        return Err(CommandError::InvalidArguments(
            "the wizard needs an interactive terminal; use `repair set` and `repair next`".into(),
        ));
    }
    if context.intake.is_none() {
        context.intake = Some(IntakeSession::new(context.photo_limits()));
    }

    loop {
        let step = context.intake_mut()?.current_step();
        output::section(format!(
            "Step {} / {}: {step}",
            step.number(),
            IntakeStep::COUNT
        ));
        fill_step(context, step)?;

        match choose_action(context, step)? {
            StepAction::Continue if step.is_last() => {
                output::block(&render::render_form(context.intake_mut()?.form()));
                if !io::confirm_action(&context.theme, "Submit this repair request?", true)? {
                    continue;
                }
                return match submit_current(context) {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        // `submit_current` has already restored the session.
                        context.report_error(err);
                        Ok(())
                    }
                };
            }
            StepAction::Continue => {
                if let Err(err) = context.intake_mut()?.advance() {
                    io::print_warning(err);
                }
            }
            StepAction::Back => {
                if let Err(err) = context.intake_mut()?.retreat() {
                    io::print_warning(err);
                }
            }
            StepAction::Leave => {
                io::print_info("Progress kept. Resume with `repair wizard`.");
                return Ok(());
            }
        }
    }
}

fn choose_action(context: &ShellContext, step: IntakeStep) -> Result<StepAction, CommandError> {
    let forward = if step.is_last() { "Review and submit" } else { "Continue" };
    let items = vec![
        forward.to_string(),
        "Back".to_string(),
        "Leave wizard".to_string(),
    ];
    let choice = io::select_option(&context.theme, "Next", &items, 0)?;
    Ok(match choice {
        Some(0) => StepAction::Continue,
        Some(1) => StepAction::Back,
        _ => StepAction::Leave,
    })
}

fn fill_step(context: &mut ShellContext, step: IntakeStep) -> CommandResult {
    match step {
        IntakeStep::ServiceSelection => {
            let form = context.intake_mut()?.form().clone();
            let packages = form
                .service
                .package_ids
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            ask(context, "packages", "Service packages (comma separated)", &packages)?;
            if !context.intake_mut()?.form().service.has_packages() {
                ask(
                    context,
                    "custom-service",
                    "Describe the service you need",
                    &form.service.custom_service,
                )?;
            }
        }
        IntakeStep::VehicleInfo => {
            let vehicle = context.intake_mut()?.form().vehicle.clone();
            ask(context, "make", "Make", &vehicle.make)?;
            ask(context, "model", "Model", &vehicle.model)?;
            ask(context, "year", "Year", &display_opt(vehicle.year))?;
            ask(context, "mileage", "Mileage (km)", &display_opt(vehicle.mileage))?;
            ask(
                context,
                "plate",
                "License plate",
                vehicle.license_plate.as_deref().unwrap_or(""),
            )?;
        }
        IntakeStep::ProblemDescription => {
            let problem = context.intake_mut()?.form().problem.clone();
            ask(context, "description", "What is wrong?", &problem.description)?;
            let levels = [Urgency::Low, Urgency::Medium, Urgency::High, Urgency::Emergency];
            let labels: Vec<String> = levels.iter().map(ToString::to_string).collect();
            let current = levels
                .iter()
                .position(|level| *level == problem.urgency)
                .unwrap_or(1);
            if let Some(idx) = io::select_option(&context.theme, "Urgency", &labels, current)? {
                context
                    .intake_mut()?
                    .update(IntakeField::Urgency(levels[idx]))?;
            }
        }
        IntakeStep::PhotoUpload => loop {
            let path = io::prompt_text(&context.theme, "Photo path (blank to continue)", "")?;
            if path.trim().is_empty() {
                break;
            }
            let attached = photo_from_path(Path::new(path.trim())).and_then(|photo| {
                context.intake_mut()?.add_photo(photo)?;
                Ok(())
            });
            match attached {
                Ok(()) => io::print_success("Photo attached."),
                Err(err) => io::print_warning(err),
            }
        },
        IntakeStep::Appointment => {
            let slot = context.intake_mut()?.form().appointment.clone();
            let date = slot.date.map(|d| d.to_string()).unwrap_or_default();
            let time = slot
                .time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default();
            ask(context, "date", "Preferred date (YYYY-MM-DD)", &date)?;
            ask(context, "time", "Preferred time (HH:MM)", &time)?;
            let locations = [ServiceLocation::DropOff, ServiceLocation::Mobile];
            let labels: Vec<String> = locations.iter().map(ToString::to_string).collect();
            let current = usize::from(slot.location == ServiceLocation::Mobile);
            if let Some(idx) = io::select_option(&context.theme, "Location", &labels, current)? {
                context
                    .intake_mut()?
                    .update(IntakeField::ServiceLocation(locations[idx]))?;
            }
        }
        IntakeStep::Contact => {
            let mut contact = context.intake_mut()?.form().contact.clone();
            if let Some(identity) = context.current_identity() {
                if contact.name.trim().is_empty() {
                    contact.name = identity.display_name;
                }
                if contact.email.trim().is_empty() {
                    contact.email = identity.email;
                }
            }
            ask(context, "name", "Full name", &contact.name)?;
            ask(context, "email", "Email", &contact.email)?;
            ask(context, "phone", "Phone", &contact.phone)?;
            ask(
                context,
                "notes",
                "Notes for the workshop",
                contact.notes.as_deref().unwrap_or(""),
            )?;
        }
    }
    Ok(())
}

/// Re-asks until the answer parses and the store accepts it.
fn ask(context: &mut ShellContext, key: &str, label: &str, initial: &str) -> CommandResult {
    loop {
        let answer = io::prompt_text(&context.theme, label, initial)?;
        let applied = IntakeField::from_input(key, &answer)
            .and_then(|field| context.intake.as_mut().ok_or_else(missing_session)?.update(field));
        match applied {
            Ok(()) => return Ok(()),
            Err(err) => io::print_warning(err),
        }
    }
}

fn missing_session() -> ValidationError {
    ValidationError::new("No repair request in progress")
}

fn display_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
