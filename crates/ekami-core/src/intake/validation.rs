//! Per-step validation rules.
//!
//! Every rule is a pure function over the sub-struct(s) its step gathers and
//! returns at most one user-facing message.

use once_cell::sync::Lazy;
use regex::Regex;

use ekami_domain::{
    AppointmentSlot, ContactDetails, IntakeForm, IntakeStep, ProblemDetails, ServiceSelection,
    VehicleInfo,
};

use crate::ValidationError;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Runs the rule belonging to `step` against the fields that step gathers.
pub fn validate_step(step: IntakeStep, form: &IntakeForm) -> Result<(), ValidationError> {
    match step {
        IntakeStep::ServiceSelection => validate_service_selection(&form.service),
        IntakeStep::VehicleInfo => validate_vehicle(&form.vehicle),
        IntakeStep::ProblemDescription => validate_problem(&form.problem, &form.service),
        IntakeStep::PhotoUpload => Ok(()),
        IntakeStep::Appointment => validate_appointment(&form.appointment),
        IntakeStep::Contact => validate_contact(&form.contact),
    }
}

pub fn validate_service_selection(service: &ServiceSelection) -> Result<(), ValidationError> {
    if service.has_packages() || service.has_custom_service() {
        Ok(())
    } else {
        Err(ValidationError::new(
            "Select at least one service package or describe the service you need",
        ))
    }
}

pub fn validate_vehicle(vehicle: &VehicleInfo) -> Result<(), ValidationError> {
    if vehicle.make.trim().is_empty() {
        return Err(ValidationError::new("Vehicle make is required"));
    }
    if vehicle.model.trim().is_empty() {
        return Err(ValidationError::new("Vehicle model is required"));
    }
    Ok(())
}

/// A selected package already describes the scope of work, so the text becomes optional.
pub fn validate_problem(
    problem: &ProblemDetails,
    service: &ServiceSelection,
) -> Result<(), ValidationError> {
    if service.has_packages() || !problem.description.trim().is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(
            "Describe the problem so our technicians can prepare",
        ))
    }
}

/// Past dates and times are not rejected here; only presence is checked.
pub fn validate_appointment(slot: &AppointmentSlot) -> Result<(), ValidationError> {
    if slot.date.is_none() {
        return Err(ValidationError::new("Choose an appointment date"));
    }
    if slot.time.is_none() {
        return Err(ValidationError::new("Choose an appointment time"));
    }
    Ok(())
}

pub fn validate_contact(contact: &ContactDetails) -> Result<(), ValidationError> {
    if contact.name.trim().is_empty() {
        return Err(ValidationError::new("Your name is required"));
    }
    if !is_valid_email(&contact.email) {
        return Err(ValidationError::new("Enter a valid email address"));
    }
    if contact.phone.trim().is_empty() {
        return Err(ValidationError::new("A phone number is required"));
    }
    Ok(())
}

/// Permissive `local@domain.tld` check.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value.trim())
}
