//! Single mutable record accumulating every wizard field.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};

use ekami_domain::{IntakeForm, PhotoRef, ServiceLocation, Urgency};

use super::photos::{check_photo, PhotoLimits};
use crate::ValidationError;

/// One variant per addressable field; [`FormStore::update`] replaces exactly that field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeField {
    PackageIds(BTreeSet<String>),
    CustomService(String),
    VehicleMake(String),
    VehicleModel(String),
    VehicleYear(Option<u16>),
    VehicleMileage(Option<u32>),
    LicensePlate(Option<String>),
    ProblemDescription(String),
    Urgency(Urgency),
    AppointmentDate(Option<NaiveDate>),
    AppointmentTime(Option<NaiveTime>),
    ServiceLocation(ServiceLocation),
    CustomerName(String),
    CustomerEmail(String),
    CustomerPhone(String),
    Notes(Option<String>),
}

impl IntakeField {
    /// Field keys accepted by [`IntakeField::from_input`].
    pub const KEYS: [&'static str; 16] = [
        "packages",
        "custom-service",
        "make",
        "model",
        "year",
        "mileage",
        "plate",
        "description",
        "urgency",
        "date",
        "time",
        "location",
        "name",
        "email",
        "phone",
        "notes",
    ];

    /// Parses raw text typed by the user for the field named `key`.
    ///
    /// Blank input clears optional fields. Malformed numbers, dates and times
    /// come back as a validation message instead of a field.
    pub fn from_input(key: &str, raw: &str) -> Result<Self, ValidationError> {
        let value = raw.trim();
        let field = match key.trim().to_ascii_lowercase().as_str() {
            "packages" | "package" => IntakeField::PackageIds(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            "custom-service" | "custom" => IntakeField::CustomService(value.to_string()),
            "make" => IntakeField::VehicleMake(value.to_string()),
            "model" => IntakeField::VehicleModel(value.to_string()),
            "year" => IntakeField::VehicleYear(parse_optional(value, "Enter the year as a number (e.g., 2018)")?),
            "mileage" => IntakeField::VehicleMileage(parse_optional(
                value,
                "Enter the mileage as a whole number",
            )?),
            "plate" => IntakeField::LicensePlate(optional_text(value)),
            "description" | "problem" => IntakeField::ProblemDescription(value.to_string()),
            "urgency" => IntakeField::Urgency(Urgency::parse(value).ok_or_else(|| {
                ValidationError::new("Urgency must be one of: low, medium, high, emergency")
            })?),
            "date" => IntakeField::AppointmentDate(parse_date(value)?),
            "time" => IntakeField::AppointmentTime(parse_time(value)?),
            "location" => IntakeField::ServiceLocation(ServiceLocation::parse(value).ok_or_else(
                || ValidationError::new("Location must be drop-off or mobile"),
            )?),
            "name" => IntakeField::CustomerName(value.to_string()),
            "email" => IntakeField::CustomerEmail(value.to_string()),
            "phone" => IntakeField::CustomerPhone(value.to_string()),
            "notes" => IntakeField::Notes(optional_text(value)),
            other => {
                return Err(ValidationError::new(format!(
                    "Unknown field `{}`. Expected one of: {}",
                    other,
                    Self::KEYS.join(", ")
                )))
            }
        };
        Ok(field)
    }
}

/// Holds the in-progress [`IntakeForm`].
///
/// Package selection and custom service text are mutually exclusive and the
/// package selection wins: choosing packages clears the custom text, and custom
/// text is refused while packages are selected.
#[derive(Debug, Clone, Default)]
pub struct FormStore {
    form: IntakeForm,
    photo_limits: PhotoLimits,
}

impl FormStore {
    pub fn new(form: IntakeForm, photo_limits: PhotoLimits) -> Self {
        let mut store = Self { form, photo_limits };
        if store.form.service.has_packages() {
            store.form.service.custom_service.clear();
        }
        store
    }

    pub fn form(&self) -> &IntakeForm {
        &self.form
    }

    pub fn photo_limits(&self) -> PhotoLimits {
        self.photo_limits
    }

    pub fn update(&mut self, field: IntakeField) -> Result<(), ValidationError> {
        let form = &mut self.form;
        match field {
            IntakeField::PackageIds(ids) => {
                if !ids.is_empty() {
                    form.service.custom_service.clear();
                }
                form.service.package_ids = ids;
            }
            IntakeField::CustomService(text) => {
                if form.service.has_packages() && !text.trim().is_empty() {
                    return Err(ValidationError::new(
                        "Clear the selected service packages before describing a custom service",
                    ));
                }
                form.service.custom_service = text;
            }
            IntakeField::VehicleMake(make) => form.vehicle.make = make,
            IntakeField::VehicleModel(model) => form.vehicle.model = model,
            IntakeField::VehicleYear(year) => form.vehicle.year = year,
            IntakeField::VehicleMileage(mileage) => form.vehicle.mileage = mileage,
            IntakeField::LicensePlate(plate) => form.vehicle.license_plate = plate,
            IntakeField::ProblemDescription(text) => form.problem.description = text,
            IntakeField::Urgency(urgency) => form.problem.urgency = urgency,
            IntakeField::AppointmentDate(date) => form.appointment.date = date,
            IntakeField::AppointmentTime(time) => form.appointment.time = time,
            IntakeField::ServiceLocation(location) => form.appointment.location = location,
            IntakeField::CustomerName(name) => form.contact.name = name,
            IntakeField::CustomerEmail(email) => form.contact.email = email,
            IntakeField::CustomerPhone(phone) => form.contact.phone = phone,
            IntakeField::Notes(notes) => form.contact.notes = notes,
        }
        Ok(())
    }

    /// Adds one package to the current selection.
    pub fn select_package(&mut self, package_id: &str) -> Result<(), ValidationError> {
        let mut ids = self.form.service.package_ids.clone();
        ids.insert(package_id.trim().to_string());
        self.update(IntakeField::PackageIds(ids))
    }

    /// Removes one package from the current selection.
    pub fn deselect_package(&mut self, package_id: &str) -> Result<(), ValidationError> {
        let mut ids = self.form.service.package_ids.clone();
        ids.remove(package_id.trim());
        self.update(IntakeField::PackageIds(ids))
    }

    pub fn add_photo(&mut self, photo: PhotoRef) -> Result<(), ValidationError> {
        check_photo(&self.form.photos, &photo, &self.photo_limits)?;
        self.form.photos.photos.push(photo);
        Ok(())
    }

    pub fn remove_photo(&mut self, file_name: &str) -> Option<PhotoRef> {
        let index = self
            .form
            .photos
            .photos
            .iter()
            .position(|photo| photo.file_name == file_name)?;
        Some(self.form.photos.photos.remove(index))
    }
}

fn optional_text(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_optional<T: std::str::FromStr>(
    value: &str,
    message: &str,
) -> Result<Option<T>, ValidationError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<T>()
        .map(Some)
        .map_err(|_| ValidationError::new(message))
}

/// Parses `YYYY-MM-DD`; blank input clears the date.
pub fn parse_date(value: &str) -> Result<Option<NaiveDate>, ValidationError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::new("Use YYYY-MM-DD format"))
}

/// Parses 24-hour `HH:MM`; blank input clears the time.
pub fn parse_time(value: &str) -> Result<Option<NaiveTime>, ValidationError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map(Some)
        .map_err(|_| ValidationError::new("Use 24-hour HH:MM format"))
}
