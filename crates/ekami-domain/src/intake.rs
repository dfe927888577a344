//! Domain types gathered by the repair-intake wizard.
//!
//! Each wizard step owns its own sub-struct so validation only ever looks at
//! the fields relevant to that step. The sub-structs are joined into a
//! [`IntakeForm`] and only flattened into a persisted request at submission.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Ordered pages of the repair-intake wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntakeStep {
    ServiceSelection,
    VehicleInfo,
    ProblemDescription,
    PhotoUpload,
    Appointment,
    Contact,
}

impl IntakeStep {
    pub const ALL: [IntakeStep; 6] = [
        IntakeStep::ServiceSelection,
        IntakeStep::VehicleInfo,
        IntakeStep::ProblemDescription,
        IntakeStep::PhotoUpload,
        IntakeStep::Appointment,
        IntakeStep::Contact,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// One-based position of the step inside the wizard.
    pub fn number(self) -> usize {
        Self::ALL
            .iter()
            .position(|step| *step == self)
            .map(|idx| idx + 1)
            .unwrap_or(1)
    }

    /// Resolves a one-based position back into a step.
    pub fn from_number(number: usize) -> Option<Self> {
        number
            .checked_sub(1)
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        Self::from_number(self.number().saturating_sub(1))
    }

    pub fn is_first(self) -> bool {
        self == IntakeStep::ServiceSelection
    }

    pub fn is_last(self) -> bool {
        self == IntakeStep::Contact
    }

    pub fn title(self) -> &'static str {
        match self {
            IntakeStep::ServiceSelection => "Service Selection",
            IntakeStep::VehicleInfo => "Vehicle Info",
            IntakeStep::ProblemDescription => "Problem Description",
            IntakeStep::PhotoUpload => "Photo Upload",
            IntakeStep::Appointment => "Appointment",
            IntakeStep::Contact => "Contact",
        }
    }
}

impl fmt::Display for IntakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// How quickly the customer needs the vehicle looked at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

impl Urgency {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Urgency::Low),
            "medium" | "normal" => Some(Urgency::Medium),
            "high" => Some(Urgency::High),
            "emergency" => Some(Urgency::Emergency),
            _ => None,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Emergency => "emergency",
        };
        f.write_str(label)
    }
}

/// Where the repair work takes place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceLocation {
    #[default]
    DropOff,
    Mobile,
}

impl ServiceLocation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "drop-off" | "dropoff" | "drop_off" => Some(ServiceLocation::DropOff),
            "mobile" => Some(ServiceLocation::Mobile),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceLocation::DropOff => "drop-off",
            ServiceLocation::Mobile => "mobile",
        };
        f.write_str(label)
    }
}

/// Step 1: which service packages (or custom work) the customer wants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSelection {
    pub package_ids: BTreeSet<String>,
    pub custom_service: String,
}

impl ServiceSelection {
    pub fn with_packages<I, S>(package_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            package_ids: package_ids
                .into_iter()
                .map(Into::<String>::into)
                .filter(|id| !id.trim().is_empty())
                .collect(),
            custom_service: String::new(),
        }
    }

    pub fn has_packages(&self) -> bool {
        !self.package_ids.is_empty()
    }

    pub fn has_custom_service(&self) -> bool {
        !self.custom_service.trim().is_empty()
    }
}

/// Step 2: the vehicle being repaired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub make: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
}

impl VehicleInfo {
    pub fn label(&self) -> String {
        match self.year {
            Some(year) => format!("{} {} {}", year, self.make.trim(), self.model.trim()),
            None => format!("{} {}", self.make.trim(), self.model.trim()),
        }
    }
}

/// Step 3: what is wrong with the vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub description: String,
    #[serde(default)]
    pub urgency: Urgency,
}

/// Reference to a picked image held in memory; never uploaded by the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl PhotoRef {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }
}

/// Step 4: optional photos of the damage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSet {
    pub photos: Vec<PhotoRef>,
}

impl PhotoSet {
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

/// Step 5: when and where the work happens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub location: ServiceLocation,
}

/// Step 6: how to reach the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Every sub-struct the wizard accumulates, joined only at submission time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeForm {
    pub service: ServiceSelection,
    pub vehicle: VehicleInfo,
    pub problem: ProblemDetails,
    pub photos: PhotoSet,
    pub appointment: AppointmentSlot,
    pub contact: ContactDetails,
}

impl IntakeForm {
    /// Starts a form pre-seeded with a caller-supplied package selection.
    pub fn with_packages<I, S>(package_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            service: ServiceSelection::with_packages(package_ids),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_numbered_in_wizard_order() {
        assert_eq!(IntakeStep::ServiceSelection.number(), 1);
        assert_eq!(IntakeStep::Contact.number(), IntakeStep::COUNT);
        assert_eq!(IntakeStep::from_number(4), Some(IntakeStep::PhotoUpload));
        assert_eq!(IntakeStep::from_number(0), None);
        assert_eq!(IntakeStep::from_number(7), None);
    }

    #[test]
    fn step_neighbours_stop_at_the_edges() {
        assert_eq!(IntakeStep::ServiceSelection.previous(), None);
        assert_eq!(IntakeStep::Contact.next(), None);
        assert_eq!(
            IntakeStep::VehicleInfo.next(),
            Some(IntakeStep::ProblemDescription)
        );
    }

    #[test]
    fn preseeded_form_ignores_blank_package_ids() {
        let form = IntakeForm::with_packages(["pkg-oil", " ", "pkg-brakes"]);
        assert_eq!(form.service.package_ids.len(), 2);
        assert!(form.service.custom_service.is_empty());
    }

    #[test]
    fn urgency_and_location_parse_user_input() {
        assert_eq!(Urgency::parse("Emergency"), Some(Urgency::Emergency));
        assert_eq!(Urgency::parse("soon"), None);
        assert_eq!(
            ServiceLocation::parse("drop-off"),
            Some(ServiceLocation::DropOff)
        );
        assert_eq!(ServiceLocation::parse("MOBILE"), Some(ServiceLocation::Mobile));
    }

    #[test]
    fn urgency_serializes_lowercase() {
        let json = serde_json::to_string(&Urgency::High).unwrap();
        assert_eq!(json, "\"high\"");
        let location = serde_json::to_string(&ServiceLocation::DropOff).unwrap();
        assert_eq!(location, "\"drop-off\"");
    }
}
