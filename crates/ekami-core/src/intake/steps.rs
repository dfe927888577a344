use ekami_domain::{IntakeForm, IntakeStep};

use super::validation::validate_step;
use crate::ValidationError;

/// Tracks which wizard page is active.
///
/// Forward moves are gated on the active page's validator; backward moves are
/// free while a previous page exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSequencer {
    current: IntakeStep,
    submitted: bool,
}

impl Default for StepSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl StepSequencer {
    pub fn new() -> Self {
        Self {
            current: IntakeStep::ServiceSelection,
            submitted: false,
        }
    }

    pub fn current(&self) -> IntakeStep {
        self.current
    }

    /// One-based index of the active step.
    pub fn position(&self) -> usize {
        self.current.number()
    }

    pub fn total(&self) -> usize {
        IntakeStep::COUNT
    }

    pub fn is_last_step(&self) -> bool {
        self.current.is_last()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Validates the active step and moves forward when it passes.
    ///
    /// On the last step a passing form stays put: submission is the only way on.
    pub fn advance(&mut self, form: &IntakeForm) -> Result<IntakeStep, ValidationError> {
        if self.submitted {
            return Err(ValidationError::new("This request has already been submitted"));
        }
        validate_step(self.current, form)?;
        if let Some(next) = self.current.next() {
            tracing::debug!(from = %self.current, to = %next, "intake step advanced");
            self.current = next;
        }
        Ok(self.current)
    }

    pub fn retreat(&mut self) -> Result<IntakeStep, ValidationError> {
        if self.submitted {
            return Err(ValidationError::new("This request has already been submitted"));
        }
        match self.current.previous() {
            Some(previous) => {
                tracing::debug!(from = %self.current, to = %previous, "intake step retreated");
                self.current = previous;
                Ok(previous)
            }
            None => Err(ValidationError::new("Already at the first step")),
        }
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.submitted = true;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    fn complete_form() -> IntakeForm {
        let mut form = IntakeForm::with_packages(["pkg-oil"]);
        form.vehicle.make = "Toyota".into();
        form.vehicle.model = "Yaris".into();
        form.appointment.date = NaiveDate::from_ymd_opt(2025, 6, 2);
        form.appointment.time = NaiveTime::from_hms_opt(9, 0, 0);
        form.contact.name = "Ada".into();
        form.contact.email = "ada@example.com".into();
        form.contact.phone = "+237 600 000 000".into();
        form
    }

    #[test]
    fn advance_stays_put_when_validation_fails() {
        let mut sequencer = StepSequencer::new();
        let err = sequencer.advance(&IntakeForm::default()).unwrap_err();

        assert_eq!(sequencer.current(), IntakeStep::ServiceSelection);
        assert_eq!(
            err.message,
            "Select at least one service package or describe the service you need"
        );
    }

    #[test]
    fn advance_walks_every_step_in_order() {
        let form = complete_form();
        let mut sequencer = StepSequencer::new();
        let mut visited = vec![sequencer.current()];
        while !sequencer.is_last_step() {
            visited.push(sequencer.advance(&form).unwrap());
        }
        assert_eq!(visited, IntakeStep::ALL.to_vec());
        assert_eq!(sequencer.position(), sequencer.total());
    }

    #[test]
    fn advance_on_last_step_does_not_move() {
        let form = complete_form();
        let mut sequencer = StepSequencer::new();
        while !sequencer.is_last_step() {
            sequencer.advance(&form).unwrap();
        }
        assert_eq!(sequencer.advance(&form).unwrap(), IntakeStep::Contact);
    }

    #[test]
    fn retreat_is_refused_on_first_step() {
        let mut sequencer = StepSequencer::new();
        let err = sequencer.retreat().unwrap_err();
        assert_eq!(err.message, "Already at the first step");
        assert_eq!(sequencer.position(), 1);
    }

    #[test]
    fn retreat_needs_no_validation() {
        let form = complete_form();
        let mut sequencer = StepSequencer::new();
        sequencer.advance(&form).unwrap();
        sequencer.advance(&form).unwrap();
        assert_eq!(sequencer.retreat().unwrap(), IntakeStep::VehicleInfo);
    }
}
