use uuid::Uuid;

use ekami_domain::{IntakeForm, IntakeStep, PhotoRef};

use super::form_store::{FormStore, IntakeField};
use super::photos::PhotoLimits;
use super::steps::StepSequencer;
use crate::ValidationError;

/// Path the wizard lives at; used as the return target after signing in.
pub const REPAIR_ORIGIN_PATH: &str = "/repair";

/// One customer's pass through the repair-intake wizard.
///
/// The idempotency key is minted when the session starts and travels with
/// every submission attempt, so a retried submit never creates a second row.
#[derive(Debug, Clone)]
pub struct IntakeSession {
    store: FormStore,
    sequencer: StepSequencer,
    idempotency_key: Uuid,
    origin_path: String,
}

impl Default for IntakeSession {
    fn default() -> Self {
        Self::new(PhotoLimits::default())
    }
}

impl IntakeSession {
    pub fn new(photo_limits: PhotoLimits) -> Self {
        Self::from_form(IntakeForm::default(), photo_limits)
    }

    /// Starts a session with packages already chosen, e.g. from a package page link.
    pub fn with_packages<I, S>(package_ids: I, photo_limits: PhotoLimits) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_form(IntakeForm::with_packages(package_ids), photo_limits)
    }

    pub fn from_form(form: IntakeForm, photo_limits: PhotoLimits) -> Self {
        Self {
            store: FormStore::new(form, photo_limits),
            sequencer: StepSequencer::new(),
            idempotency_key: Uuid::new_v4(),
            origin_path: REPAIR_ORIGIN_PATH.to_string(),
        }
    }

    pub fn form(&self) -> &IntakeForm {
        self.store.form()
    }

    pub fn store_mut(&mut self) -> &mut FormStore {
        &mut self.store
    }

    pub fn sequencer(&self) -> &StepSequencer {
        &self.sequencer
    }

    pub fn current_step(&self) -> IntakeStep {
        self.sequencer.current()
    }

    pub fn idempotency_key(&self) -> Uuid {
        self.idempotency_key
    }

    pub fn origin_path(&self) -> &str {
        &self.origin_path
    }

    pub fn update(&mut self, field: IntakeField) -> Result<(), ValidationError> {
        self.store.update(field)
    }

    pub fn add_photo(&mut self, photo: PhotoRef) -> Result<(), ValidationError> {
        self.store.add_photo(photo)
    }

    pub fn advance(&mut self) -> Result<IntakeStep, ValidationError> {
        self.sequencer.advance(self.store.form())
    }

    pub fn retreat(&mut self) -> Result<IntakeStep, ValidationError> {
        self.sequencer.retreat()
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.sequencer.mark_submitted();
    }
}
