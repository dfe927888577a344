//! Repair-intake wizard: field store, step sequencer, validators and submission.

pub mod form_store;
pub mod photos;
pub mod session;
pub mod steps;
pub mod submission;
pub mod validation;

pub use form_store::{parse_date, parse_time, FormStore, IntakeField};
pub use photos::{check_photo, mime_from_file_name, PhotoLimits, DEFAULT_MAX_PHOTOS, DEFAULT_MAX_PHOTO_BYTES};
pub use session::{IntakeSession, REPAIR_ORIGIN_PATH};
pub use steps::StepSequencer;
pub use submission::{
    build_repair_request, RejectedSubmission, SubmissionCoordinator, SubmissionFailure,
    SubmissionReceipt, SubmissionSettings, SubmissionState,
};
pub use validation::{is_valid_email, validate_step};
