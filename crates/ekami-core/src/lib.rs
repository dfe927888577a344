//! ekami-core
//!
//! Business logic for Ekami Auto: the repair-intake wizard, comment threads,
//! loyalty and trade-in valuation. Depends on ekami-domain. No CLI, no terminal
//! I/O; persistence goes through the [`RecordStore`] boundary.

pub mod comments;
pub mod error;
pub mod format;
pub mod identity;
pub mod intake;
pub mod loyalty_service;
pub mod notify;
pub mod store;
pub mod time;
pub mod valuation_service;

pub use comments::{build_comment_tree, CommentService, CommentTree};
pub use error::{CoreError, ValidationError};
pub use format::{CurrencyFormatter, GroupedCurrencyFormatter};
pub use identity::{IdentityProvider, SessionIdentity, StaticIdentity};
pub use intake::{
    FormStore, IntakeField, IntakeSession, PhotoLimits, RejectedSubmission, StepSequencer,
    SubmissionCoordinator, SubmissionFailure, SubmissionReceipt, SubmissionSettings,
};
pub use loyalty_service::{EarnOutcome, LoyaltyCalculator, LoyaltyService, TierProgress};
pub use notify::{
    DisabledNotifier, EmailMessage, NotificationOutcome, Notifier, NotifyError, OutboxNotifier,
};
pub use store::{InsertOutcome, MemoryStore, Query, Record, RecordStore, SortOrder};
pub use time::{Clock, FixedClock, SystemClock};
pub use valuation_service::ValuationService;
