//! Final-step submission: validate, authenticate, persist once, notify once.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use uuid::Uuid;

use ekami_domain::{common::non_blank, Identity, IntakeForm, RepairRequest, RepairStatus};

use super::session::IntakeSession;
use super::validation::validate_step;
use crate::identity::IdentityProvider;
use crate::notify::{repair_received_email, send_best_effort, NotificationOutcome, Notifier};
use crate::store::{collections, from_record, to_record, RecordStore};
use crate::time::Clock;
use crate::ValidationError;

pub const DEFAULT_SIGN_IN_PATH: &str = "/auth/sign-in";
pub const DEFAULT_SUCCESS_PATH: &str = "/dashboard/repairs";
const IDEMPOTENCY_FIELD: &str = "idempotency_key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionSettings {
    pub notify_from: String,
    pub notify_to: String,
    pub sign_in_path: String,
    pub success_path: String,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            notify_from: "Ekami Auto <noreply@ekamiauto.com>".into(),
            notify_to: "workshop@ekamiauto.com".into(),
            sign_in_path: DEFAULT_SIGN_IN_PATH.into(),
            success_path: DEFAULT_SUCCESS_PATH.into(),
        }
    }
}

/// Where the coordinator currently is in a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Submitting,
    Persisted,
    NotifyAttempted,
    Done,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Validating => "validating",
            SubmissionState::Submitting => "submitting",
            SubmissionState::Persisted => "persisted",
            SubmissionState::NotifyAttempted => "notify-attempted",
            SubmissionState::Done => "done",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionFailure {
    #[error("{0}")]
    Invalid(ValidationError),
    #[error("Sign in to submit your repair request")]
    SignInRequired { redirect_to: String },
    #[error("Could not save your repair request: {0}")]
    PersistFailed(String),
    #[error("A submission is already in progress")]
    InFlight,
}

/// A refused submission hands the session back untouched.
#[derive(Debug)]
pub struct RejectedSubmission {
    pub session: Box<IntakeSession>,
    pub reason: SubmissionFailure,
}

impl RejectedSubmission {
    fn new(session: IntakeSession, reason: SubmissionFailure) -> Self {
        Self {
            session: Box::new(session),
            reason,
        }
    }

    pub fn into_session(self) -> IntakeSession {
        *self.session
    }
}

impl fmt::Display for RejectedSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.reason.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub request: RepairRequest,
    /// False when an earlier attempt with the same key had already persisted the row.
    pub created: bool,
    pub notification: NotificationOutcome,
    pub redirect_to: String,
}

pub struct SubmissionCoordinator {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: SubmissionSettings,
    in_flight: AtomicBool,
    state: Mutex<SubmissionState>,
}

/// Releases the single-flight flag however the attempt ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SubmissionCoordinator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: SubmissionSettings,
    ) -> Self {
        Self {
            store,
            identity,
            notifier,
            clock,
            settings,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    pub fn settings(&self) -> &SubmissionSettings {
        &self.settings
    }

    pub fn state(&self) -> SubmissionState {
        self.state
            .lock()
            .map(|guard| *guard)
            .unwrap_or(SubmissionState::Idle)
    }

    fn transition(&self, next: SubmissionState) {
        if let Ok(mut guard) = self.state.lock() {
            let previous = *guard;
            tracing::debug!(from = %previous, to = %next, "submission state changed");
            *guard = next;
        }
    }

    fn reject(&self, session: IntakeSession, reason: SubmissionFailure) -> RejectedSubmission {
        self.transition(SubmissionState::Idle);
        RejectedSubmission::new(session, reason)
    }

    /// Submits a session sitting on the final step.
    ///
    /// Success consumes the session. Every failure returns it unchanged so the
    /// caller can fix the problem and try again with the same idempotency key.
    pub fn submit(
        &self,
        mut session: IntakeSession,
    ) -> Result<SubmissionReceipt, RejectedSubmission> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RejectedSubmission::new(session, SubmissionFailure::InFlight));
        }
        let _guard = FlightGuard(&self.in_flight);

        self.transition(SubmissionState::Validating);
        if !session.sequencer().is_last_step() {
            let reason = SubmissionFailure::Invalid(ValidationError::new(
                "Complete every step before submitting",
            ));
            return Err(self.reject(session, reason));
        }
        if let Err(err) = validate_step(session.current_step(), session.form()) {
            return Err(self.reject(session, SubmissionFailure::Invalid(err)));
        }

        let Some(identity) = self.identity.current_identity() else {
            let redirect_to = format!(
                "{}?redirect={}",
                self.settings.sign_in_path,
                session.origin_path()
            );
            tracing::info!(redirect = %redirect_to, "repair submission requires sign-in");
            return Err(self.reject(session, SubmissionFailure::SignInRequired { redirect_to }));
        };

        self.transition(SubmissionState::Submitting);
        let request = build_repair_request(
            session.form(),
            &identity,
            session.idempotency_key(),
            self.clock.as_ref(),
        );
        let (request, created) = match self.persist(&request) {
            Ok(persisted) => persisted,
            Err(message) => {
                tracing::warn!(error = %message, "repair request was not saved");
                return Err(self.reject(session, SubmissionFailure::PersistFailed(message)));
            }
        };
        self.transition(SubmissionState::Persisted);
        if created {
            tracing::info!(request_id = %request.id, user_id = %request.user_id, "repair request saved");
        } else {
            tracing::info!(request_id = %request.id, "repair request already saved; reusing it");
        }

        let email = repair_received_email(
            &request,
            &self.settings.notify_from,
            &self.settings.notify_to,
        );
        let notification = send_best_effort(self.notifier.as_ref(), &email);
        self.transition(SubmissionState::NotifyAttempted);

        session.mark_submitted();
        drop(session);
        self.transition(SubmissionState::Done);

        Ok(SubmissionReceipt {
            request,
            created,
            notification,
            redirect_to: self.settings.success_path.clone(),
        })
    }

    fn persist(&self, request: &RepairRequest) -> Result<(RepairRequest, bool), String> {
        let record = to_record(request).map_err(|err| err.to_string())?;
        let outcome = self
            .store
            .insert_once(
                collections::REPAIR_REQUESTS,
                IDEMPOTENCY_FIELD,
                &request.idempotency_key.to_string(),
                record,
            )
            .map_err(|err| err.to_string())?;
        let created = outcome.was_created();
        let stored: RepairRequest =
            from_record(outcome.into_record()).map_err(|err| err.to_string())?;
        Ok((stored, created))
    }
}

/// Flattens the per-step sub-structs into the persisted row.
pub fn build_repair_request(
    form: &IntakeForm,
    identity: &Identity,
    idempotency_key: Uuid,
    clock: &dyn Clock,
) -> RepairRequest {
    let now = clock.now();
    let service_package_ids: Vec<String> = form.service.package_ids.iter().cloned().collect();
    let custom_service = if service_package_ids.is_empty() {
        non_blank(&form.service.custom_service)
    } else {
        None
    };
    RepairRequest {
        id: Uuid::new_v4(),
        idempotency_key,
        user_id: identity.user_id.clone(),
        customer_name: form.contact.name.trim().to_string(),
        customer_email: form.contact.email.trim().to_string(),
        customer_phone: form.contact.phone.trim().to_string(),
        service_package_ids,
        custom_service,
        vehicle: form.vehicle.clone(),
        problem_description: form.problem.description.trim().to_string(),
        urgency: form.problem.urgency,
        appointment_date: form.appointment.date,
        appointment_time: form.appointment.time,
        service_location: form.appointment.location,
        photo_count: form.photos.len(),
        notes: form.contact.notes.as_deref().and_then(non_blank),
        status: RepairStatus::Received,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::thread;

    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

    use super::*;
    use crate::identity::StaticIdentity;
    use crate::intake::IntakeField;
    use crate::notify::{DisabledNotifier, EmailMessage, NotifyError};
    use crate::store::{MemoryStore, Query, Record};
    use crate::time::FixedClock;
    use crate::CoreError;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<EmailMessage>>,
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct FailingStore {
        inserts: AtomicUsize,
    }

    impl RecordStore for FailingStore {
        fn select(&self, _: &str, _: &Query) -> Result<Vec<Record>, CoreError> {
            Ok(Vec::new())
        }

        fn insert(&self, _: &str, _: Record) -> Result<Record, CoreError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::Storage("connection reset".into()))
        }

        fn update(&self, collection: &str, id: &str, _: Record) -> Result<Record, CoreError> {
            Err(CoreError::not_found(collection, id))
        }

        fn delete(&self, _: &str, _: &str) -> Result<bool, CoreError> {
            Ok(false)
        }
    }

    /// Blocks inside `insert` until the test releases it.
    struct GatedStore {
        inner: MemoryStore,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl RecordStore for GatedStore {
        fn select(&self, collection: &str, query: &Query) -> Result<Vec<Record>, CoreError> {
            self.inner.select(collection, query)
        }

        fn insert(&self, collection: &str, record: Record) -> Result<Record, CoreError> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            self.inner.insert(collection, record)
        }

        fn update(&self, collection: &str, id: &str, record: Record) -> Result<Record, CoreError> {
            self.inner.update(collection, id, record)
        }

        fn delete(&self, collection: &str, id: &str) -> Result<bool, CoreError> {
            self.inner.delete(collection, id)
        }
    }

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 5, 20, 8, 30, 0).unwrap()))
    }

    fn signed_in() -> Arc<StaticIdentity> {
        Arc::new(StaticIdentity::signed_in(Identity::new(
            "user-42",
            "Ada",
            "ada@example.com",
        )))
    }

    fn ready_session() -> IntakeSession {
        let mut session = IntakeSession::with_packages(["pkg-brakes"], Default::default());
        {
            let store = session.store_mut();
            let form_fields = [
                ("make", "Toyota"),
                ("model", "Corolla"),
                ("date", "2025-06-01"),
                ("time", "10:00"),
                ("name", "Ada Lovelace"),
                ("email", "ada@example.com"),
                ("phone", "+237 699 000 000"),
            ];
            for (key, value) in form_fields {
                store
                    .update(IntakeField::from_input(key, value).unwrap())
                    .unwrap();
            }
        }
        while !session.sequencer().is_last_step() {
            session.advance().unwrap();
        }
        session
    }

    fn coordinator(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> SubmissionCoordinator {
        SubmissionCoordinator::new(store, identity, notifier, clock(), SubmissionSettings::default())
    }

    #[test]
    fn successful_submission_persists_and_notifies_once() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = coordinator(store.clone(), signed_in(), notifier.clone());

        let receipt = coordinator.submit(ready_session()).unwrap();

        assert!(receipt.created);
        assert_eq!(receipt.redirect_to, "/dashboard/repairs");
        assert_eq!(receipt.request.status, RepairStatus::Received);
        assert_eq!(receipt.request.user_id, "user-42");
        assert_eq!(receipt.request.appointment_date, NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(receipt.request.appointment_time, NaiveTime::from_hms_opt(10, 0, 0));
        assert_eq!(store.count(collections::REPAIR_REQUESTS), 1);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
        assert!(receipt.notification.is_sent());
        assert_eq!(coordinator.state(), SubmissionState::Done);
    }

    #[test]
    fn submit_checks_only_the_final_step() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator(store.clone(), signed_in(), Arc::new(DisabledNotifier));
        let mut session = ready_session();
        session.update(IntakeField::PackageIds(Default::default())).unwrap();
        session.update(IntakeField::VehicleMake(String::new())).unwrap();
        session.update(IntakeField::ProblemDescription(String::new())).unwrap();
        assert!(session.sequencer().is_last_step());

        let receipt = coordinator.submit(session).unwrap();

        assert!(receipt.created);
        assert!(receipt.request.service_package_ids.is_empty());
        assert!(receipt.request.vehicle.make.is_empty());
        assert_eq!(store.count(collections::REPAIR_REQUESTS), 1);
    }

    #[test]
    fn anonymous_submission_redirects_without_touching_the_store() {
        let store = Arc::new(FailingStore {
            inserts: AtomicUsize::new(0),
        });
        let coordinator = coordinator(
            store.clone(),
            Arc::new(StaticIdentity::anonymous()),
            Arc::new(DisabledNotifier),
        );

        let rejected = coordinator.submit(ready_session()).unwrap_err();

        assert_eq!(
            rejected.reason,
            SubmissionFailure::SignInRequired {
                redirect_to: "/auth/sign-in?redirect=/repair".into()
            }
        );
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.state(), SubmissionState::Idle);
    }

    #[test]
    fn persistence_failure_keeps_the_session_and_skips_notification() {
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = coordinator(
            Arc::new(FailingStore {
                inserts: AtomicUsize::new(0),
            }),
            signed_in(),
            notifier.clone(),
        );
        let session = ready_session();
        let snapshot = session.form().clone();
        let key = session.idempotency_key();

        let rejected = coordinator.submit(session).unwrap_err();

        match &rejected.reason {
            SubmissionFailure::PersistFailed(message) => {
                assert!(message.contains("connection reset"))
            }
            other => panic!("unexpected failure {other:?}"),
        }
        let session = rejected.into_session();
        assert_eq!(session.form(), &snapshot);
        assert_eq!(session.idempotency_key(), key);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn notification_failure_does_not_undo_the_write() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator(store.clone(), signed_in(), Arc::new(DisabledNotifier));

        let receipt = coordinator.submit(ready_session()).unwrap();

        assert!(!receipt.notification.is_sent());
        assert_eq!(store.count(collections::REPAIR_REQUESTS), 1);
    }

    #[test]
    fn retry_with_same_key_reuses_the_existing_row() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator(store.clone(), signed_in(), Arc::new(DisabledNotifier));
        let session = ready_session();
        let retry = session.clone();

        let first = coordinator.submit(session).unwrap();
        let second = coordinator.submit(retry).unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.request.id, second.request.id);
        assert_eq!(store.count(collections::REPAIR_REQUESTS), 1);
    }

    #[test]
    fn submitting_before_the_last_step_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator(store.clone(), signed_in(), Arc::new(DisabledNotifier));
        let session = IntakeSession::with_packages(["pkg-1"], Default::default());

        let rejected = coordinator.submit(session).unwrap_err();

        assert!(matches!(rejected.reason, SubmissionFailure::Invalid(_)));
        assert_eq!(store.count(collections::REPAIR_REQUESTS), 0);
    }

    #[test]
    fn invalid_contact_step_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator(store, signed_in(), Arc::new(DisabledNotifier));
        let mut session = ready_session();
        session
            .update(IntakeField::CustomerEmail("nope".into()))
            .unwrap();

        let rejected = coordinator.submit(session).unwrap_err();

        assert_eq!(
            rejected.reason,
            SubmissionFailure::Invalid(ValidationError::new("Enter a valid email address"))
        );
    }

    #[test]
    fn concurrent_submit_is_rejected_while_one_is_in_flight() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        let coordinator = Arc::new(coordinator(
            store.clone(),
            signed_in(),
            Arc::new(DisabledNotifier),
        ));

        let background = {
            let coordinator = Arc::clone(&coordinator);
            let session = ready_session();
            thread::spawn(move || coordinator.submit(session).map(|receipt| receipt.created))
        };

        entered_rx.recv().unwrap();
        let rejected = coordinator.submit(ready_session()).unwrap_err();
        assert_eq!(rejected.reason, SubmissionFailure::InFlight);

        release_tx.send(()).unwrap();
        assert!(background.join().unwrap().unwrap());
        assert_eq!(store.inner.count(collections::REPAIR_REQUESTS), 1);
    }
}
