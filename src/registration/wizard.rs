//! RegistrationWizard: coordinates the form store, step gating, document
//! uploads, submission and OTP verification.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::field::Field;
use super::model::{DocumentType, LocalFile, RegistrationState};
use super::otp::OtpVerifier;
use super::step::{blocking_reasons, Step, StepController};
use super::store::{ErrorMap, FormStore};
use super::submit::{RegisteredUser, RegistrationApi, RegistrationSubmitter};
use super::upload::{DocumentUploader, UploadAdapter, UploadStatus};
use crate::config::OnboardingConfig;
use crate::error::{OtpError, StepError, SubmitError, UploadError};
use crate::session::UserIdStore;

/// Where the wizard is overall.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
    /// Collecting details across the five steps.
    #[default]
    Filling,
    /// Registration accepted; waiting for the emailed OTP.
    AwaitingVerification,
    /// OTP accepted.
    Verified,
}

fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

pub struct RegistrationWizard {
    store: FormStore,
    steps: StepController,
    uploads: UploadAdapter,
    submitter: RegistrationSubmitter,
    otp: OtpVerifier,
    phase: WizardPhase,
    today: fn() -> NaiveDate,
}

impl RegistrationWizard {
    pub fn new(
        config: &OnboardingConfig,
        api: Arc<dyn RegistrationApi>,
        uploader: Arc<dyn DocumentUploader>,
        session: Arc<dyn UserIdStore>,
    ) -> Self {
        Self {
            store: FormStore::new(config.collect_credentials),
            steps: StepController::new(),
            uploads: UploadAdapter::new(uploader, config.max_upload_bytes),
            submitter: RegistrationSubmitter::new(Arc::clone(&api), Arc::clone(&session)),
            otp: OtpVerifier::new(api, session, config.redirect_url.clone()),
            phase: WizardPhase::Filling,
            today: today_utc,
        }
    }

    /// Replace the source of "today" used by the age check.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn state(&self) -> &RegistrationState {
        self.store.state()
    }

    pub fn errors(&self) -> &ErrorMap {
        self.store.errors()
    }

    pub fn current_step(&self) -> Step {
        self.steps.current()
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn upload_status(&self, document: DocumentType) -> UploadStatus {
        self.uploads.tracker().status(document)
    }

    /// Why the current step cannot be left yet.
    pub fn blocking_reasons(&self) -> Vec<String> {
        blocking_reasons(
            self.steps.current(),
            self.store.state(),
            self.store.errors(),
            (self.today)(),
        )
    }

    pub fn can_advance(&self) -> bool {
        self.blocking_reasons().is_empty()
    }

    /// Update a field. Returns the field's validation message, if any.
    pub fn set_field(&mut self, field: Field, value: &str) -> Result<Option<String>, StepError> {
        self.ensure_filling()?;
        let error = self.store.set_field(field, value).map(str::to_string);
        debug!(field = %field, valid = error.is_none(), "Field updated");
        Ok(error)
    }

    pub fn next(&mut self) -> Result<Step, StepError> {
        self.ensure_filling()?;
        let step = self
            .steps
            .advance(self.store.state(), self.store.errors(), (self.today)())?;
        info!(step = %step, "Advanced to step {}", step.number());
        Ok(step)
    }

    pub fn back(&mut self) -> Result<Step, StepError> {
        self.ensure_filling()?;
        let step = self.steps.retreat()?;
        debug!(step = %step, "Moved back");
        Ok(step)
    }

    /// Select a file for a document and upload it. The URL is recorded
    /// only when the upload succeeds.
    pub async fn upload_document(
        &mut self,
        document: DocumentType,
        file: LocalFile,
    ) -> Result<String, UploadError> {
        if self.phase != WizardPhase::Filling {
            return Err(UploadError::Locked);
        }
        self.store.select_attachment(document, file.clone());
        let url = self.uploads.upload(&file, document).await?;
        self.store.set_uploaded(document, url.clone());
        Ok(url)
    }

    /// Upload several documents concurrently. Each result is recorded
    /// against its own document. When a document appears more than once
    /// only its last file is uploaded.
    pub async fn upload_documents(
        &mut self,
        files: Vec<(DocumentType, LocalFile)>,
    ) -> Vec<(DocumentType, Result<String, UploadError>)> {
        let mut unique: Vec<(DocumentType, LocalFile)> = Vec::with_capacity(files.len());
        for (document, file) in files {
            match unique.iter_mut().find(|(d, _)| *d == document) {
                Some(slot) => slot.1 = file,
                None => unique.push((document, file)),
            }
        }

        if self.phase != WizardPhase::Filling {
            return unique
                .into_iter()
                .map(|(document, _)| (document, Err(UploadError::Locked)))
                .collect();
        }

        for (document, file) in &unique {
            self.store.select_attachment(*document, file.clone());
        }

        let uploads = &self.uploads;
        let results = join_all(
            unique
                .iter()
                .map(|(document, file)| async move { (*document, uploads.upload(file, *document).await) }),
        )
        .await;

        for (document, result) in &results {
            if let Ok(url) = result {
                self.store.set_uploaded(*document, url.clone());
            }
        }
        results
    }

    /// Submit the registration from the bank step. On success the wizard
    /// waits for the OTP; on failure nothing changes.
    pub async fn submit(&mut self) -> Result<RegisteredUser, SubmitError> {
        if self.phase != WizardPhase::Filling {
            return Err(SubmitError::NotReady {
                reasons: vec!["Registration was already submitted".to_string()],
            });
        }
        if !self.steps.current().is_last() {
            return Err(SubmitError::NotReady {
                reasons: vec![format!(
                    "Complete step {} ({}) first",
                    self.steps.current().number(),
                    self.steps.current().title()
                )],
            });
        }

        let user = self
            .submitter
            .submit(self.store.state(), self.store.errors(), (self.today)())
            .await?;
        self.otp.remember_user(user.id.clone());
        self.phase = WizardPhase::AwaitingVerification;
        Ok(user)
    }

    /// Verify the emailed code. Returns the redirect URL on success.
    pub async fn verify_otp(&mut self, code: &str) -> Result<String, OtpError> {
        if self.phase != WizardPhase::AwaitingVerification {
            return Err(OtpError::NotAwaiting);
        }
        let redirect = self.otp.verify(code).await?;
        self.phase = WizardPhase::Verified;
        Ok(redirect)
    }

    /// Plain-text view of the current step: fields, errors, documents and
    /// anything still blocking.
    pub fn render(&self) -> String {
        let step = self.steps.current();
        let state = self.store.state();
        let mut out = String::new();

        let _ = writeln!(
            out,
            "Step {}/{}: {}",
            step.number(),
            Step::ALL.len(),
            step.title()
        );
        for field in step.fields(state.collects_credentials()) {
            let value = state.value(field);
            let shown = if field.is_secret() && !value.is_empty() {
                "********"
            } else {
                value
            };
            let _ = writeln!(out, "  {:<28} {}", field.label(), shown);
            if let Some(message) = self.store.errors().for_field(field) {
                let _ = writeln!(out, "    ! {message}");
            }
        }
        for document in step.documents() {
            let status = self.uploads.tracker().status(document);
            let detail = if status.in_flight {
                format!("uploading {}%", status.progress_percent)
            } else {
                state.attachment(document).describe()
            };
            let _ = writeln!(out, "  [{}] {}", document.label(), detail);
            if let Some(error) = status.last_error {
                let _ = writeln!(out, "    ! {error}");
            }
        }

        let reasons = self.blocking_reasons();
        if !reasons.is_empty() {
            let _ = writeln!(out, "  Still needed:");
            for reason in reasons {
                let _ = writeln!(out, "    - {reason}");
            }
        }
        out
    }

    fn ensure_filling(&self) -> Result<(), StepError> {
        if self.phase == WizardPhase::Filling {
            Ok(())
        } else {
            Err(StepError::AlreadySubmitted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::submit::tests::{complete_store, ReadOnlyStore, StubApi};
    use crate::registration::upload::tests::StubUploader;
    use crate::registration::validation::UNDERAGE_MESSAGE;
    use crate::session::MemoryUserIdStore;

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn wizard(api: Arc<StubApi>) -> (RegistrationWizard, Arc<MemoryUserIdStore>) {
        let config = OnboardingConfig::new("http://backend.test", "https://app.test/dashboard");
        let session = Arc::new(MemoryUserIdStore::new());
        let wizard = RegistrationWizard::new(
            &config,
            api,
            Arc::new(StubUploader::default()),
            session.clone(),
        )
        .with_clock(fixed_today);
        (wizard, session)
    }

    fn pdf(name: &str) -> LocalFile {
        LocalFile::from_bytes(name, vec![7; 1024])
    }

    /// Fill every step from the complete fixture and walk to the bank step.
    async fn walk_to_bank(wizard: &mut RegistrationWizard) {
        let source = complete_store();
        let fill = |w: &mut RegistrationWizard, step: Step| {
            for field in step.fields(false) {
                w.set_field(field, source.state().value(field)).unwrap();
            }
        };

        fill(wizard, Step::Contact);
        wizard.next().unwrap();
        fill(wizard, Step::Personal);
        wizard.next().unwrap();
        fill(wizard, Step::Identity);
        let results = wizard
            .upload_documents(vec![
                (DocumentType::PanAttachment, pdf("pan.pdf")),
                (DocumentType::AadharFront, pdf("front.pdf")),
                (DocumentType::AadharBack, pdf("back.pdf")),
            ])
            .await;
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        wizard.next().unwrap();
        fill(wizard, Step::Address);
        wizard.next().unwrap();
        fill(wizard, Step::Bank);
        wizard
            .upload_document(DocumentType::BankProof, pdf("proof.pdf"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn full_flow_submits_once_then_verifies() {
        let api = Arc::new(StubApi {
            accepted_otp: Some("424242".into()),
            ..Default::default()
        });
        let (mut wizard, session) = wizard(api.clone());

        walk_to_bank(&mut wizard).await;
        assert_eq!(wizard.current_step(), Step::Bank);
        assert!(wizard.can_advance());

        let user = wizard.submit().await.unwrap();
        assert_eq!(user.id, "usr_1");
        assert_eq!(wizard.phase(), WizardPhase::AwaitingVerification);

        let registrations = api.registrations.lock().unwrap().clone();
        assert_eq!(registrations.len(), 1);
        let request = &registrations[0];
        assert_eq!(request.date_of_birth, "1990-01-15T00:00:00.000Z");
        assert_eq!(request.address.city, "Bengaluru");
        assert_eq!(request.bank_details.bank_proof, "https://cdn.test/bankProof/proof.pdf");
        assert_eq!(
            request.identity_details.pan_attachment,
            "https://cdn.test/panAttachment/pan.pdf"
        );
        assert_eq!(session.load().await.unwrap().as_deref(), Some("usr_1"));

        // Editing is locked once submitted.
        assert!(matches!(
            wizard.set_field(Field::City, "Mysuru"),
            Err(StepError::AlreadySubmitted)
        ));

        assert!(wizard.verify_otp("000000").await.is_err());
        assert_eq!(wizard.phase(), WizardPhase::AwaitingVerification);
        let redirect = wizard.verify_otp("424242").await.unwrap();
        assert_eq!(redirect, "https://app.test/dashboard");
        assert_eq!(wizard.phase(), WizardPhase::Verified);
    }

    #[tokio::test]
    async fn failed_submit_leaves_step_and_session_untouched() {
        let api = Arc::new(StubApi {
            reject_registration: true,
            ..Default::default()
        });
        let (mut wizard, session) = wizard(api.clone());
        walk_to_bank(&mut wizard).await;

        let err = wizard.submit().await.unwrap_err();
        assert!(matches!(err, SubmitError::Rejected { .. }));
        assert_eq!(wizard.current_step(), Step::Bank);
        assert_eq!(wizard.phase(), WizardPhase::Filling);
        assert_eq!(session.load().await.unwrap(), None);
        assert_eq!(api.registrations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oversized_upload_keeps_identity_step_blocked() {
        let (mut wizard, _) = wizard(Arc::new(StubApi::default()));
        let source = complete_store();
        for step in [Step::Contact, Step::Personal] {
            for field in step.fields(false) {
                wizard.set_field(field, source.state().value(field)).unwrap();
            }
            wizard.next().unwrap();
        }
        for field in Step::Identity.fields(false) {
            wizard.set_field(field, source.state().value(field)).unwrap();
        }

        let big = LocalFile::from_bytes("huge.pdf", vec![0; 6 * 1024 * 1024]);
        let results = wizard
            .upload_documents(vec![
                (DocumentType::PanAttachment, big),
                (DocumentType::AadharFront, pdf("front.pdf")),
                (DocumentType::AadharBack, pdf("back.pdf")),
            ])
            .await;

        assert!(results[0].1.is_err());
        assert!(!wizard.state().identity_details.pan_attachment.is_uploaded());
        assert!(wizard.state().identity_details.aadhar_front.is_uploaded());
        assert!(!wizard.can_advance());
        assert!(wizard.next().is_err());
        assert_eq!(wizard.current_step(), Step::Identity);
        assert!(wizard
            .upload_status(DocumentType::PanAttachment)
            .last_error
            .is_some());
    }

    #[tokio::test]
    async fn submit_requires_last_step() {
        let (mut wizard, _) = wizard(Arc::new(StubApi::default()));
        assert!(matches!(
            wizard.submit().await,
            Err(SubmitError::NotReady { .. })
        ));
    }

    #[test]
    fn underage_applicant_cannot_leave_personal_step() {
        let (mut wizard, _) = wizard(Arc::new(StubApi::default()));
        wizard.set_field(Field::MobileNumber, "9876543210").unwrap();
        wizard.set_field(Field::Email, "kid@example.in").unwrap();
        wizard.next().unwrap();
        wizard.set_field(Field::FirstName, "Kiran").unwrap();
        wizard.set_field(Field::LastName, "Das").unwrap();
        wizard.set_field(Field::DateOfBirth, "2010-06-01").unwrap();

        match wizard.next() {
            Err(StepError::Incomplete { step, reasons }) => {
                assert_eq!(step, Step::Personal);
                assert!(reasons.contains(&UNDERAGE_MESSAGE.to_string()));
            }
            other => panic!("expected Incomplete, got {other:?}"),
        }
        assert!(wizard.render().contains(UNDERAGE_MESSAGE));
    }

    #[test]
    fn render_shows_errors_and_masks_nothing_unexpected() {
        let (mut wizard, _) = wizard(Arc::new(StubApi::default()));
        wizard.set_field(Field::MobileNumber, "123").unwrap();
        let view = wizard.render();
        assert!(view.starts_with("Step 1/5: Initial Registration"));
        assert!(view.contains("Mobile number must be 10 digits."));
        assert!(view.contains("Email is required"));
    }

    #[tokio::test]
    async fn editing_an_earlier_step_at_bank_blocks_submit() {
        let api = Arc::new(StubApi::default());
        let (mut wizard, _) = wizard(api.clone());
        walk_to_bank(&mut wizard).await;

        wizard.set_field(Field::Email, "not-an-email").unwrap();
        wizard.set_field(Field::MobileNumber, "").unwrap();

        assert!(matches!(
            wizard.submit().await,
            Err(SubmitError::NotReady { .. })
        ));
        assert!(api.registrations.lock().unwrap().is_empty());
        assert_eq!(wizard.phase(), WizardPhase::Filling);
    }

    #[tokio::test]
    async fn failed_id_write_still_moves_to_verification() {
        let api = Arc::new(StubApi {
            accepted_otp: Some("424242".into()),
            ..Default::default()
        });
        let config = OnboardingConfig::new("http://backend.test", "https://app.test/dashboard");
        let mut wizard = RegistrationWizard::new(
            &config,
            api.clone(),
            Arc::new(StubUploader::default()),
            Arc::new(ReadOnlyStore),
        )
        .with_clock(fixed_today);
        walk_to_bank(&mut wizard).await;

        assert!(wizard.submit().await.is_ok());
        assert_eq!(wizard.phase(), WizardPhase::AwaitingVerification);
        assert!(wizard.submit().await.is_err());
        assert_eq!(api.registrations.lock().unwrap().len(), 1);

        assert!(wizard.verify_otp("424242").await.is_ok());
        assert_eq!(
            api.otp_calls.lock().unwrap().last().cloned(),
            Some(("usr_1".to_string(), "424242".to_string()))
        );
    }

    #[tokio::test]
    async fn documents_are_locked_after_submit() {
        let (mut wizard, _) = wizard(Arc::new(StubApi::default()));
        walk_to_bank(&mut wizard).await;
        wizard.submit().await.unwrap();

        let err = wizard
            .upload_document(DocumentType::BankProof, pdf("other.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err, UploadError::Locked);
        assert_eq!(
            wizard.state().bank_details.bank_proof.uploaded_url(),
            Some("https://cdn.test/bankProof/proof.pdf")
        );

        let results = wizard
            .upload_documents(vec![(DocumentType::AadharBack, pdf("again.pdf"))])
            .await;
        assert_eq!(results, vec![(DocumentType::AadharBack, Err(UploadError::Locked))]);
    }

    #[tokio::test]
    async fn duplicate_documents_upload_the_last_file_once() {
        let (mut wizard, _) = wizard(Arc::new(StubApi::default()));
        let results = wizard
            .upload_documents(vec![
                (DocumentType::PanAttachment, pdf("first.pdf")),
                (DocumentType::AadharFront, pdf("front.pdf")),
                (DocumentType::PanAttachment, pdf("second.pdf")),
            ])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(
            wizard.state().identity_details.pan_attachment.uploaded_url(),
            Some("https://cdn.test/panAttachment/second.pdf")
        );
    }
}
