pub mod draft;
pub mod record;


use futures::Stream;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::{
    config::WizardConfig,
    modules::{
        capability::{
            CameraDevice, CameraStream, CodeScanner, ScanAttempt, SubmissionHandler, UploadedFile,
        },
        catalog::{Category, CategoryCatalog},
        error::WizardError,
    },
};
use draft::{CapturedImage, SubmissionDraft};
use record::SubmissionRecord;

// Wizard states, in order
// Steps 1 to 3 are the three editable states, navigation between them is linear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardStep {
    CapturingPhotos,
    ScanningCode,
    ReviewingDetails,
    Submitting,
    Closed,
}

impl WizardStep {
    // Step number shown in the progress header, the submitting state still shows step 3
    pub fn number(&self) -> Option<u8> {
        match self {
            WizardStep::CapturingPhotos => Some(1),
            WizardStep::ScanningCode => Some(2),
            WizardStep::ReviewingDetails | WizardStep::Submitting => Some(3),
            WizardStep::Closed => None,
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WizardStep::CapturingPhotos => "capturing photos",
            WizardStep::ScanningCode => "scanning code",
            WizardStep::ReviewingDetails => "reviewing details",
            WizardStep::Submitting => "submitting",
            WizardStep::Closed => "closed",
        };
        f.write_str(name)
    }
}

// Challenge the wizard was opened from, shown in the header only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeContext {
    pub title: String,
    pub points_reward: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Camera,
    Scanner,
    Submission,
}

// Dismissible message about a non-fatal failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

// Handles
// - Collecting photos from the camera or file uploads
// - The optional, at-most-once code scan
// - Category and description entry
// - Handing the finished record to a submission handler exactly once
pub struct SubmissionWizard {
    // Current state of the wizard
    step: WizardStep,

    // Data entered so far, cleared on cancel and after a successful submission
    draft: SubmissionDraft,

    // Category lookup shared with the session
    catalog: Arc<CategoryCatalog>,

    config: WizardConfig,

    challenge: Option<ChallengeContext>,

    // Username recorded on the emitted record
    submitted_by: Option<String>,

    // Live camera stream, held only between open and capture
    camera: Option<Box<dyn CameraStream>>,

    // Active scanner, held only while scanning
    scanner: Option<Box<dyn CodeScanner>>,

    notices: Vec<Notice>,

    // Identifier of the record currently with the handler
    in_flight: Option<Uuid>,
}

impl SubmissionWizard {
    pub fn new(catalog: Arc<CategoryCatalog>, config: WizardConfig) -> Self {
        Self {
            step: WizardStep::CapturingPhotos,
            draft: SubmissionDraft::default(),
            catalog,
            config,
            challenge: None,
            submitted_by: None,
            camera: None,
            scanner: None,
            notices: Vec::new(),
            in_flight: None,
        }
    }

    pub fn with_challenge(mut self, challenge: Option<ChallengeContext>) -> Self {
        self.challenge = challenge;
        self
    }

    pub fn with_submitter(mut self, username: Option<String>) -> Self {
        self.submitted_by = username;
        self
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn step_number(&self) -> Option<u8> {
        self.step.number()
    }

    // True while the submission handler is running, all input is refused
    pub fn is_busy(&self) -> bool {
        self.step == WizardStep::Submitting
    }

    pub fn is_closed(&self) -> bool {
        self.step == WizardStep::Closed
    }

    pub fn draft(&self) -> &SubmissionDraft {
        &self.draft
    }

    pub fn challenge(&self) -> Option<&ChallengeContext> {
        self.challenge.as_ref()
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn submit_timeout(&self) -> Duration {
        self.config.submit_timeout()
    }

    pub fn title(&self) -> String {
        match &self.challenge {
            Some(challenge) => format!("Submit for: {}", challenge.title),
            None => "Submit E-Waste".to_string(),
        }
    }

    pub fn reward_line(&self) -> Option<String> {
        self.challenge
            .as_ref()
            .and_then(|c| c.points_reward)
            .map(|points| format!("Earn up to {} points", points))
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn dismiss_notice(&mut self, index: usize) -> Option<Notice> {
        if index < self.notices.len() {
            Some(self.notices.remove(index))
        } else {
            None
        }
    }

    fn ensure_editable(&self) -> Result<(), WizardError> {
        match self.step {
            WizardStep::Submitting => Err(WizardError::Busy),
            WizardStep::Closed => Err(WizardError::Closed),
            _ => Ok(()),
        }
    }

    fn ensure_step(&self, expected: WizardStep) -> Result<(), WizardError> {
        self.ensure_editable()?;
        if self.step != expected {
            return Err(WizardError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }

    fn push_notice(&mut self, kind: NoticeKind, message: String) {
        self.notices.push(Notice { kind, message });
    }

    fn transition(&mut self, to: WizardStep) {
        debug!("Wizard step {} -> {}", self.step, to);
        self.step = to;
    }

    // Photo step

    pub fn open_camera(&mut self, device: &mut dyn CameraDevice) -> Result<(), WizardError> {
        self.ensure_step(WizardStep::CapturingPhotos)?;

        // A second open replaces the previous stream
        self.close_camera();

        match device.open() {
            Ok(stream) => {
                debug!("Camera stream opened");
                self.camera = Some(stream);
                Ok(())
            }
            Err(e) => {
                error!("Error accessing camera: {}", e);
                self.push_notice(
                    NoticeKind::Camera,
                    "Unable to access camera. Please check permissions.".to_string(),
                );
                Err(WizardError::Capability(e))
            }
        }
    }

    pub fn is_camera_open(&self) -> bool {
        self.camera.is_some()
    }

    // Grab one frame and release the stream, whether or not the grab succeeded
    pub fn capture_photo(&mut self) -> Result<Uuid, WizardError> {
        self.ensure_step(WizardStep::CapturingPhotos)?;
        let mut stream = self.camera.take().ok_or(WizardError::CameraNotOpen)?;

        let frame = stream.grab_frame(self.config.camera_jpeg_quality);
        stream.release();

        match frame {
            Ok(bytes) => {
                let image = CapturedImage::from_camera(bytes);
                info!("Captured photo {} ({} bytes)", image.file_name, image.bytes.len());
                Ok(self.draft.push_image(image))
            }
            Err(e) => {
                error!("Error capturing photo: {}", e);
                self.push_notice(NoticeKind::Camera, format!("Could not capture photo: {}", e));
                Err(WizardError::Capability(e))
            }
        }
    }

    pub fn close_camera(&mut self) {
        if let Some(mut stream) = self.camera.take() {
            stream.release();
            debug!("Camera stream released");
        }
    }

    pub fn add_uploaded(&mut self, file: UploadedFile) -> Result<Uuid, WizardError> {
        self.ensure_step(WizardStep::CapturingPhotos)?;
        let image = CapturedImage::from_upload(file);
        info!("Added uploaded photo {} ({} bytes)", image.file_name, image.bytes.len());
        Ok(self.draft.push_image(image))
    }

    // Files are appended in the order given
    pub fn add_uploaded_files<I>(&mut self, files: I) -> Result<Vec<Uuid>, WizardError>
    where
        I: IntoIterator<Item = UploadedFile>,
    {
        self.ensure_step(WizardStep::CapturingPhotos)?;
        Ok(files
            .into_iter()
            .map(|file| self.draft.push_image(CapturedImage::from_upload(file)))
            .collect())
    }

    pub fn remove_photo(&mut self, index: usize) -> Result<CapturedImage, WizardError> {
        self.ensure_editable()?;
        let len = self.draft.images().len();
        self.draft
            .remove_image(index)
            .ok_or(WizardError::PhotoIndexOutOfRange { index, len })
    }

    // Navigation

    pub fn next_step(&mut self) -> Result<WizardStep, WizardError> {
        match self.step {
            WizardStep::CapturingPhotos => {
                if !self.draft.has_images() {
                    return Err(WizardError::NoPhotos);
                }
                self.close_camera();
                self.transition(WizardStep::ScanningCode);
            }
            WizardStep::ScanningCode => {
                // Skipping the scan is allowed, an active scanner is cancelled
                self.stop_scanning();
                self.transition(WizardStep::ReviewingDetails);
            }
            WizardStep::ReviewingDetails => return Err(WizardError::UseSubmit),
            WizardStep::Submitting => return Err(WizardError::Busy),
            WizardStep::Closed => return Err(WizardError::Closed),
        }
        Ok(self.step)
    }

    pub fn previous_step(&mut self) -> Result<WizardStep, WizardError> {
        match self.step {
            WizardStep::CapturingPhotos => return Err(WizardError::NoPreviousStep),
            WizardStep::ScanningCode => {
                self.stop_scanning();
                self.transition(WizardStep::CapturingPhotos);
            }
            WizardStep::ReviewingDetails => self.transition(WizardStep::ScanningCode),
            WizardStep::Submitting => return Err(WizardError::Busy),
            WizardStep::Closed => return Err(WizardError::Closed),
        }
        Ok(self.step)
    }

    // Scan step

    pub fn start_scanning(&mut self, mut scanner: Box<dyn CodeScanner>) -> Result<(), WizardError> {
        self.ensure_step(WizardStep::ScanningCode)?;
        if self.draft.scan_code().is_some() {
            return Err(WizardError::CodeAlreadyScanned);
        }
        self.stop_scanning();

        if let Err(e) = scanner.activate() {
            error!("Error starting code scanner: {}", e);
            self.push_notice(
                NoticeKind::Scanner,
                "Unable to start the code scanner. Please check camera permissions.".to_string(),
            );
            return Err(WizardError::Capability(e));
        }
        debug!("Code scanner active");
        self.scanner = Some(scanner);
        Ok(())
    }

    pub fn is_scanning(&self) -> bool {
        self.scanner.is_some()
    }

    // Returns true once a code has been accepted and scanning has stopped
    pub fn on_scan_attempt(&mut self, attempt: ScanAttempt) -> Result<bool, WizardError> {
        self.ensure_step(WizardStep::ScanningCode)?;
        if self.scanner.is_none() {
            return Err(WizardError::ScannerNotActive);
        }

        match attempt {
            ScanAttempt::Decoded(code) if code.trim().is_empty() => {
                warn!("Code scan error: empty payload");
                Ok(false)
            }
            ScanAttempt::Decoded(code) => {
                info!("Code scanned: {}", code);
                self.draft.record_scan_code(code);
                self.stop_scanning();
                Ok(true)
            }
            ScanAttempt::Failed(reason) => {
                warn!("Code scan error: {}", reason);
                Ok(false)
            }
        }
    }

    // Feed attempts until the first decode
    // The stream ending without a decode counts as cancellation
    pub async fn scan_from_stream<S>(&mut self, mut attempts: S) -> Result<Option<String>, WizardError>
    where
        S: Stream<Item = ScanAttempt> + Unpin,
    {
        while let Some(attempt) = attempts.next().await {
            if self.on_scan_attempt(attempt)? {
                return Ok(self.draft.scan_code().map(str::to_string));
            }
        }
        self.stop_scanning();
        Ok(None)
    }

    // Keeps any code already accepted
    pub fn stop_scanning(&mut self) {
        if let Some(mut scanner) = self.scanner.take() {
            scanner.deactivate();
            debug!("Code scanner stopped");
        }
    }

    // Review step

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), WizardError> {
        self.ensure_editable()?;
        self.draft.set_description(description.into());
        Ok(())
    }

    // An empty id clears the selection
    pub fn select_category(&mut self, id: &str) -> Result<(), WizardError> {
        self.ensure_editable()?;
        if id.is_empty() {
            self.draft.set_category(None);
            return Ok(());
        }
        if !self.catalog.contains(id) {
            return Err(WizardError::UnknownCategory(id.to_string()));
        }
        self.draft.set_category(Some(id.to_string()));
        Ok(())
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.draft.category().and_then(|id| self.catalog.get(id))
    }

    pub fn estimated_points(&self) -> u32 {
        self.catalog
            .estimate(self.draft.category(), self.draft.scan_code().is_some())
    }

    // Submission

    // Validate the draft and enter the busy state
    // The returned record must be followed by exactly one `finish_submit`
    pub fn begin_submit(&mut self) -> Result<SubmissionRecord, WizardError> {
        self.ensure_step(WizardStep::ReviewingDetails)?;
        let record = SubmissionRecord::from_draft(
            &self.draft,
            self.submitted_by.clone(),
            self.challenge.as_ref().map(|c| c.title.clone()),
        )?;

        self.in_flight = Some(record.submission_id);
        self.transition(WizardStep::Submitting);
        info!(
            "Submitting {} with {} photo(s), category {}",
            record.submission_id,
            record.images.len(),
            record.category
        );
        Ok(record)
    }

    // Success closes the wizard and clears the draft
    // Failure returns to the review step with the draft intact so it can be resubmitted
    pub fn finish_submit(&mut self, outcome: Result<(), WizardError>) -> Result<(), WizardError> {
        if self.step != WizardStep::Submitting {
            return Err(WizardError::WrongStep {
                expected: WizardStep::Submitting,
                actual: self.step,
            });
        }
        let submission_id = self.in_flight.take();

        match outcome {
            Ok(()) => {
                info!("Submission {:?} accepted", submission_id);
                self.release_capabilities();
                self.draft.clear();
                self.notices.clear();
                self.transition(WizardStep::Closed);
                Ok(())
            }
            Err(e) => {
                error!("Submission {:?} failed: {}", submission_id, e);
                self.push_notice(NoticeKind::Submission, e.to_string());
                self.transition(WizardStep::ReviewingDetails);
                Err(e)
            }
        }
    }

    // Dropping the returned future before it completes returns the wizard to review
    pub async fn submit(&mut self, handler: &dyn SubmissionHandler) -> Result<Uuid, WizardError> {
        let record = self.begin_submit()?;
        let submission_id = record.submission_id;
        let timeout = self.submit_timeout();

        let pending = PendingSubmit {
            wizard: self,
            submission_id,
            armed: true,
        };
        let outcome = deliver(handler, record, timeout).await;
        pending.complete(outcome)?;
        Ok(submission_id)
    }

    // Undo a handoff whose caller went away, only if it is still the one in flight
    pub(crate) fn abandon_submit(&mut self, submission_id: Uuid) {
        if self.step == WizardStep::Submitting && self.in_flight == Some(submission_id) {
            warn!("Submission {} abandoned before the handler answered", submission_id);
            let _ = self.finish_submit(Err(WizardError::SubmissionAbandoned));
        }
    }

    pub fn cancel(&mut self) -> Result<(), WizardError> {
        self.ensure_editable()?;
        self.release_capabilities();
        self.draft.clear();
        self.transition(WizardStep::Closed);
        info!("Submission wizard cancelled");
        Ok(())
    }

    fn release_capabilities(&mut self) {
        self.close_camera();
        self.stop_scanning();
    }
}

// Armed between `begin_submit` and `finish_submit` of `SubmissionWizard::submit`
struct PendingSubmit<'a> {
    wizard: &'a mut SubmissionWizard,
    submission_id: Uuid,
    armed: bool,
}

impl PendingSubmit<'_> {
    fn complete(mut self, outcome: Result<(), WizardError>) -> Result<(), WizardError> {
        self.armed = false;
        self.wizard.finish_submit(outcome)
    }
}

impl Drop for PendingSubmit<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.wizard.abandon_submit(self.submission_id);
        }
    }
}

impl Drop for SubmissionWizard {
    fn drop(&mut self) {
        self.release_capabilities();
    }
}

// Hand a record to the handler, bounded by the timeout
pub(crate) async fn deliver(
    handler: &dyn SubmissionHandler,
    record: SubmissionRecord,
    timeout: Duration,
) -> Result<(), WizardError> {
    match tokio::time::timeout(timeout, handler.handle(record)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WizardError::SubmissionFailed(e)),
        Err(_) => Err(WizardError::SubmissionTimedOut(timeout)),
    }
}
