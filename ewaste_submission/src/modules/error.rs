use std::time::Duration;
use thiserror::Error;

use crate::modules::submission_wizard::WizardStep;

// Failures reported by an external device or service (camera, code scanner)
// These never end the wizard, the caller is expected to fall back to file upload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    // The user or the host refused access to the device
    #[error("permission denied")]
    PermissionDenied,
    // No device of the requested kind is present
    #[error("device unavailable")]
    Unavailable,
    // The device was acquired but failed while in use
    #[error("device error: {0}")]
    Device(String),
}

// Custom WizardError covering input validation, capability access and the submission handoff
// Validation variants never change wizard state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    // Forward transition from the photo step, or submission, without any image
    #[error("add at least one photo before continuing")]
    NoPhotos,
    // Submission without a selected category
    #[error("select a category before submitting")]
    NoCategory,
    // Category identifier not present in the catalog
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    // Image removal with an index past the end of the image sequence
    #[error("no photo at index {index} ({len} attached)")]
    PhotoIndexOutOfRange { index: usize, len: usize },
    // Backward move requested on the first step
    #[error("already on the first step")]
    NoPreviousStep,
    // Forward move requested on the review step, which only advances through submit
    #[error("the review step advances by submitting")]
    UseSubmit,
    // Operation belongs to a different step than the current one
    #[error("operation requires step {expected}, wizard is at {actual}")]
    WrongStep { expected: WizardStep, actual: WizardStep },
    // Capture requested without a live camera stream
    #[error("camera is not open")]
    CameraNotOpen,
    // A code was already accepted in this session
    #[error("a code has already been scanned")]
    CodeAlreadyScanned,
    // Scan attempt delivered while no scanner is active
    #[error("code scanner is not active")]
    ScannerNotActive,
    // Input received while the submission handoff is in flight
    #[error("submission in progress")]
    Busy,
    // Input received after the wizard was dismissed
    #[error("wizard is closed")]
    Closed,
    // Wizard requested without a signed-in identity
    #[error("sign in to submit e-waste")]
    NotSignedIn,
    // Camera or scanner access failure
    #[error("capability failure: {0}")]
    Capability(#[from] CapabilityError),
    // Sign-in provider rejected the credentials or failed
    #[error("sign-in failed: {0}")]
    SignIn(String),
    // Submission handler reported a failure
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    // Caller dropped the submission before the handler answered
    #[error("submission abandoned before completion")]
    SubmissionAbandoned,
    // Submission handler did not answer within the configured window
    #[error("submission timed out after {0:?}")]
    SubmissionTimedOut(Duration),
}

impl WizardError {
    // Validation errors block a transition but leave the draft untouched
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WizardError::NoPhotos
                | WizardError::NoCategory
                | WizardError::UnknownCategory(_)
                | WizardError::PhotoIndexOutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_flagged() {
        assert!(WizardError::NoPhotos.is_validation());
        assert!(WizardError::UnknownCategory("x".to_string()).is_validation());
        assert!(!WizardError::Busy.is_validation());
        assert!(!WizardError::Capability(CapabilityError::PermissionDenied).is_validation());
    }

    #[test]
    fn messages_name_the_step() {
        let err = WizardError::WrongStep {
            expected: WizardStep::ScanningCode,
            actual: WizardStep::CapturingPhotos,
        };
        assert_eq!(
            err.to_string(),
            "operation requires step scanning code, wizard is at capturing photos"
        );
    }
}
