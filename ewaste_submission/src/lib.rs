pub mod config;
pub mod modules;

pub use modules::{
    capability::{
        CameraDevice, CameraStream, CodeScanner, Credentials, ScanAttempt, SignInProvider,
        SubmissionHandler, UploadedFile, UserIdentity,
    },
    catalog::{Category, CategoryCatalog},
    error::{CapabilityError, WizardError},
    session::AppSession,
    shared_wizard::SharedWizard,
    submission_wizard::{
        draft::{CapturedImage, ImageSource, SubmissionDraft},
        record::SubmissionRecord,
        ChallengeContext, Notice, NoticeKind, SubmissionWizard, WizardStep,
    },
};
