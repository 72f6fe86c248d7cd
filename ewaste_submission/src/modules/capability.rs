use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::modules::{
    error::CapabilityError,
    submission_wizard::record::SubmissionRecord,
};

// Live camera feed acquired from a device
// Holding one means the device is in use, release it as soon as a frame is taken
pub trait CameraStream: Send + Sync {
    // Grab the current frame encoded as JPEG at the given quality
    fn grab_frame(&mut self, jpeg_quality: f32) -> Result<Vec<u8>, CapabilityError>;

    // Stop every track of the stream
    fn release(&mut self);
}

// Camera device the wizard can open a stream on
pub trait CameraDevice {
    fn open(&mut self) -> Result<Box<dyn CameraStream>, CapabilityError>;
}

// Code scanner bound to a live video input
// Decode attempts are delivered to the wizard by the host, see `ScanAttempt`
pub trait CodeScanner: Send + Sync {
    fn activate(&mut self) -> Result<(), CapabilityError>;

    fn deactivate(&mut self);
}

// A single decode attempt produced by an active scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanAttempt {
    // Successfully decoded payload
    Decoded(String),
    // Frame could not be decoded, scanning continues
    Failed(String),
}

// A file picked from local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

// Receives the finalized record once the wizard completes
// The wizard only distinguishes success from failure, the error text is shown to the user
#[async_trait]
pub trait SubmissionHandler: Send + Sync {
    async fn handle(&self, record: SubmissionRecord) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

// Identity returned by the sign-in provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub username: String,
    pub email: String,
}

#[async_trait]
pub trait SignInProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> Result<UserIdentity, String>;
}
