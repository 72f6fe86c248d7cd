use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::{
    error::WizardError,
    submission_wizard::draft::{CapturedImage, SubmissionDraft},
};

// Finalized submission handed to the submission handler
// Ownership moves to the handler, the wizard keeps no reference to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    // Unique identifier for the submission
    pub submission_id: Uuid,
    // Time the submission was started, UTC
    pub submitted_at: DateTime<Utc>,
    // Username of the signed-in user, if the wizard was bound to one
    pub submitted_by: Option<String>,
    // Title of the challenge the wizard was opened for
    pub challenge: Option<String>,
    // Draft fields, verbatim
    pub images: Vec<CapturedImage>,
    pub scan_code: Option<String>,
    pub description: String,
    pub category: String,
}

impl SubmissionRecord {
    // The only constructor: a record needs at least one image and a category
    pub(crate) fn from_draft(
        draft: &SubmissionDraft,
        submitted_by: Option<String>,
        challenge: Option<String>,
    ) -> Result<Self, WizardError> {
        if !draft.has_images() {
            return Err(WizardError::NoPhotos);
        }
        let category = match draft.category() {
            Some(category) if !category.is_empty() => category.to_string(),
            _ => return Err(WizardError::NoCategory),
        };

        Ok(Self {
            submission_id: Uuid::new_v4(),
            submitted_at: Utc::now(),
            submitted_by,
            challenge,
            images: draft.images().to_vec(),
            scan_code: draft.scan_code().map(str::to_string),
            description: draft.description().to_string(),
            category,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::capability::UploadedFile;

    fn draft_with_image() -> SubmissionDraft {
        let mut draft = SubmissionDraft::default();
        draft.push_image(CapturedImage::from_upload(UploadedFile {
            file_name: "phone.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            bytes: vec![7; 4],
        }));
        draft
    }

    #[test]
    fn refuses_draft_without_images() {
        let mut draft = SubmissionDraft::default();
        draft.set_category(Some("laptops".to_string()));
        assert_eq!(SubmissionRecord::from_draft(&draft, None, None), Err(WizardError::NoPhotos));
    }

    #[test]
    fn refuses_draft_without_category() {
        let draft = draft_with_image();
        assert_eq!(SubmissionRecord::from_draft(&draft, None, None), Err(WizardError::NoCategory));
    }

    #[test]
    fn copies_draft_fields() {
        let mut draft = draft_with_image();
        draft.set_category(Some("batteries".to_string()));
        draft.set_description("swollen cell".to_string());
        draft.record_scan_code("XYZ".to_string());

        let record =
            SubmissionRecord::from_draft(&draft, Some("ada".to_string()), Some("Battery Week".to_string())).unwrap();
        assert_eq!(record.category, "batteries");
        assert_eq!(record.description, "swollen cell");
        assert_eq!(record.scan_code.as_deref(), Some("XYZ"));
        assert_eq!(record.images, draft.images().to_vec());
        assert_eq!(record.submitted_by.as_deref(), Some("ada"));
        assert_eq!(record.challenge.as_deref(), Some("Battery Week"));

        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["category"], "batteries");
        assert_eq!(json["images"][0]["file_name"], "phone.jpg");
    }
}
