use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::capability::UploadedFile;

// Where an image entered the draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Camera,
    Upload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedImage {
    // Generated identifier, unique per image
    pub id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub source: ImageSource,
    // Opaque image payload, base64 in serialized form
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    // Camera frames are always stored as JPEG
    pub fn from_camera(bytes: Vec<u8>) -> Self {
        let captured_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            file_name: format!("ewaste-{}.jpg", captured_at.timestamp_millis()),
            mime_type: "image/jpeg".to_string(),
            source: ImageSource::Camera,
            bytes,
            captured_at,
        }
    }

    pub fn from_upload(file: UploadedFile) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file.file_name,
            mime_type: file.mime_type,
            source: ImageSource::Upload,
            bytes: file.bytes,
            captured_at: Utc::now(),
        }
    }
}

// In-progress submission data owned by a single wizard session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionDraft {
    images: Vec<CapturedImage>,
    scan_code: Option<String>,
    description: String,
    category: Option<String>,
}

impl SubmissionDraft {
    pub fn images(&self) -> &[CapturedImage] {
        &self.images
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    pub(crate) fn push_image(&mut self, image: CapturedImage) -> Uuid {
        let id = image.id;
        self.images.push(image);
        id
    }

    pub(crate) fn remove_image(&mut self, index: usize) -> Option<CapturedImage> {
        if index < self.images.len() {
            Some(self.images.remove(index))
        } else {
            None
        }
    }

    pub fn scan_code(&self) -> Option<&str> {
        self.scan_code.as_deref()
    }

    // Only the first accepted code is kept, returns whether this one was stored
    pub(crate) fn record_scan_code(&mut self, code: String) -> bool {
        if self.scan_code.is_some() {
            return false;
        }
        self.scan_code = Some(code);
        true
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn set_description(&mut self, description: String) {
        self.description = description;
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub(crate) fn set_category(&mut self, category: Option<String>) {
        self.category = category;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

// Serde adapter writing byte payloads as standard base64 strings
mod base64_bytes {
    use base64::{engine::general_purpose, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn camera_images_are_named_as_jpeg() {
        let image = CapturedImage::from_camera(vec![0xff, 0xd8]);
        assert!(image.file_name.starts_with("ewaste-"));
        assert!(image.file_name.ends_with(".jpg"));
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.source, ImageSource::Camera);
    }

    #[test]
    fn images_get_distinct_ids() {
        let a = CapturedImage::from_upload(upload("a.png"));
        let b = CapturedImage::from_upload(upload("a.png"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn remove_image_keeps_order_of_the_rest() {
        let mut draft = SubmissionDraft::default();
        draft.push_image(CapturedImage::from_upload(upload("a.png")));
        draft.push_image(CapturedImage::from_upload(upload("b.png")));
        draft.push_image(CapturedImage::from_upload(upload("c.png")));

        let removed = draft.remove_image(1).unwrap();
        assert_eq!(removed.file_name, "b.png");
        let names: Vec<_> = draft.images().iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "c.png"]);
        assert!(draft.remove_image(2).is_none());
    }

    #[test]
    fn only_first_scan_code_is_recorded() {
        let mut draft = SubmissionDraft::default();
        assert!(draft.record_scan_code("FIRST".to_string()));
        assert!(!draft.record_scan_code("SECOND".to_string()));
        assert_eq!(draft.scan_code(), Some("FIRST"));
    }

    #[test]
    fn image_bytes_serialize_as_base64() {
        let image = CapturedImage::from_upload(upload("a.png"));
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["bytes"], "AQID");
        assert_eq!(json["source"], "upload");

        let back: CapturedImage = serde_json::from_value(json).unwrap();
        assert_eq!(back.bytes, vec![1, 2, 3]);
    }
}
