//! Evidence attachment validation. Byte-level checks happen here, before the
//! leave-request service ever sees the payload; the service stores whatever
//! it receives verbatim.

use crate::error::AppError;

const MAX_SIZE_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];

#[derive(Debug, Clone)]
pub struct EvidencePayload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

impl EvidencePayload {
    pub fn new(
        bytes: Vec<u8>,
        filename: String,
        content_type: Option<String>,
    ) -> Result<Self, AppError> {
        if bytes.is_empty() {
            return Err(AppError::Validation("evidence file is empty".to_string()));
        }
        if bytes.len() > MAX_SIZE_BYTES {
            return Err(AppError::Validation(
                "evidence file too large, max 5MB".to_string(),
            ));
        }

        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        let allowed = extension
            .as_deref()
            .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext));
        if !allowed {
            return Err(AppError::Validation(
                "invalid file type, only JPG, JPEG, PNG, PDF allowed".to_string(),
            ));
        }

        Ok(Self {
            bytes,
            filename,
            content_type: content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_extensions_case_insensitively() {
        for name in ["note.pdf", "photo.JPG", "scan.jpeg", "pic.Png"] {
            EvidencePayload::new(vec![1, 2, 3], name.to_string(), None)
                .unwrap_or_else(|_| panic!("{name} should be accepted"));
        }
    }

    #[test]
    fn rejects_disallowed_extension_and_missing_extension() {
        for name in ["malware.exe", "archive.zip", "noextension"] {
            let err = EvidencePayload::new(vec![1], name.to_string(), None).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn rejects_oversized_and_empty_payloads() {
        let err =
            EvidencePayload::new(vec![0; MAX_SIZE_BYTES + 1], "a.pdf".to_string(), None)
                .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = EvidencePayload::new(Vec::new(), "a.pdf".to_string(), None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn defaults_content_type_when_absent() {
        let payload =
            EvidencePayload::new(vec![1], "a.pdf".to_string(), None).expect("valid payload");
        assert_eq!(payload.content_type, "application/octet-stream");
    }
}
