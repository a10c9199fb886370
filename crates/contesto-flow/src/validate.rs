//! Candidate file validation for fine submissions.
//!
//! Rules are checked in order; the first failure wins. PDFs must parse
//! to exactly one page. Encrypted PDFs are still attempted: legal
//! notices are sometimes protected but readable.

use contesto_core::models::CandidateFile;

pub const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_MIME_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];
const UNSUPPORTED_MOBILE_IMAGE_MIME_TYPES: &[&str] = &[
    "image/heic",
    "image/heif",
    "image/heic-sequence",
    "image/heif-sequence",
];
const UNSUPPORTED_MOBILE_IMAGE_EXTENSIONS: &[&str] = &["heic", "heif"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FileValidationError {
    #[error("File size exceeds the 10MB limit")]
    TooLarge { size: usize },

    #[error("Unsupported mobile image format (HEIC/HEIF). Use JPG or PNG")]
    UnsupportedMobileImage,

    #[error("Unsupported image format. Use JPG or PNG")]
    UnsupportedImageFormat,

    #[error("File type not allowed. Use PDF, JPG or PNG")]
    DisallowedType,

    #[error("Only a single-page PDF is accepted (got {0} pages)")]
    MultiPagePdf(usize),

    #[error("Could not read the PDF. Send a single-page PDF")]
    UnreadablePdf,
}

/// Validate a candidate file against the submission rules.
pub fn validate_fine_file(file: &CandidateFile) -> Result<(), FileValidationError> {
    let mime = file.content_type.to_lowercase();
    let extension = file.extension().unwrap_or_default();

    if file.size() > MAX_FILE_SIZE_BYTES {
        return Err(FileValidationError::TooLarge { size: file.size() });
    }

    if UNSUPPORTED_MOBILE_IMAGE_MIME_TYPES.contains(&mime.as_str())
        || UNSUPPORTED_MOBILE_IMAGE_EXTENSIONS.contains(&extension.as_str())
    {
        return Err(FileValidationError::UnsupportedMobileImage);
    }

    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        if mime.starts_with("image/") {
            return Err(FileValidationError::UnsupportedImageFormat);
        }
        return Err(FileValidationError::DisallowedType);
    }

    if mime == "application/pdf" {
        let pages = pdf_extract::extract_text_from_mem_by_pages(&file.data)
            .map_err(|e| {
                tracing::debug!(error = %e, file = %file.name, "PDF page count failed");
                FileValidationError::UnreadablePdf
            })?
            .len();
        if pages != 1 {
            return Err(FileValidationError::MultiPagePdf(pages));
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn build_test_pdf(page_count: usize) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::new();
    let kids: Vec<String> = (0..page_count).map(|i| format!("{} 0 R", 3 + i)).collect();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        page_count
    ));
    for _ in 0..page_count {
        objects.push(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << >> >>".to_string(),
        );
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_pos = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_pos
        )
        .as_bytes(),
    );
    out
}
