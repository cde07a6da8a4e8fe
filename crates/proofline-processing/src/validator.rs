use image::ImageFormat;
use proofline_core::PipelineError;
use std::io::Cursor;
use std::path::Path;

/// Validation errors for uploaded photos
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,

    #[error("File content does not match declared type {declared}: {reason}")]
    CorruptContent { declared: String, reason: String },
}

impl From<ValidationError> for PipelineError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge { .. } => PipelineError::PayloadTooLarge(err.to_string()),
            _ => PipelineError::Validation(err.to_string()),
        }
    }
}

/// Extensions accepted for a content type
fn extensions_for(content_type: &str) -> &'static [&'static str] {
    match content_type {
        "image/jpeg" | "image/jpg" => &["jpg", "jpeg"],
        "image/png" => &["png"],
        "image/webp" => &["webp"],
        _ => &[],
    }
}

fn format_for(content_type: &str) -> Option<ImageFormat> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}

/// Photo upload validator
///
/// Checks size bounds, the content-type allow-list, extension/content-type
/// agreement and finally the file's magic bytes and header, so a corrupt or
/// mislabelled file is rejected before anything is stored.
#[derive(Debug, Clone)]
pub struct MediaValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl MediaValidator {
    pub fn new(max_file_size: usize, allowed_content_types: Vec<String>) -> Self {
        let allowed_content_types: Vec<String> = allowed_content_types
            .into_iter()
            .map(|ct| ct.trim().to_lowercase())
            .collect();
        let allowed_extensions = allowed_content_types
            .iter()
            .flat_map(|ct| extensions_for(ct).iter().map(|e| e.to_string()))
            .collect();

        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    fn extension_of(filename: &str) -> Result<String, ValidationError> {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Self::extension_of(filename)?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    /// Validate content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate that Content-Type matches the file extension
    pub fn validate_extension_content_type_match(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<(), ValidationError> {
        let extension = Self::extension_of(filename)?;
        let normalized = content_type.to_lowercase();
        let expected = extensions_for(&normalized);

        if !expected.contains(&extension.as_str()) {
            return Err(ValidationError::InvalidContentType {
                content_type: format!(
                    "{} (does not match extension '{}')",
                    content_type, extension
                ),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Check magic bytes against the declared type and that the header decodes.
    pub fn validate_content(&self, content_type: &str, data: &[u8]) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();
        let corrupt = |reason: String| ValidationError::CorruptContent {
            declared: normalized.clone(),
            reason,
        };

        let declared = format_for(&normalized).ok_or_else(|| {
            ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            }
        })?;

        let detected =
            image::guess_format(data).map_err(|_| corrupt("unrecognized file signature".into()))?;
        if detected != declared {
            return Err(corrupt(format!("detected {:?}", detected)));
        }

        let (width, height) = image::ImageReader::with_format(Cursor::new(data), declared)
            .into_dimensions()
            .map_err(|e| corrupt(e.to_string()))?;
        if width == 0 || height == 0 {
            return Err(corrupt("zero dimensions".into()));
        }

        Ok(())
    }

    /// Validate all aspects of a file
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<(), ValidationError> {
        self.validate_file_size(data.len())?;
        self.validate_extension(filename)?;
        self.validate_content_type(content_type)?;
        self.validate_extension_content_type_match(filename, content_type)?;
        self.validate_content(content_type, data)?;
        Ok(())
    }
}
