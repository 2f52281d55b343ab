//! Photo upload targets

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::models::format_timestamp;
use crate::{Error, Result};

/// Lifetime of a presigned upload target, in seconds
pub const UPLOAD_EXPIRES_IN_SECS: u64 = 900;

static FILENAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+\.(jpg|jpeg|png|gif)$").expect("static filename pattern")
});

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlParams {
    pub user_id: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            _ => None,
        }
    }
}

/// A validated request for an upload target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub user_id: String,
    pub filename: String,
    pub format: ImageFormat,
}

impl UploadUrlParams {
    pub fn validate(&self) -> Result<UploadTarget> {
        let user_id = self.user_id.as_deref().unwrap_or_default().trim();
        if user_id.is_empty() {
            return Err(Error::validation("userId", "userId is required"));
        }

        let filename = self.filename.as_deref().unwrap_or_default();
        if filename.trim().is_empty() {
            return Err(Error::validation("filename", "filename is required"));
        }

        let format = FILENAME_PATTERN
            .captures(filename)
            .and_then(|caps| caps.get(1))
            .and_then(|ext| ImageFormat::from_extension(ext.as_str()))
            .ok_or_else(|| {
                Error::validation(
                    "filename",
                    "Invalid filename format. Must be alphanumeric with hyphens/underscores \
                     and end with .jpg, .jpeg, .png, or .gif",
                )
            })?;

        Ok(UploadTarget {
            user_id: user_id.to_string(),
            filename: filename.to_string(),
            format,
        })
    }
}

impl UploadTarget {
    /// Object key under which the photo will be stored
    pub fn object_key(&self, now: &DateTime<Utc>) -> String {
        let stamp = format_timestamp(now).replace([':', '.'], "-");
        format!("uploads/{}/{}-{}", self.user_id, stamp, self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(user_id: &str, filename: &str) -> UploadUrlParams {
        UploadUrlParams {
            user_id: Some(user_id.to_string()),
            filename: Some(filename.to_string()),
        }
    }

    #[test]
    fn test_accepts_supported_images() {
        let target = params("user-1", "photo.jpg").validate().unwrap();
        assert_eq!(target.format, ImageFormat::Jpeg);
        assert_eq!(target.format.content_type(), "image/jpeg");

        assert_eq!(
            params("u", "IMG_0042-b.png").validate().unwrap().format,
            ImageFormat::Png
        );
        assert_eq!(
            params("u", "spores.gif").validate().unwrap().format,
            ImageFormat::Gif
        );
    }

    #[test]
    fn test_rejects_bad_filenames() {
        for bad in ["photo.bmp", "photo.JPG", "../photo.jpg", "my photo.jpg", "photo", ".jpg"] {
            let err = params("user-1", bad).validate().unwrap_err();
            assert_eq!(err.field(), Some("filename"), "filename {}", bad);
            assert!(err.to_string().starts_with("Invalid filename format"));
        }
    }

    #[test]
    fn test_required_params() {
        let err = UploadUrlParams::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "userId is required");

        let err = params("user-1", "  ").validate().unwrap_err();
        assert_eq!(err.to_string(), "filename is required");
    }

    #[test]
    fn test_object_key() {
        let target = params(" user-1 ", "photo.jpg").validate().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 15).unwrap();

        assert_eq!(
            target.object_key(&now),
            "uploads/user-1/2024-05-01T09-30-15-000Z-photo.jpg"
        );
    }
}
